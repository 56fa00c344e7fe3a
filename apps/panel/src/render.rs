use std::fmt::Write as _;

use client_core::{ConnectionState, GroupView, PanelView};

/// Text rendition of the panel, one line per control group.
pub fn render(view: &PanelView) -> String {
    let mut out = String::new();
    let banner = match view.connection {
        ConnectionState::Connecting => "[connecting...]",
        ConnectionState::Connected => "[connected]",
    };
    out.push_str(banner);
    out.push('\n');
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "! {notice}");
    }
    let width = view
        .groups
        .iter()
        .map(|group| group.name.len())
        .max()
        .unwrap_or(0);
    for group in &view.groups {
        let _ = writeln!(out, "{:<width$}  {}", group.name, render_group(group));
    }
    out
}

fn render_group(group: &GroupView) -> String {
    if let Some(engaged) = group.lock_button {
        return if engaged { "[locked]" } else { "[unlocked]" }.to_string();
    }
    group
        .options
        .iter()
        .map(|option| {
            let mark = if option.active { '*' } else { ' ' };
            format!("({mark}) {}", option.value)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
