use client_core::UserAction;
use thiserror::Error;
use url::Url;

pub const HELP: &str = "\
commands:
  select <group> <option>   pick an option, e.g. `select Fan on`
  lock <control>            press a lock button (OLGALock, LaserLock)
  goto <url>                change the page url the lock token is read from
  show                      print the panel
  help                      this text
  quit                      leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Action(UserAction),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}', try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Parses one input line; blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let command = match (verb, args.as_slice()) {
        ("select", [group, option]) => Command::Action(UserAction::Select {
            group: group.to_string(),
            option: option.to_string(),
        }),
        ("select", _) => return Err(CommandError::Usage("select <group> <option>")),
        ("lock", [control]) => Command::Action(UserAction::ToggleLock {
            control: control.to_string(),
        }),
        ("lock", _) => return Err(CommandError::Usage("lock <control>")),
        ("goto", [url]) => Command::Action(UserAction::Navigate(Url::parse(url)?)),
        ("goto", _) => return Err(CommandError::Usage("goto <url>")),
        ("show", []) => Command::Show,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (other, _) => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
