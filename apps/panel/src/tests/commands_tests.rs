use super::*;

#[test]
fn parses_panel_actions() {
    assert_eq!(
        parse_command("select Damper1 halfopen"),
        Ok(Some(Command::Action(UserAction::Select {
            group: "Damper1".to_string(),
            option: "halfopen".to_string(),
        })))
    );
    assert_eq!(
        parse_command("  lock   OLGALock "),
        Ok(Some(Command::Action(UserAction::ToggleLock {
            control: "OLGALock".to_string(),
        })))
    );
    let Ok(Some(Command::Action(UserAction::Navigate(url)))) =
        parse_command("goto http://panel.local/?authtoken=abc")
    else {
        panic!("expected navigate");
    };
    assert_eq!(url.query(), Some("authtoken=abc"));
}

#[test]
fn parses_meta_commands_and_blank_lines() {
    assert_eq!(parse_command(""), Ok(None));
    assert_eq!(parse_command("   "), Ok(None));
    assert_eq!(parse_command("show"), Ok(Some(Command::Show)));
    assert_eq!(parse_command("?"), Ok(Some(Command::Help)));
    assert_eq!(parse_command("exit"), Ok(Some(Command::Quit)));
}

#[test]
fn reports_usage_errors() {
    assert_eq!(
        parse_command("select Fan"),
        Err(CommandError::Usage("select <group> <option>"))
    );
    assert_eq!(parse_command("lock"), Err(CommandError::Usage("lock <control>")));
    assert!(matches!(
        parse_command("goto not-a-url"),
        Err(CommandError::Url(_))
    ));
    assert_eq!(
        parse_command("dance"),
        Err(CommandError::Unknown("dance".to_string()))
    );
}
