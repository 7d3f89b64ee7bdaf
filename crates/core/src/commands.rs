/// The operator command language, one variant per slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GotoCue(usize),
    Save(String),
    OpenSaved(String),
    OpenExample(String),
    List,
    Reset,
}

/// Command syntax and help strings, rendered by `/list`.
pub const COMMAND_HELP: [(&str, &str); 6] = [
    ("/list", "Display this list of commands"),
    ("/goto cue [#]", "Go directly to a cue group number"),
    ("/save [name]", "Save the currently opened show to the shows folder"),
    ("/open saved [name]", "Open a saved show from the shows folder"),
    ("/open example [name]", "Open an example show from the examples folder"),
    ("/reset", "Reset back to the built-in tables"),
];

pub fn help_text() -> String {
    let entries: Vec<String> = COMMAND_HELP
        .iter()
        .map(|(syntax, description)| format!("{} ({})", syntax, description))
        .collect();
    format!("Commands: {}", entries.join("; "))
}

/// Parse a command line. The error is the message shown to the operator;
/// nothing here panics on malformed input.
pub fn parse(input: &str) -> Result<Command, String> {
    let words: Vec<&str> = input.split_whitespace().collect();
    let Some(first) = words.first() else {
        return Err("type /list to see the available commands".to_string());
    };
    if !first.starts_with('/') {
        return Err("commands start with a /; type /list to see them".to_string());
    }

    match *first {
        "/goto" => {
            if words.get(1) != Some(&"cue") {
                return Err("usage: /goto cue [#]".to_string());
            }
            match words.get(2).and_then(|word| word.parse().ok()) {
                Some(group) if words.len() == 3 => Ok(Command::GotoCue(group)),
                _ => Err("usage: /goto cue [#] with a whole cue group number".to_string()),
            }
        }
        "/save" => named(&words, Command::Save, "usage: /save [name]"),
        "/open" => match words.get(1) {
            Some(&"saved") => named(&words[1..], Command::OpenSaved, "usage: /open saved [name]"),
            Some(&"example") => named(
                &words[1..],
                Command::OpenExample,
                "usage: /open example [name]",
            ),
            _ => Err("usage: /open saved [name] or /open example [name]".to_string()),
        },
        "/list" => Ok(Command::List),
        "/reset" => Ok(Command::Reset),
        unknown => Err(format!(
            "unknown command {}; type /list to see the available commands",
            unknown
        )),
    }
}

/// Commands whose argument is the rest of the line, joined: show names may
/// contain spaces.
fn named(
    words: &[&str],
    build: impl Fn(String) -> Command,
    usage: &str,
) -> Result<Command, String> {
    let name = words[1..].join(" ");
    if name.is_empty() {
        Err(usage.to_string())
    } else {
        Ok(build(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goto_cue_parses_a_group_number() {
        assert_eq!(parse("/goto cue 4"), Ok(Command::GotoCue(4)));
        assert!(parse("/goto cue").is_err());
        assert!(parse("/goto cue four").is_err());
        assert!(parse("/goto cue -1").is_err());
    }

    #[test]
    fn test_show_names_may_contain_spaces() {
        assert_eq!(
            parse("/save opening night"),
            Ok(Command::Save("opening night".to_string()))
        );
        assert_eq!(
            parse("/open saved opening night"),
            Ok(Command::OpenSaved("opening night".to_string()))
        );
        assert_eq!(
            parse("/open example two nodes"),
            Ok(Command::OpenExample("two nodes".to_string()))
        );
    }

    #[test]
    fn test_single_word_commands() {
        assert_eq!(parse("/list"), Ok(Command::List));
        assert_eq!(parse("  /reset  "), Ok(Command::Reset));
    }

    #[test]
    fn test_invalid_input_yields_a_message_not_a_crash() {
        for input in ["", "   ", "hello", "/frobnicate", "/open sideways x", "/save"] {
            let err = parse(input).unwrap_err();
            assert!(!err.is_empty());
        }
    }

    #[test]
    fn test_help_text_mentions_every_command() {
        let help = help_text();
        for (syntax, _) in COMMAND_HELP {
            assert!(help.contains(syntax));
        }
    }
}
