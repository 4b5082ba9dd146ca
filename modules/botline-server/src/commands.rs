//! Slash commands recognised in text messages.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/event new <title> | <description>`
    NewEvent { title: String, description: String },
    /// `/event show`
    ShowEvent,
    /// `/event edit <description>`
    EditEvent { description: String },
    /// `/event cancel`
    CancelEvent,
    /// `/reset`
    ResetHistory,
    /// A `/event` invocation that did not parse.
    EventUsage,
}

pub const EVENT_USAGE: &str = "Usage:\n\
    /event new <title> | <description>\n\
    /event show\n\
    /event edit <description>\n\
    /event cancel";

/// `None` for plain chat text.
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    let (head, rest) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };

    match head {
        "/reset" => Some(Command::ResetHistory),
        "/event" => Some(parse_event(rest)),
        _ => None,
    }
}

fn parse_event(args: &str) -> Command {
    let (sub, rest) = match args.split_once(char::is_whitespace) {
        Some((sub, rest)) => (sub, rest.trim()),
        None => (args, ""),
    };

    match sub {
        "new" => {
            let (title, description) = match rest.split_once('|') {
                Some((title, description)) => (title.trim(), description.trim()),
                None => (rest, ""),
            };
            if title.is_empty() {
                return Command::EventUsage;
            }
            Command::NewEvent {
                title: title.to_string(),
                description: description.to_string(),
            }
        }
        "show" => Command::ShowEvent,
        "edit" if !rest.is_empty() => Command::EditEvent {
            description: rest.to_string(),
        },
        "cancel" => Command::CancelEvent,
        _ => Command::EventUsage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("/events are fun"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn new_event_with_and_without_description() {
        assert_eq!(
            parse("/event new Hike | Saturday 9am at the trailhead"),
            Some(Command::NewEvent {
                title: "Hike".into(),
                description: "Saturday 9am at the trailhead".into(),
            })
        );
        assert_eq!(
            parse("  /event new Board games  "),
            Some(Command::NewEvent {
                title: "Board games".into(),
                description: String::new(),
            })
        );
        assert_eq!(parse("/event new | no title"), Some(Command::EventUsage));
    }

    #[test]
    fn other_subcommands() {
        assert_eq!(parse("/event show"), Some(Command::ShowEvent));
        assert_eq!(parse("/event cancel"), Some(Command::CancelEvent));
        assert_eq!(parse("/reset"), Some(Command::ResetHistory));
        assert_eq!(
            parse("/event edit moved to Sunday"),
            Some(Command::EditEvent {
                description: "moved to Sunday".into()
            })
        );
    }

    #[test]
    fn malformed_event_commands_get_usage() {
        assert_eq!(parse("/event"), Some(Command::EventUsage));
        assert_eq!(parse("/event edit"), Some(Command::EventUsage));
        assert_eq!(parse("/event delete"), Some(Command::EventUsage));
    }
}
