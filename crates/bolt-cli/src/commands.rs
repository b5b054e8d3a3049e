//! Slash commands and line-to-event translation.
//!
//! A line starting with `/` is a command. Anything else is message text: in
//! text mode the line is submitted at once, in code mode it becomes one line
//! of the snippet and a blank line sends the snippet. A leading `//` escapes a
//! literal slash. The draft is never shown, so `/cancel` discards it.

use std::path::Path;

use bolt_app::{AppEvent, ComposerMode, KeyInput};
use bolt_proto::ImageRef;

/// One-line command reference.
pub const HELP: &str = "commands: /code, /cancel, /attach, /image <path>, /help, /quit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Message text.
    Text(String),
    /// Start a code snippet.
    Code,
    /// Leave code mode and discard the draft.
    Cancel,
    /// Toggle the attach menu.
    Attach,
    /// Send an image.
    Image(ImageRef),
    /// Show the command reference.
    Help,
    /// Leave the room.
    Quit,
    /// Unusable command, with a hint for the user.
    Invalid(String),
}

impl Command {
    /// Parse one line of input.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(escaped) = line.strip_prefix("//") {
            return Self::Text(format!("/{escaped}"));
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Text(line.to_string());
        };

        let (name, argument) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, argument)| (name, argument.trim()));

        match name {
            "code" => Self::Code,
            "cancel" => Self::Cancel,
            "attach" => Self::Attach,
            "image" if argument.is_empty() => Self::Invalid("usage: /image <path>".into()),
            "image" => Self::Image(image_ref(argument)),
            "help" | "h" => Self::Help,
            "quit" | "q" => Self::Quit,
            other => Self::Invalid(format!("unknown command /{other}; {HELP}")),
        }
    }

    /// App events for this command given the composer's current mode.
    ///
    /// [`Command::Help`] and [`Command::Invalid`] are handled by the front end
    /// and produce no events.
    pub fn into_events(self, mode: ComposerMode) -> Vec<AppEvent> {
        match self {
            Self::Text(line) => text_events(line, mode),
            Self::Code => vec![AppEvent::InsertCode],
            Self::Cancel => vec![AppEvent::CancelCode, AppEvent::ClearDraft],
            Self::Attach => vec![AppEvent::ToggleAttachMenu],
            Self::Image(image) => vec![AppEvent::PickImage(image)],
            Self::Quit => vec![AppEvent::Quit],
            Self::Help | Self::Invalid(_) => Vec::new(),
        }
    }
}

fn text_events(line: String, mode: ComposerMode) -> Vec<AppEvent> {
    match mode {
        ComposerMode::PlainText => vec![AppEvent::InsertText(line), AppEvent::Submit],
        ComposerMode::Code if line.is_empty() => vec![AppEvent::Submit],
        ComposerMode::Code => {
            vec![AppEvent::InsertText(line), AppEvent::Key(KeyInput::Enter { shift: true })]
        },
    }
}

/// Reference a local file. The URL is absolute so other front ends on the
/// same machine can resolve it.
fn image_ref(path: &str) -> ImageRef {
    let name = Path::new(path).file_name().and_then(|name| name.to_str()).unwrap_or(path);
    let url = std::path::absolute(path)
        .map_or_else(|_| path.to_string(), |absolute| format!("file://{}", absolute.display()));
    ImageRef::new(url, name)
}

#[cfg(test)]
mod tests {
    use bolt_app::App;
    use bolt_core::{MessageBody, SessionConfig};
    use bolt_harness::SimEnv;

    use super::*;

    #[test]
    fn plain_line_is_text() {
        assert_eq!(Command::parse("hello\n"), Command::Text("hello".into()));
    }

    #[test]
    fn double_slash_escapes() {
        assert_eq!(Command::parse("//shrug"), Command::Text("/shrug".into()));
    }

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("/code"), Command::Code);
        assert_eq!(Command::parse("/cancel"), Command::Cancel);
        assert_eq!(
            Command::Cancel.into_events(ComposerMode::Code),
            vec![AppEvent::CancelCode, AppEvent::ClearDraft]
        );
        assert_eq!(Command::parse("/attach"), Command::Attach);
        assert_eq!(Command::parse("/q"), Command::Quit);
        assert_eq!(Command::parse("/help"), Command::Help);
    }

    #[test]
    fn image_keeps_file_name() {
        let command = Command::parse("/image  pics/cat.png ");
        assert!(matches!(
            &command,
            Command::Image(image)
                if image.name.as_deref() == Some("cat.png")
                    && image.url.starts_with("file://")
                    && image.url.ends_with("pics/cat.png")
        ));
    }

    #[test]
    fn image_without_path_is_invalid() {
        assert!(matches!(Command::parse("/image"), Command::Invalid(_)));
    }

    #[test]
    fn unknown_command_is_invalid() {
        let command = Command::parse("/dance now");
        assert!(matches!(&command, Command::Invalid(hint) if hint.contains("/dance")));
    }

    #[test]
    fn text_submits_in_plain_mode() {
        let events = Command::parse("hi").into_events(ComposerMode::PlainText);
        assert_eq!(events, vec![AppEvent::InsertText("hi".into()), AppEvent::Submit]);
    }

    #[test]
    fn code_lines_accumulate_until_blank() {
        let line = Command::parse("print(1)").into_events(ComposerMode::Code);
        assert_eq!(
            line,
            vec![
                AppEvent::InsertText("print(1)".into()),
                AppEvent::Key(KeyInput::Enter { shift: true })
            ]
        );

        let blank = Command::parse("").into_events(ComposerMode::Code);
        assert_eq!(blank, vec![AppEvent::Submit]);
    }

    #[test]
    fn cancelled_snippet_does_not_leak_into_next_message() {
        let mut app = App::new(SimEnv::new(), SessionConfig::default(), "Ada", "abc");
        for line in ["/code", "rm -rf /", "/cancel", "hello"] {
            for event in Command::parse(line).into_events(app.composer().mode()) {
                app.handle(event);
            }
        }

        let bodies: Vec<_> = app.session().messages().iter().map(|m| m.body.clone()).collect();
        assert_eq!(bodies, vec![MessageBody::Text("hello".into())]);
        assert_eq!(app.composer().buffer(), "");
    }

    #[test]
    fn help_produces_no_events() {
        assert!(Command::Help.into_events(ComposerMode::PlainText).is_empty());
        assert!(Command::Invalid("x".into()).into_events(ComposerMode::Code).is_empty());
    }
}
