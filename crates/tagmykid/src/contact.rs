//! Getting a finder in touch with the parent.
//!
//! The bridge builds a chat link carrying a message for the parent. The
//! message is either a fixed template or text drafted by an external
//! program from the finder's description of where the item turned up.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::codec::encode_uri_component;
use crate::error::{Error, Field, Result};
use crate::model::FinderView;
use crate::validate;

/// Digits a local number has when it starts with the trunk prefix.
const LOCAL_NUMBER_DIGITS: usize = 10;

/// Strip formatting from `raw` and rewrite a local number to international
/// form.
///
/// Only a number of exactly ten digits starting with `trunk_prefix` is
/// rewritten; everything else keeps its digits as entered.
#[must_use]
pub fn normalize_phone(raw: &str, country_code: &str, trunk_prefix: &str) -> String {
    let digits = validate::digits_only(raw);
    match digits.strip_prefix(trunk_prefix) {
        Some(rest) if !trunk_prefix.is_empty() && digits.len() == LOCAL_NUMBER_DIGITS => {
            format!("{country_code}{rest}")
        }
        _ => digits,
    }
}

/// A chat link that opens a conversation with `normalized_phone` with
/// `message` typed in.
#[must_use]
pub fn messaging_link(base: &str, normalized_phone: &str, message: &str) -> String {
    format!(
        "{}/{normalized_phone}?text={}",
        base.trim_end_matches('/'),
        encode_uri_component(message)
    )
}

/// The message sent when nothing was drafted.
#[must_use]
pub fn default_message(view: &FinderView) -> String {
    format!(
        "Hi, I've found an item that belongs to {} from {} (Grade {} {}). \
         Please let me know how I can return it.",
        view.name, view.school, view.grade, view.class_name
    )
}

/// The instructions handed to a drafting program.
#[must_use]
pub fn drafting_prompt(view: &FinderView, context: &str) -> String {
    format!(
        "You are a helpful assistant. Someone has found a lost item belonging to a child \
         named {} from {}. The finder has provided the following context: \"{}\". \
         Please craft a short, friendly, and clear WhatsApp message to the child's parent. \
         The message should state that the item has been found, mention the context, and \
         ask how to return it. Start the message with \"Hi,\" and do not add any salutations \
         at the end.",
        view.name,
        view.school,
        context.trim()
    )
}

/// Something that turns a prompt into a message.
pub trait MessageDrafter {
    /// Draft a message from `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Drafting`] if no message could be produced.
    fn draft(&self, prompt: &str) -> Result<String>;
}

/// Drafts by running a program that reads the prompt on stdin and prints
/// the message on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDrafter {
    program: String,
    args: Vec<String>,
}

impl CommandDrafter {
    /// Create a drafter from an argv list. Returns `None` if it is empty.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// The program that will be run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl MessageDrafter for CommandDrafter {
    fn draft(&self, prompt: &str) -> Result<String> {
        debug!(program = %self.program, "Running drafting command");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::drafting(format!("failed to start {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(prompt.as_bytes()) {
                // The program may answer without reading the whole prompt.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(program = %self.program, "Drafting command closed stdin early");
                }
                result => {
                    result.map_err(|e| Error::drafting(format!("failed to send prompt: {e}")))?;
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::drafting(format!("failed to wait for {}: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::drafting(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let message = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if message.is_empty() {
            return Err(Error::drafting(format!("{} printed nothing", self.program)));
        }
        Ok(message)
    }
}

/// Draft a message for `view` from the finder's `context`.
///
/// # Errors
///
/// Returns a validation error for [`Field::Context`] if `context` is blank,
/// or whatever the drafter fails with.
pub fn draft_message(
    drafter: &dyn MessageDrafter,
    view: &FinderView,
    context: &str,
) -> Result<String> {
    if context.trim().is_empty() {
        return Err(Error::validation(
            Field::Context,
            "describe where or how you found the item",
        ));
    }
    let message = drafter.draft(&drafting_prompt(view, context))?;
    if message.trim().is_empty() {
        return Err(Error::drafting("drafter returned an empty message"));
    }
    Ok(message.trim().to_string())
}

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// Message text.
    pub text: String,
    /// Whether the text came from a drafter rather than the template.
    pub drafted: bool,
}

/// Draft a message when possible, otherwise use [`default_message`].
#[must_use]
pub fn compose_message(
    drafter: Option<&dyn MessageDrafter>,
    view: &FinderView,
    context: &str,
) -> ComposedMessage {
    let fallback = || ComposedMessage {
        text: default_message(view),
        drafted: false,
    };

    let Some(drafter) = drafter else {
        return fallback();
    };
    if context.trim().is_empty() {
        return fallback();
    }

    match draft_message(drafter, view, context) {
        Ok(text) => {
            info!(code = %view.code, "Drafted contact message");
            ComposedMessage {
                text,
                drafted: true,
            }
        }
        Err(e) => {
            warn!(error = %e, "Drafting failed, using default message");
            fallback()
        }
    }
}

/// Contact settings bundled for building links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactBridge {
    messaging_url: String,
    country_code: String,
    trunk_prefix: String,
}

impl ContactBridge {
    /// Create a bridge.
    #[must_use]
    pub fn new(
        messaging_url: impl Into<String>,
        country_code: impl Into<String>,
        trunk_prefix: impl Into<String>,
    ) -> Self {
        Self {
            messaging_url: messaging_url.into(),
            country_code: country_code.into(),
            trunk_prefix: trunk_prefix.into(),
        }
    }

    /// Chat link to the parent of `view` carrying `message`.
    #[must_use]
    pub fn link_for(&self, view: &FinderView, message: &str) -> String {
        let phone = normalize_phone(&view.parent_phone, &self.country_code, &self.trunk_prefix);
        messaging_link(&self.messaging_url, &phone, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn view() -> FinderView {
        FinderView {
            name: "Thandi Dlamini".to_string(),
            grade: "5".to_string(),
            class_name: "B".to_string(),
            parent_phone: "082 765 4321".to_string(),
            school: "Greenside High School".to_string(),
            code: "Q7X2PL".to_string(),
        }
    }

    struct FixedDrafter {
        reply: Result<String>,
        calls: Cell<u32>,
    }

    impl FixedDrafter {
        fn replying(reply: Result<String>) -> Self {
            Self {
                reply,
                calls: Cell::new(0),
            }
        }
    }

    impl MessageDrafter for FixedDrafter {
        fn draft(&self, prompt: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            assert!(prompt.contains("Thandi Dlamini"));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::drafting(e.to_string())),
            }
        }
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("082 765 4321", "27", "0"), "27827654321");
        assert_eq!(normalize_phone("+27 82 765 4321", "27", "0"), "27827654321");
        assert_eq!(normalize_phone("0827654", "27", "0"), "0827654");
        assert_eq!(normalize_phone("1827654321", "27", "0"), "1827654321");
        assert_eq!(normalize_phone("020 7946 095", "44", "0"), "44207946095");
    }

    #[test]
    fn test_messaging_link() {
        let link = messaging_link("https://wa.me/", "27827654321", "Hi, found it!");
        assert_eq!(link, "https://wa.me/27827654321?text=Hi%2C%20found%20it!");
    }

    #[test]
    fn test_default_message() {
        assert_eq!(
            default_message(&view()),
            "Hi, I've found an item that belongs to Thandi Dlamini from Greenside High School \
             (Grade 5 B). Please let me know how I can return it."
        );
    }

    #[test]
    fn test_drafting_prompt_mentions_context() {
        let prompt = drafting_prompt(&view(), "  left on the bus  ");
        assert!(prompt.contains("\"left on the bus\""));
        assert!(prompt.contains("Greenside High School"));
        assert!(prompt.contains("Start the message with \"Hi,\""));
    }

    #[test]
    fn test_draft_message_requires_context() {
        let drafter = FixedDrafter::replying(Ok("Hi, found it".to_string()));
        let err = draft_message(&drafter, &view(), "   ").unwrap_err();
        assert_eq!(err.field(), Some(Field::Context));
        assert_eq!(drafter.calls.get(), 0);
    }

    #[test]
    fn test_compose_uses_drafted_text() {
        let drafter = FixedDrafter::replying(Ok("  Hi, I found Thandi's jersey.  ".to_string()));
        let message = compose_message(Some(&drafter as &dyn MessageDrafter), &view(), "near the field");
        assert!(message.drafted);
        assert_eq!(message.text, "Hi, I found Thandi's jersey.");
    }

    #[test]
    fn test_compose_falls_back() {
        crate::logging::init_test_logging();

        let expected = default_message(&view());

        let failing = FixedDrafter::replying(Err(Error::drafting("offline")));
        let message = compose_message(Some(&failing as &dyn MessageDrafter), &view(), "near the field");
        assert!(!message.drafted);
        assert_eq!(message.text, expected);

        let empty = FixedDrafter::replying(Ok("   ".to_string()));
        assert_eq!(compose_message(Some(&empty as &dyn MessageDrafter), &view(), "x").text, expected);

        let unused = FixedDrafter::replying(Ok("Hi".to_string()));
        assert_eq!(compose_message(Some(&unused as &dyn MessageDrafter), &view(), "").text, expected);
        assert_eq!(unused.calls.get(), 0);

        assert_eq!(compose_message(None, &view(), "near the field").text, expected);
    }

    #[test]
    fn test_command_drafter_from_argv() {
        assert!(CommandDrafter::from_argv(&[]).is_none());
        let drafter =
            CommandDrafter::from_argv(&["llm".to_string(), "-m".to_string(), "small".to_string()])
                .unwrap();
        assert_eq!(drafter.program(), "llm");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_drafter_runs_program() {
        let drafter = CommandDrafter::from_argv(&[
            "sh".to_string(),
            "-c".to_string(),
            "cat >/dev/null; echo 'Hi, we have your bag.'".to_string(),
        ])
        .unwrap();
        assert_eq!(drafter.draft("prompt").unwrap(), "Hi, we have your bag.");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_drafter_ignores_unread_prompt() {
        crate::logging::init_test_logging();

        let drafter = CommandDrafter::from_argv(&[
            "sh".to_string(),
            "-c".to_string(),
            "echo 'Hi, we have your bag.'".to_string(),
        ])
        .unwrap();
        let prompt = "left on the bus. ".repeat(64 * 1024);
        assert_eq!(drafter.draft(&prompt).unwrap(), "Hi, we have your bag.");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_drafter_failures() {
        let failing =
            CommandDrafter::from_argv(&["sh".to_string(), "-c".to_string(), "exit 3".to_string()])
                .unwrap();
        assert!(matches!(failing.draft("p"), Err(Error::Drafting { .. })));

        let missing = CommandDrafter::from_argv(&["tagmykid-no-such-drafter".to_string()]).unwrap();
        assert!(matches!(missing.draft("p"), Err(Error::Drafting { .. })));
    }

    #[test]
    fn test_bridge_link() {
        let bridge = ContactBridge::new("https://wa.me", "27", "0");
        let link = bridge.link_for(&view(), "Hi");
        assert_eq!(link, "https://wa.me/27827654321?text=Hi");
    }
}
