//! Personal data scrubbing
//!
//! Replaces the home directory with `<HOME>` in the event message, exception
//! values and frame file names. With `sdk.strip_usernames` the user name is
//! replaced with `<USER>` too, but only where it stands as a whole word or
//! path component.

use faultline_core::{config::SdkConfig, domain::DiagnosticEvent};

use crate::processor::{Disposition, EventProcessor, ProcessContext};

pub struct PiiScrubber {
    home_dir: String,
    username: String,
    strip_usernames: bool,
}

impl PiiScrubber {
    /// Scrubs the identity of the current process owner.
    pub fn new(config: &SdkConfig) -> Self {
        let home_dir = dirs::home_dir()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let username = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_default();
        Self::with_identity(home_dir, username).strip_usernames(config.strip_usernames)
    }

    /// Scrubber for a fixed identity; user names are left alone until
    /// [`strip_usernames`](Self::strip_usernames) is turned on.
    pub fn with_identity(home_dir: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            home_dir: home_dir.into(),
            username: username.into(),
            strip_usernames: false,
        }
    }

    pub fn strip_usernames(mut self, enabled: bool) -> Self {
        self.strip_usernames = enabled;
        self
    }

    pub fn scrub(&self, text: &str) -> String {
        let mut result = text.to_string();

        // "/" would match every absolute path
        if self.home_dir.len() > 1 {
            result = replace_bounded(&result, &self.home_dir, "<HOME>", false);
        }

        if self.strip_usernames && !self.username.is_empty() {
            result = replace_bounded(&result, &self.username, "<USER>", true);
        }

        result
    }

    fn scrub_in_place(&self, text: &mut String) {
        *text = self.scrub(text);
    }
}

impl Default for PiiScrubber {
    fn default() -> Self {
        Self::new(&SdkConfig::default())
    }
}

impl EventProcessor for PiiScrubber {
    fn name(&self) -> &str {
        "pii_scrubber"
    }

    fn process(&self, event: &mut DiagnosticEvent, _ctx: &ProcessContext) -> Disposition {
        if let Some(message) = event.message.as_mut() {
            self.scrub_in_place(message);
        }
        for exception in &mut event.exceptions {
            self.scrub_in_place(&mut exception.value);
            for frame in &mut exception.frames {
                self.scrub_in_place(&mut frame.filename);
            }
        }
        Disposition::Keep
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Replaces occurrences of `needle` not followed by a word character, and
/// with `whole_word` also not preceded by one.
fn replace_bounded(text: &str, needle: &str, replacement: &str, whole_word: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(needle) {
        out.push_str(&rest[..pos]);
        let after = rest[pos + needle.len()..].chars().next();
        let before = out.chars().next_back();

        let bounded =
            !after.is_some_and(is_word_char) && !(whole_word && before.is_some_and(is_word_char));
        out.push_str(if bounded { replacement } else { needle });
        rest = &rest[pos + needle.len()..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use faultline_core::domain::{ExceptionInfo, Level, StackFrame};

    use super::*;

    fn scrubber() -> PiiScrubber {
        PiiScrubber::with_identity("/home/alice", "alice")
    }

    #[test]
    fn test_home_dir_replaced_as_path_prefix() {
        let result = scrubber().scrub("open /home/alice/save.dat failed for alice");
        assert_eq!(result, "open <HOME>/save.dat failed for alice");
    }

    #[test]
    fn test_longer_home_like_path_is_kept() {
        let result = scrubber().scrub("/home/alice2/x and /home/alice");
        assert_eq!(result, "/home/alice2/x and <HOME>");
    }

    #[test]
    fn test_username_as_common_word_untouched_by_default() {
        let scrubber = PiiScrubber::with_identity("/home/node", "node");
        let text = "get_node: node not found in scene";
        assert_eq!(scrubber.scrub(text), text);
    }

    #[test]
    fn test_strip_usernames_matches_whole_words_only() {
        let scrubber = PiiScrubber::with_identity("/home/node", "node").strip_usernames(true);
        assert_eq!(
            scrubber.scrub("get_node: node not found in /srv/node/main.gd"),
            "get_node: <USER> not found in /srv/<USER>/main.gd"
        );
        assert_eq!(scrubber.scrub("nodes and node-tree"), "nodes and node-tree");
    }

    #[test]
    fn test_empty_identity_leaves_text_alone() {
        let scrubber = PiiScrubber::with_identity("", "").strip_usernames(true);
        assert_eq!(scrubber.scrub("/home/bob/x"), "/home/bob/x");
    }

    #[test]
    fn test_root_home_is_not_scrubbed() {
        let scrubber = PiiScrubber::with_identity("/", "");
        assert_eq!(scrubber.scrub("/usr/lib/x"), "/usr/lib/x");
    }

    #[test]
    fn test_event_fields_are_scrubbed() {
        let mut event = DiagnosticEvent::new(Level::Error).with_message("crash in /home/alice/game");
        event.add_exception(ExceptionInfo {
            kind: "ERROR".into(),
            value: "alice broke it".into(),
            frames: vec![StackFrame {
                filename: "/home/alice/src/main.gd".into(),
                ..Default::default()
            }],
        });

        let disposition = scrubber()
            .strip_usernames(true)
            .process(&mut event, &ProcessContext::default());
        assert_eq!(disposition, Disposition::Keep);
        assert_eq!(event.message.as_deref(), Some("crash in <HOME>/game"));
        assert_eq!(event.exceptions[0].value, "<USER> broke it");
        assert_eq!(event.exceptions[0].frames[0].filename, "<HOME>/src/main.gd");
    }
}
