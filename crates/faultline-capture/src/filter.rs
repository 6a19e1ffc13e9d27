//! Cleanup and filtering of printed host messages.

/// Removes ANSI CSI escape sequences and control characters.
///
/// A CSI sequence is `ESC [` followed by parameter bytes and terminated by a
/// final byte in `0x40..=0x7E`. Control characters are everything below
/// `0x20` plus `DEL`; newlines and tabs included.
pub fn strip_invisible(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for cc in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&cc) {
                    break;
                }
            }
            continue;
        }
        if c < '\u{20}' || c == '\u{7f}' {
            continue;
        }
        result.push(c);
    }

    result
}

/// Prefix filter for messages that must not be captured.
#[derive(Debug, Clone, Default)]
pub struct PrefixFilter {
    prefixes: Vec<String>,
}

impl PrefixFilter {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// True when `message` starts with one of the filtered prefixes.
    pub fn is_filtered(&self, message: &str) -> bool {
        self.prefixes.iter().any(|p| message.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_colors() {
        let text = "\u{1b}[1;31mERROR:\u{1b}[0m something broke";
        assert_eq!(strip_invisible(text), "ERROR: something broke");
    }

    #[test]
    fn test_strip_control_characters() {
        assert_eq!(strip_invisible("line one\nline\ttwo\r\u{7f}"), "line onelinetwo");
        assert_eq!(strip_invisible("\u{0}\u{1}\u{1f}"), "");
    }

    #[test]
    fn test_unterminated_escape_consumes_rest() {
        assert_eq!(strip_invisible("ok \u{1b}[12;"), "ok ");
    }

    #[test]
    fn test_lone_escape_is_dropped() {
        assert_eq!(strip_invisible("a\u{1b}b"), "ab");
    }

    #[test]
    fn test_unicode_is_kept() {
        assert_eq!(strip_invisible("héllo wörld ✓"), "héllo wörld ✓");
    }

    #[test]
    fn test_prefix_filter() {
        let filter = PrefixFilter::new(["faultline: ", "[debug]"]);
        assert!(filter.is_filtered("faultline: sink closed"));
        assert!(filter.is_filtered("[debug] x"));
        assert!(!filter.is_filtered("player died"));
        assert!(!PrefixFilter::default().is_filtered("faultline: x"));
    }
}
