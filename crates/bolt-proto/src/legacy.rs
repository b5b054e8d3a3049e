//! Degraded string encodings.
//!
//! Older gateways only understand a bare string as the `sendMessage` payload.
//! Code is wrapped in a triple-backtick fence and images travel as a bracketed
//! filename marker. These helpers produce both markers and recognize fences.

/// Fence placed before and after code content.
pub const FENCE: &str = "```";

const IMAGE_PREFIX: &str = "[image:";
const IMAGE_SUFFIX: &str = "]";

/// Wrap code content in the fence marker.
#[must_use]
pub fn wrap_code(content: &str) -> String {
    format!("{FENCE}{content}{FENCE}")
}

/// Inner content if `text` is fully fenced. `None` otherwise.
///
/// The opening and closing fences must not overlap, so a bare "```" is not
/// considered code.
#[must_use]
pub fn unwrap_code(text: &str) -> Option<&str> {
    if text.len() < FENCE.len() * 2 {
        return None;
    }
    text.strip_prefix(FENCE)?.strip_suffix(FENCE)
}

/// Marker announcing an image by file name.
#[must_use]
pub fn image_marker(name: &str) -> String {
    format!("{IMAGE_PREFIX}{name}{IMAGE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_fenced_verbatim() {
        assert_eq!(wrap_code("print(1)"), "```print(1)```");
        assert_eq!(wrap_code("a\nb"), "```a\nb```");
    }

    #[test]
    fn unwrap_requires_both_fences() {
        assert_eq!(unwrap_code("```print(1)```"), Some("print(1)"));
        assert_eq!(unwrap_code("``````"), Some(""));
        assert_eq!(unwrap_code("```"), None);
        assert_eq!(unwrap_code("````"), None);
        assert_eq!(unwrap_code("```open"), None);
        assert_eq!(unwrap_code("plain"), None);
    }

    #[test]
    fn image_marker_names_the_file() {
        assert_eq!(image_marker("cat.png"), "[image:cat.png]");
        assert_eq!(image_marker(""), "[image:]");
    }
}
