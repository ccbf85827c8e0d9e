//! Page url normalization.

use regex::Regex;
use std::sync::OnceLock;

static SPACE_RUNS: OnceLock<Regex> = OnceLock::new();

fn space_runs() -> &'static Regex {
    SPACE_RUNS.get_or_init(|| Regex::new(r"[ ]{2,}").unwrap())
}

/// Clean a page url
///
/// Rules:
/// - Collapse runs of spaces and trim the ends
/// - Lowercase
/// - Replace spaces with underscores
/// - Turn Windows separators into `/`
/// - Drop leading/trailing `/`
///
/// # Examples
///
/// ```
/// use tinywiki_core::clean_url;
///
/// assert_eq!(clean_url("Hello World"), "hello_world");
/// assert_eq!(clean_url("  Some   Page  "), "some_page");
/// assert_eq!(clean_url("folder\\Sub Page/"), "folder/sub_page");
/// ```
pub fn clean_url(url: &str) -> String {
    let collapsed = space_runs().replace_all(url, " ");
    let cleaned = collapsed
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace("\\\\", "/")
        .replace('\\', "/");

    cleaned.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaces_become_underscores() {
        assert_eq!(clean_url("Hello World"), "hello_world");
        assert_eq!(clean_url("a b c"), "a_b_c");
    }

    #[test]
    fn test_multiple_spaces() {
        assert_eq!(clean_url("Hello    World"), "hello_world");
        assert_eq!(clean_url("   padded   "), "padded");
    }

    #[test]
    fn test_lowercase() {
        assert_eq!(clean_url("CamelCase"), "camelcase");
    }

    #[test]
    fn test_windows_separators() {
        assert_eq!(clean_url("folder\\page"), "folder/page");
        assert_eq!(clean_url("folder\\\\page"), "folder/page");
    }

    #[test]
    fn test_route_slashes_trimmed() {
        assert_eq!(clean_url("projects/roadmap/"), "projects/roadmap");
        assert_eq!(clean_url("/home"), "home");
    }

    #[test]
    fn test_empty() {
        assert_eq!(clean_url(""), "");
        assert_eq!(clean_url("   "), "");
    }
}
