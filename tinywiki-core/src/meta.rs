//! Page metadata: the `key: value` header that precedes the markdown body.

use regex::Regex;
use std::sync::OnceLock;

static META_LINE: OnceLock<Regex> = OnceLock::new();

fn meta_line() -> &'static Regex {
    META_LINE.get_or_init(|| Regex::new(r"^[ ]{0,3}([A-Za-z0-9_-]+):\s*(.*)$").unwrap())
}

/// Insertion-ordered metadata.
///
/// Keys are stored lowercase. Order is kept so a page is written back the
/// way it was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    entries: Vec<(String, String)>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, keeping the key's original position if it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = key.to_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let key = key.to_lowercase();
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as header lines, one `key: value` per line.
    ///
    /// Multi-line values are written with indented continuation lines.
    pub fn to_header(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let mut lines = value.lines();
            out.push_str(key);
            out.push_str(": ");
            out.push_str(lines.next().unwrap_or(""));
            out.push('\n');
            for line in lines {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

/// Parse a metadata header.
///
/// Returns `None` if any line is neither a `key: value` line nor an
/// indented continuation of the previous value.
pub fn parse_meta(raw: &str) -> Option<Meta> {
    let re = meta_line();
    let mut meta = Meta::new();
    let mut last_key: Option<String> = None;

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(captures) = re.captures(line) {
            let key = captures[1].to_lowercase();
            let value = captures[2].trim().to_string();
            match meta.get(&key) {
                // repeated keys accumulate like continuation lines
                Some(existing) => {
                    let joined = format!("{existing}\n{value}");
                    meta.set(&key, joined);
                }
                None => meta.set(&key, value),
            }
            last_key = Some(key);
        } else if line.starts_with("    ") || line.starts_with('\t') {
            let key = last_key.as_ref()?;
            let existing = meta.get(key).unwrap_or("").to_string();
            meta.set(key, format!("{existing}\n{}", line.trim()));
        } else {
            return None;
        }
    }

    Some(meta)
}

/// Split page text into its metadata and markdown body.
///
/// The header ends at the first blank line. Text without a blank line is
/// treated as metadata only if every line parses as metadata.
pub fn split_page(text: &str) -> (Meta, String) {
    let text = text.replace("\r\n", "\n");

    // empty header followed by its separator line
    if let Some(body) = text.strip_prefix('\n') {
        return (Meta::new(), body.to_string());
    }

    match text.split_once("\n\n") {
        Some((raw, body)) => match parse_meta(raw) {
            Some(meta) => (meta, body.to_string()),
            None => (Meta::new(), text.clone()),
        },
        None => match parse_meta(&text) {
            Some(meta) if !meta.is_empty() => (meta, String::new()),
            _ => (Meta::new(), text.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_page() {
        let text = "title: Test Page\ntags: rust, wiki\n\n# Hello\n\nBody text.";
        let (meta, body) = split_page(text);
        assert_eq!(meta.get("title"), Some("Test Page"));
        assert_eq!(meta.get("tags"), Some("rust, wiki"));
        assert_eq!(body, "# Hello\n\nBody text.");
    }

    #[test]
    fn test_keys_are_lowercased() {
        let (meta, _) = split_page("Title: Upper\n\nbody");
        assert_eq!(meta.get("title"), Some("Upper"));
        assert_eq!(meta.get("TITLE"), Some("Upper"));
    }

    #[test]
    fn test_order_preserved() {
        let (meta, _) = split_page("zeta: 1\nalpha: 2\nmid: 3\n\nbody");
        let keys: Vec<_> = meta.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_continuation_lines() {
        let (meta, body) = split_page("summary: first\n    second\ntitle: T\n\nbody");
        assert_eq!(meta.get("summary"), Some("first\nsecond"));
        assert_eq!(meta.get("title"), Some("T"));
        assert_eq!(body, "body");
    }

    #[test]
    fn test_no_header() {
        let text = "# Just markdown\n\nNo metadata here.";
        let (meta, body) = split_page(text);
        assert!(meta.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn test_header_without_body() {
        let (meta, body) = split_page("title: Lonely\ntags: a");
        assert_eq!(meta.get("title"), Some("Lonely"));
        assert_eq!(body, "");
    }

    #[test]
    fn test_crlf_normalized() {
        let (meta, body) = split_page("title: Win\r\n\r\nline one\r\nline two");
        assert_eq!(meta.get("title"), Some("Win"));
        assert_eq!(body, "line one\nline two");
    }

    #[test]
    fn test_header_roundtrip_keeps_order() {
        let mut meta = Meta::new();
        meta.set("title", "Page");
        meta.set("tags", "a, b");
        meta.set("title", "Renamed");
        assert_eq!(meta.to_header(), "title: Renamed\ntags: a, b\n");
    }

    #[test]
    fn test_remove() {
        let mut meta = Meta::new();
        meta.set("flag", "1");
        assert_eq!(meta.remove("flag"), Some("1".to_string()));
        assert!(meta.get("flag").is_none());
    }
}
