//! # tinywiki-render
//!
//! Server-side HTML for tinywiki.
//!
//! This crate holds the Askama templates and the embedded stylesheet.

pub mod templates;

use include_dir::{include_dir, Dir};

/// Files served under `/static/`
pub static ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/static");

pub use templates::{
    Chrome, CreateTemplate, DiffEntry, EditorTemplate, ErrorTemplate, HistoryTemplate,
    IndexTemplate, LoginTemplate, MoveTemplate, PageEntry, PageTemplate, RevisionEntry,
    RevisionTemplate, SearchTemplate, TagEntry, TagsTemplate, UserCreateTemplate, UserEntry,
    UserTemplate, UsersTemplate,
};

/// Look up an embedded asset and its content type.
pub fn asset(path: &str) -> Option<(&'static [u8], &'static str)> {
    let file = ASSETS.get_file(path.trim_start_matches('/'))?;
    let content_type = match file.path().extension().and_then(|e| e.to_str()) {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    };
    Some((file.contents(), content_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stylesheet_embedded() {
        let (bytes, content_type) = asset("style.css").expect("stylesheet");
        assert!(!bytes.is_empty());
        assert!(content_type.starts_with("text/css"));
        assert!(asset("missing.css").is_none());
    }
}
