//! Request handlers, grouped by what they serve.

pub mod browse;
pub mod pages;
pub mod users;

/// Canonical location of a page.
pub(crate) fn page_location(url: &str) -> String {
    if url.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", url)
    }
}
