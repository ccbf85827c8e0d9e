//! Askama template definitions.

use askama::Template;
use tinywiki_core::{DiffKind, DiffLine, Page, Revision, User};

/// Shared header state: site title and who is logged in
#[derive(Debug, Clone)]
pub struct Chrome {
    pub site_title: String,
    pub user: Option<String>,
}

/// A page entry for display in lists
#[derive(Debug, Clone)]
pub struct PageEntry {
    pub url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub flag: u64,
}

impl From<&Page> for PageEntry {
    fn from(page: &Page) -> Self {
        Self {
            url: page.url.clone(),
            title: page.title().to_string(),
            tags: page.tag_list(),
            flag: page.flag(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagEntry {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct RevisionEntry {
    pub timestamp: String,
    pub user: String,
    pub date: String,
}

impl From<&Revision> for RevisionEntry {
    fn from(revision: &Revision) -> Self {
        Self {
            timestamp: revision.timestamp.clone(),
            user: revision.user.clone(),
            date: revision.formatted_date.clone(),
        }
    }
}

/// One diff line with its css class and `+`/`-` marker
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub class: &'static str,
    pub marker: &'static str,
    pub text: String,
}

impl From<&DiffLine> for DiffEntry {
    fn from(line: &DiffLine) -> Self {
        let (class, marker) = match line.kind {
            DiffKind::Same => ("same", " "),
            DiffKind::Added => ("added", "+"),
            DiffKind::Removed => ("removed", "-"),
        };
        Self {
            class,
            marker,
            text: line.text.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserEntry {
    pub name: String,
    pub active: bool,
    pub roles: Vec<String>,
}

impl From<&User> for UserEntry {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            active: user.active,
            roles: user.roles.clone(),
        }
    }
}

/// Wiki page display
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub chrome: Chrome,
    pub url: String,
    pub title: String,
    pub html: String,
    pub toc: Option<String>,
    pub tags: Vec<String>,
    pub rating: u64,
    pub times_rated: u64,
    pub flag: u64,
    /// Pages that link here
    pub backlinks: Vec<PageEntry>,
}

impl PageTemplate {
    pub fn new(chrome: Chrome, page: &Page) -> Self {
        Self {
            chrome,
            url: page.url.clone(),
            title: page.title().to_string(),
            html: page.html.clone(),
            toc: page.toc.clone(),
            tags: page.tag_list(),
            rating: page.rating(),
            times_rated: page.times_rated(),
            flag: page.flag(),
            backlinks: Vec::new(),
        }
    }

    pub fn with_backlinks(mut self, pages: &[Page]) -> Self {
        self.backlinks = pages.iter().map(PageEntry::from).collect();
        self
    }
}

/// Page listing: full index, a tag, or flagged pages
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub chrome: Chrome,
    pub heading: String,
    pub empty_message: String,
    pub pages: Vec<PageEntry>,
}

#[derive(Template)]
#[template(path = "editor.html")]
pub struct EditorTemplate {
    pub chrome: Chrome,
    pub url: String,
    pub title: String,
    pub body: String,
    pub tags: String,
    pub is_new: bool,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "create.html")]
pub struct CreateTemplate {
    pub chrome: Chrome,
    pub url: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "move.html")]
pub struct MoveTemplate {
    pub chrome: Chrome,
    pub url: String,
    pub title: String,
    pub new_url: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub chrome: Chrome,
    pub term: String,
    pub ignore_case: bool,
    /// `None` before a search was submitted
    pub results: Option<Vec<PageEntry>>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub chrome: Chrome,
    pub tags: Vec<TagEntry>,
}

#[derive(Template)]
#[template(path = "history.html")]
pub struct HistoryTemplate {
    pub chrome: Chrome,
    pub url: String,
    pub title: String,
    pub revisions: Vec<RevisionEntry>,
}

#[derive(Template)]
#[template(path = "revision.html")]
pub struct RevisionTemplate {
    pub chrome: Chrome,
    pub url: String,
    pub title: String,
    pub revision: RevisionEntry,
    pub body: String,
    pub diff: Vec<DiffEntry>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub next: String,
    pub name: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "users.html")]
pub struct UsersTemplate {
    pub chrome: Chrome,
    pub users: Vec<UserEntry>,
    pub can_admin: bool,
}

#[derive(Template)]
#[template(path = "user.html")]
pub struct UserTemplate {
    pub chrome: Chrome,
    pub profile: UserEntry,
    pub can_admin: bool,
}

#[derive(Template)]
#[template(path = "user_create.html")]
pub struct UserCreateTemplate {
    pub chrome: Chrome,
    pub name: String,
    pub error: Option<String>,
}

/// Error page (404, 400, 500)
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub chrome: Chrome,
    pub status: u16,
    pub message: String,
    /// Offered when a missing page could be created
    pub create_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinywiki_core::Processor;

    fn chrome(user: Option<&str>) -> Chrome {
        Chrome {
            site_title: "Test Wiki".into(),
            user: user.map(str::to_string),
        }
    }

    #[test]
    fn test_page_template_renders_html_unescaped() {
        let processed = Processor::new().process("title: Hello\ntags: a, b\n\n# Intro\n\n**bold**");
        let mut page = Page::new("/tmp/hello.md", "hello");
        page.meta = processed.meta;
        page.body = processed.body;
        page.html = processed.html;
        page.toc = processed.toc;

        let html = PageTemplate::new(chrome(Some("ana")), &page)
            .render()
            .unwrap();
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<h3>Contents</h3>"));
        assert!(html.contains("Hello - Test Wiki"));
        assert!(html.contains("Log out"));
        assert!(html.contains("Not rated yet."));
        assert!(!html.contains("Linked from"));
    }

    #[test]
    fn test_page_template_lists_backlinks() {
        let page = Page::new("/tmp/target.md", "target");
        let mut source = Page::new("/tmp/source.md", "source");
        source.set_title("Source Page");

        let html = PageTemplate::new(chrome(None), &page)
            .with_backlinks(&[source])
            .render()
            .unwrap();
        assert!(html.contains("Linked from"));
        assert!(html.contains(r#"<a href="/source/">Source Page</a>"#));
    }

    #[test]
    fn test_user_content_escaped() {
        let html = CreateTemplate {
            chrome: chrome(None),
            url: "<script>".into(),
            error: Some("bad & wrong".into()),
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("bad &amp; wrong"));
        assert!(html.contains("Log in"));
    }

    #[test]
    fn test_diff_entries() {
        let line = DiffLine {
            kind: DiffKind::Removed,
            text: "gone".into(),
        };
        let entry = DiffEntry::from(&line);
        assert_eq!(entry.class, "removed");
        assert_eq!(entry.marker, "-");
    }

    #[test]
    fn test_empty_index() {
        let html = IndexTemplate {
            chrome: chrome(None),
            heading: "All pages".into(),
            empty_message: "Nothing here yet.".into(),
            pages: vec![],
        }
        .render()
        .unwrap();
        assert!(html.contains("Nothing here yet."));
    }
}
