//! Filesystem-backed page store.
//!
//! Pages live at `<root>/<url>.md`; revision history lives beside them at
//! `<root>/history/<url>.json`.

use crate::error::{Result, WikiError};
use crate::history::{History, Revision};
use crate::page::Page;
use crate::url::clean_url;
use parking_lot::Mutex;
use regex::RegexBuilder;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

pub const HISTORY_DIR: &str = "history";

/// Attributes searched when none are given.
pub const DEFAULT_SEARCH_ATTRS: [&str; 3] = ["title", "tags", "body"];

pub struct Wiki {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl Wiki {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path for a url, rejecting anything that would leave the root.
    fn relative(&self, url: &str) -> Result<PathBuf> {
        let cleaned = clean_url(url);
        // Urls end up in `Location` headers.
        if cleaned.chars().any(char::is_control) {
            return Err(WikiError::InvalidUrl(url.to_string()));
        }
        let mut rel = PathBuf::new();
        for comp in Path::new(&cleaned).components() {
            match comp {
                Component::CurDir => continue,
                Component::Normal(part) => rel.push(part),
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(WikiError::OutsideRoot(url.to_string()))
                }
            }
        }

        if rel.as_os_str().is_empty() || rel.starts_with(HISTORY_DIR) {
            return Err(WikiError::InvalidUrl(url.to_string()));
        }
        Ok(rel)
    }

    /// Location of the page file for `url`.
    pub fn path(&self, url: &str) -> Result<PathBuf> {
        let rel = self.relative(url)?;
        let mut path = self.root.join(rel).into_os_string();
        path.push(".md");
        Ok(PathBuf::from(path))
    }

    fn history_path(&self, url: &str) -> Result<PathBuf> {
        let rel = self.relative(url)?;
        let mut path = self.root.join(HISTORY_DIR).join(rel).into_os_string();
        path.push(".json");
        Ok(PathBuf::from(path))
    }

    pub fn exists(&self, url: &str) -> bool {
        self.path(url).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn get(&self, url: &str) -> Result<Option<Page>> {
        let path = self.path(url)?;
        if !path.is_file() {
            return Ok(None);
        }
        Page::load(&path, &clean_url(url)).map(Some)
    }

    pub fn get_or_missing(&self, url: &str) -> Result<Page> {
        self.get(url)?
            .ok_or_else(|| WikiError::PageNotFound(clean_url(url)))
    }

    /// A fresh, unsaved page for `url`, or `None` if one already exists.
    pub fn get_bare(&self, url: &str) -> Result<Option<Page>> {
        let path = self.path(url)?;
        if path.exists() {
            return Ok(None);
        }
        Ok(Some(Page::new(path, clean_url(url))))
    }

    pub fn history(&self, url: &str) -> Result<History> {
        History::open(self.history_path(url)?, &clean_url(url))
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        if let Some(folder) = page.path.parent() {
            std::fs::create_dir_all(folder)?;
        }
        std::fs::write(&page.path, page.to_file_content())?;
        Ok(())
    }

    /// Write the page and record its body as a new revision by `user`.
    pub fn save(&self, page: &mut Page, user: &str) -> Result<Revision> {
        let _guard = self.write_lock.lock();
        self.save_locked(page, user)
    }

    fn save_locked(&self, page: &mut Page, user: &str) -> Result<Revision> {
        page.body = page.body.replace("\r\n", "\n");
        self.write_page(page)?;
        let revision = self.history(&page.url)?.save(user, &page.body)?;
        page.render();

        tracing::info!(url = %page.url, %user, "page saved");
        Ok(revision)
    }

    /// Replace the body with an older revision's, recorded as a new revision.
    pub fn restore(&self, url: &str, timestamp: &str, user: &str) -> Result<Page> {
        let _guard = self.write_lock.lock();
        let mut page = self.get_or_missing(url)?;
        let version = self.history(url)?.get(timestamp)?.version.clone();
        page.body = version;
        self.save_locked(&mut page, user)?;
        Ok(page)
    }

    pub fn move_page(&self, url: &str, new_url: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let source = self.path(url)?;
        if !source.is_file() {
            return Err(WikiError::PageNotFound(clean_url(url)));
        }
        let target = self.path(new_url)?;
        if target.exists() {
            return Err(WikiError::PageExists(clean_url(new_url)));
        }

        if let Some(folder) = target.parent() {
            std::fs::create_dir_all(folder)?;
        }
        std::fs::rename(&source, &target)?;

        let old_history = self.history_path(url)?;
        if old_history.is_file() {
            let new_history = self.history_path(new_url)?;
            if let Some(folder) = new_history.parent() {
                std::fs::create_dir_all(folder)?;
            }
            std::fs::rename(&old_history, &new_history)?;
        }

        tracing::info!(from = %clean_url(url), to = %clean_url(new_url), "page moved");
        Ok(())
    }

    /// Remove a page and its history. Returns false if there was no such page.
    pub fn delete(&self, url: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let path = self.path(url)?;
        if !path.is_file() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;

        let history = self.history_path(url)?;
        if history.is_file() {
            std::fs::remove_file(&history)?;
        }

        tracing::info!(url = %clean_url(url), "page deleted");
        Ok(true)
    }

    /// Add a 1-5 score to the page's rating.
    pub fn rate(&self, url: &str, score: u32) -> Result<Page> {
        if !(1..=5).contains(&score) {
            return Err(WikiError::InvalidRating(score));
        }
        let _guard = self.write_lock.lock();
        let mut page = self.get_or_missing(url)?;
        page.add_rating(score);
        self.write_page(&page)?;
        page.render();
        Ok(page)
    }

    /// Flag a page for review, or clear its flags.
    pub fn set_flagged(&self, url: &str, flagged: bool) -> Result<Page> {
        let _guard = self.write_lock.lock();
        let mut page = self.get_or_missing(url)?;
        let flag = if flagged { page.flag() + 1 } else { 0 };
        page.set_flag(flag);
        self.write_page(&page)?;
        page.render();
        Ok(page)
    }

    /// Every page under the root, sorted by title.
    pub fn index(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        if !self.root.is_dir() {
            return Ok(pages);
        }
        let history_root = self.root.join(HISTORY_DIR);

        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.path() != history_root.as_path())
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let rel = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .with_extension("");
            let url = clean_url(&rel.to_string_lossy());

            match Page::load(path, &url) {
                Ok(page) => pages.push(page),
                Err(err) => tracing::warn!(path = %path.display(), %err, "skipping unreadable page"),
            }
        }

        sort_by_title(&mut pages);
        Ok(pages)
    }

    /// Group pages by the value of an attribute (see [`Page::attr`]).
    pub fn index_by(&self, key: &str) -> Result<BTreeMap<String, Vec<Page>>> {
        let mut grouped: BTreeMap<String, Vec<Page>> = BTreeMap::new();
        for page in self.index()? {
            let value = page.attr(key).unwrap_or("").to_string();
            grouped.entry(value).or_default().push(page);
        }
        Ok(grouped)
    }

    pub fn get_by_title(&self, title: &str) -> Result<Option<Page>> {
        Ok(self.index()?.into_iter().find(|p| p.title() == title))
    }

    /// Tag -> pages carrying it.
    pub fn get_tags(&self) -> Result<BTreeMap<String, Vec<Page>>> {
        let mut tags: BTreeMap<String, Vec<Page>> = BTreeMap::new();
        for page in self.index()? {
            for tag in page.tag_list() {
                tags.entry(tag).or_default().push(page.clone());
            }
        }
        Ok(tags)
    }

    pub fn index_by_tag(&self, tag: &str) -> Result<Vec<Page>> {
        let tag = tag.trim();
        let mut tagged: Vec<Page> = self
            .index()?
            .into_iter()
            .filter(|p| p.has_tag(tag))
            .collect();
        sort_by_title(&mut tagged);
        Ok(tagged)
    }

    /// Pages with a wikilink to `url`, sorted by title.
    pub fn backlinks(&self, url: &str) -> Result<Vec<Page>> {
        let url = clean_url(url);
        Ok(self
            .index()?
            .into_iter()
            .filter(|p| p.url != url && p.links.iter().any(|link| *link == url))
            .collect())
    }

    pub fn flagged(&self) -> Result<Vec<Page>> {
        Ok(self
            .index()?
            .into_iter()
            .filter(|p| p.flag() > 0)
            .collect())
    }

    /// Pages where any of `attrs` matches the regular expression `term`.
    pub fn search(&self, term: &str, ignore_case: bool, attrs: &[&str]) -> Result<Vec<Page>> {
        let regex = RegexBuilder::new(term)
            .case_insensitive(ignore_case)
            .build()?;

        Ok(self
            .index()?
            .into_iter()
            .filter(|page| {
                attrs
                    .iter()
                    .any(|attr| page.attr(attr).is_some_and(|value| regex.is_match(value)))
            })
            .collect())
    }
}

fn sort_by_title(pages: &mut [Page]) {
    pages.sort_by_cached_key(|p| p.title().to_lowercase());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create(wiki: &Wiki, url: &str, title: &str, tags: &str, body: &str) -> Page {
        let mut page = wiki.get_bare(url).unwrap().expect("page is new");
        page.set_title(title);
        page.set_tags(tags);
        page.body = body.to_string();
        wiki.save(&mut page, "tester").unwrap();
        page
    }

    #[test]
    fn test_save_and_get() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        let page = create(&wiki, "Home Page", "Home", "start", "Welcome to [[Other]]");

        assert_eq!(page.url, "home_page");
        assert!(dir.path().join("home_page.md").is_file());
        assert!(page.html.contains(r#"<a href="/other/">Other</a>"#));

        let loaded = wiki.get("home_page").unwrap().unwrap();
        assert_eq!(loaded.title(), "Home");
        assert_eq!(loaded.body, "Welcome to [[Other]]");
        assert!(wiki.get("missing").unwrap().is_none());
        assert!(matches!(
            wiki.get_or_missing("missing"),
            Err(WikiError::PageNotFound(_))
        ));
    }

    #[test]
    fn test_save_records_history() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        let mut page = create(&wiki, "notes/todo", "Todo", "", "v1");
        page.body = "v2".to_string();
        wiki.save(&mut page, "second").unwrap();

        assert!(dir.path().join("history/notes/todo.json").is_file());
        let revisions = wiki.history("notes/todo").unwrap().revisions();
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].version, "v2");
        assert_eq!(revisions[0].user, "second");
    }

    #[test]
    fn test_get_bare_existing() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "taken", "Taken", "", "");
        assert!(wiki.get_bare("taken").unwrap().is_none());
    }

    #[test]
    fn test_url_outside_root_rejected() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path().join("content"));
        assert!(matches!(
            wiki.path("../escape"),
            Err(WikiError::OutsideRoot(_))
        ));
        assert!(matches!(wiki.path("   "), Err(WikiError::InvalidUrl(_))));
        assert!(matches!(
            wiki.path("history/page"),
            Err(WikiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_control_characters_rejected() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        assert!(matches!(wiki.path("bad\nname"), Err(WikiError::InvalidUrl(_))));
        assert!(matches!(wiki.get_bare("bad\u{1}name"), Err(WikiError::InvalidUrl(_))));

        create(&wiki, "ok", "Ok", "", "");
        assert!(matches!(
            wiki.move_page("ok", "to\tabs"),
            Err(WikiError::InvalidUrl(_))
        ));
        assert!(wiki.exists("ok"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_backlinks() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "target", "Target", "", "Self link [[Target]]");
        create(&wiki, "fan", "Fan", "", "See [[Target]] and [[Other]]");
        create(&wiki, "code", "Code", "", "`[[Target]]`");
        create(&wiki, "other", "Other", "", "nothing");

        let urls: Vec<String> = wiki
            .backlinks("Target")
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(urls, vec!["fan"]);
    }

    #[test]
    fn test_move_page_with_history() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "draft", "Draft", "", "text");

        wiki.move_page("draft", "archive/final").unwrap();
        assert!(!wiki.exists("draft"));
        assert!(wiki.exists("archive/final"));
        assert_eq!(wiki.history("archive/final").unwrap().len(), 1);

        assert!(matches!(
            wiki.move_page("draft", "x"),
            Err(WikiError::PageNotFound(_))
        ));
        assert!(matches!(
            wiki.move_page("archive/final", "../../etc/passwd"),
            Err(WikiError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_move_onto_existing_page() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "a", "A", "", "");
        create(&wiki, "b", "B", "", "");
        assert!(matches!(
            wiki.move_page("a", "b"),
            Err(WikiError::PageExists(_))
        ));
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "gone", "Gone", "", "");

        assert!(wiki.delete("gone").unwrap());
        assert!(!dir.path().join("gone.md").exists());
        assert!(!dir.path().join("history/gone.json").exists());
        assert!(!wiki.delete("gone").unwrap());
    }

    #[test]
    fn test_index_sorted_and_skips_history() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "zeta", "alpha page", "", "");
        create(&wiki, "sub/page", "Beta", "", "");
        create(&wiki, "alpha", "Gamma", "", "");

        let titles: Vec<String> = wiki
            .index()
            .unwrap()
            .iter()
            .map(|p| p.title().to_string())
            .collect();
        assert_eq!(titles, vec!["alpha page", "Beta", "Gamma"]);

        let urls: Vec<String> = wiki.index().unwrap().into_iter().map(|p| p.url).collect();
        assert!(urls.contains(&"sub/page".to_string()));
    }

    #[test]
    fn test_index_of_missing_root() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path().join("nope"));
        assert!(wiki.index().unwrap().is_empty());
    }

    #[test]
    fn test_tags() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "one", "One", "rust, wiki", "");
        create(&wiki, "two", "Two", "rust", "");
        create(&wiki, "three", "Three", "rusty", "");

        let tags = wiki.get_tags().unwrap();
        assert_eq!(tags["rust"].len(), 2);
        assert_eq!(tags["wiki"].len(), 1);
        assert_eq!(tags.len(), 3);

        let tagged = wiki.index_by_tag("rust").unwrap();
        let titles: Vec<_> = tagged.iter().map(|p| p.title().to_string()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[test]
    fn test_search() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "cats", "Cats", "animals", "Cats purr.");
        create(&wiki, "dogs", "Dogs", "animals", "Dogs BARK loudly.");
        create(&wiki, "cars", "Cars", "machines", "Engines.");

        let hits = wiki.search("bark", true, &DEFAULT_SEARCH_ATTRS).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "dogs");

        assert!(wiki.search("bark", false, &DEFAULT_SEARCH_ATTRS).unwrap().is_empty());
        assert_eq!(wiki.search("^ca", true, &["title"]).unwrap().len(), 2);
        assert_eq!(wiki.search("animals", true, &["tags"]).unwrap().len(), 2);

        assert!(matches!(
            wiki.search("(unclosed", true, &DEFAULT_SEARCH_ATTRS),
            Err(WikiError::InvalidSearch(_))
        ));
    }

    #[test]
    fn test_rate() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "rated", "Rated", "", "");

        wiki.rate("rated", 4).unwrap();
        let page = wiki.rate("rated", 1).unwrap();
        assert_eq!(page.rating(), 2);
        assert_eq!(wiki.get("rated").unwrap().unwrap().times_rated(), 2);
        assert_eq!(wiki.history("rated").unwrap().len(), 1);

        assert!(matches!(wiki.rate("rated", 0), Err(WikiError::InvalidRating(0))));
        assert!(matches!(wiki.rate("rated", 6), Err(WikiError::InvalidRating(6))));
    }

    #[test]
    fn test_flagging() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "dubious", "Dubious", "", "");
        create(&wiki, "fine", "Fine", "", "");

        wiki.set_flagged("dubious", true).unwrap();
        wiki.set_flagged("dubious", true).unwrap();
        let flagged = wiki.flagged().unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].flag(), 2);

        wiki.set_flagged("dubious", false).unwrap();
        assert!(wiki.flagged().unwrap().is_empty());
    }

    #[test]
    fn test_restore() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        let mut page = create(&wiki, "doc", "Doc", "", "original");
        let first = wiki.history("doc").unwrap().latest().unwrap();
        page.body = "vandalized".to_string();
        wiki.save(&mut page, "vandal").unwrap();

        let restored = wiki.restore("doc", &first.timestamp, "admin").unwrap();
        assert_eq!(restored.body, "original");
        assert_eq!(wiki.history("doc").unwrap().len(), 3);
    }

    #[test]
    fn test_index_by_and_title_lookup() {
        let dir = tempdir().unwrap();
        let wiki = Wiki::new(dir.path());
        create(&wiki, "p1", "Same", "x", "");
        create(&wiki, "p2", "Same", "y", "");
        create(&wiki, "p3", "Other", "x", "");

        let by_tags = wiki.index_by("tags").unwrap();
        assert_eq!(by_tags["x"].len(), 2);
        assert_eq!(wiki.get_by_title("Other").unwrap().unwrap().url, "p3");
        assert!(wiki.get_by_title("Nope").unwrap().is_none());
    }
}
