//! Wiki page model.

use crate::error::Result;
use crate::markup::Processor;
use crate::meta::Meta;
use std::path::{Path, PathBuf};

/// A single wiki page backed by a markdown file.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub path: PathBuf,
    pub meta: Meta,
    /// Markdown body without the metadata header
    pub body: String,
    pub html: String,
    pub toc: Option<String>,
    pub links: Vec<String>,
}

impl Page {
    /// An unsaved page with no content.
    pub fn new(path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            meta: Meta::new(),
            body: String::new(),
            html: String::new(),
            toc: None,
            links: Vec::new(),
        }
    }

    /// Read and render a page file.
    pub fn load(path: &Path, url: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut page = Self::new(path, url);
        page.apply(&content);
        Ok(page)
    }

    fn apply(&mut self, content: &str) {
        let processed = Processor::new().process(content);
        self.meta = processed.meta;
        self.body = processed.body;
        self.html = processed.html;
        self.toc = processed.toc;
        self.links = processed.links;
    }

    /// Re-render html from the current metadata and body.
    pub fn render(&mut self) {
        let content = self.to_file_content();
        self.apply(&content);
    }

    /// File representation: metadata lines, a blank line, then the body.
    pub fn to_file_content(&self) -> String {
        let mut out = self.meta.to_header();
        out.push('\n');
        out.push_str(&self.body.replace("\r\n", "\n"));
        out
    }

    pub fn title(&self) -> &str {
        self.meta.get("title").unwrap_or(&self.url)
    }

    pub fn set_title(&mut self, title: &str) {
        self.meta.set("title", title);
    }

    /// Raw comma separated tags
    pub fn tags(&self) -> &str {
        self.meta.get("tags").unwrap_or("")
    }

    pub fn set_tags(&mut self, tags: &str) {
        self.meta.set("tags", tags);
    }

    pub fn tag_list(&self) -> Vec<String> {
        self.tags()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_list().iter().any(|t| t == tag)
    }

    fn meta_number(&self, key: &str) -> u64 {
        self.meta
            .get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0)
    }

    /// Average rating as stored, 0 when never rated
    pub fn rating(&self) -> u64 {
        self.meta_number("rating")
    }

    pub fn times_rated(&self) -> u64 {
        self.meta_number("timesrated")
    }

    pub fn rating_total(&self) -> u64 {
        self.meta_number("total")
    }

    /// Add a score and recompute the stored average.
    pub fn add_rating(&mut self, score: u32) {
        let total = self.rating_total() + u64::from(score);
        let times = self.times_rated() + 1;
        self.meta.set("total", total.to_string());
        self.meta.set("timesrated", times.to_string());
        self.meta.set("rating", (total / times).to_string());
    }

    /// Number of times the page was flagged for review
    pub fn flag(&self) -> u64 {
        self.meta_number("flag")
    }

    pub fn set_flag(&mut self, flag: u64) {
        if flag == 0 {
            self.meta.remove("flag");
        } else {
            self.meta.set("flag", flag.to_string());
        }
    }

    /// Lookup used by grouping and search: title, tags, body or any metadata key.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(self.title()),
            "tags" => Some(self.tags()),
            "body" => Some(&self.body),
            "url" => Some(&self.url),
            other => self.meta.get(other),
        }
    }
}
