//! Page processing: metadata split, markdown rendering and post-processing.

pub mod highlight;
pub mod wikilinks;

use crate::meta::{split_page, Meta};
use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

pub use highlight::HighlightTransformer;
pub use wikilinks::WikilinkTransformer;

#[derive(Debug, Clone)]
struct TocItem {
    title: String,
    id: String,
}

/// Result of processing a page's raw text.
#[derive(Debug, Clone, Default)]
pub struct Processed {
    pub meta: Meta,
    /// Markdown body without the metadata header
    pub body: String,
    pub html: String,
    /// Contents block, present when the body has level-1 headings
    pub toc: Option<String>,
    /// Page urls referenced through wikilinks
    pub links: Vec<String>,
}

/// Markdown processor with wiki extensions
pub struct Processor {
    options: Options,
}

impl Processor {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        Self { options }
    }

    /// Run the full pipeline over raw page text (metadata header + body).
    pub fn process(&self, text: &str) -> Processed {
        let (meta, body) = split_page(text);
        let (html, toc, links) = self.render(&body);

        Processed {
            meta,
            body,
            html,
            toc,
            links,
        }
    }

    /// Render a markdown body to HTML
    ///
    /// Returns (html, toc_html, outgoing_links)
    pub fn render(&self, markdown: &str) -> (String, Option<String>, Vec<String>) {
        let events: Vec<Event> = Parser::new_ext(markdown, self.options)
            .map(escape_raw_html)
            .collect();

        let headings = collect_top_headings(&events);

        let (events, links) = WikilinkTransformer::new().transform(events);
        let events = attach_heading_ids(events, &headings);
        let events = HighlightTransformer::new().transform(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        let toc = if headings.is_empty() {
            None
        } else {
            Some(render_toc(&headings))
        };

        (html_output, toc, links)
    }

    /// Render markdown without the contents block, for previews.
    pub fn render_simple(&self, markdown: &str) -> String {
        self.render(markdown).0
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw HTML in a page is shown as text; any editor could otherwise plant scripts.
fn escape_raw_html(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        other => other,
    }
}

/// Anchor id for a heading: the heading text with spaces as underscores.
pub fn heading_anchor(title: &str) -> String {
    title.trim().replace(' ', "_")
}

fn collect_top_headings(events: &[Event]) -> Vec<TocItem> {
    let mut toc = Vec::new();
    let mut current: Option<String> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => current = Some(String::new()),
            Event::Text(text) | Event::Code(text) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                if let Some(title) = current.take() {
                    let id = heading_anchor(&title);
                    toc.push(TocItem { title, id });
                }
            }
            _ => {}
        }
    }

    toc
}

fn attach_heading_ids(events: Vec<Event<'static>>, headings: &[TocItem]) -> Vec<Event<'static>> {
    let mut heading_iter = headings.iter();

    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                id,
                classes,
                attrs,
            }) => {
                let id = match (id, heading_iter.next()) {
                    (None, Some(next)) => Some(CowStr::Boxed(next.id.clone().into_boxed_str())),
                    (id, _) => id,
                };
                Event::Start(Tag::Heading {
                    level: HeadingLevel::H1,
                    id,
                    classes,
                    attrs,
                })
            }
            other => other,
        })
        .collect()
}

fn render_toc(headings: &[TocItem]) -> String {
    let mut html = String::from(r#"<nav class="toc-nav"><h3>Contents</h3><ul class="toc-list">"#);
    for h in headings {
        html.push_str(&format!(
            r##"<li><a href="#{}">{}</a></li>"##,
            html_escape(&h.id),
            html_escape(&h.title)
        ));
    }
    html.push_str("</ul></nav>");
    html
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
