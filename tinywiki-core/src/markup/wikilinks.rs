//! Wikilink transformation for [[Target]] and [[location/target|Label]] syntax.
//!
//! Targets are always resolved from the wiki root, so sub-pages are written
//! as `[[page/subpage|Subpage]]`.

use crate::url::clean_url;
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};

/// Transformer for wikilink syntax
pub struct WikilinkTransformer;

impl WikilinkTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform events, converting [[wikilinks]] to links
    ///
    /// Returns (transformed_events, outgoing_urls)
    pub fn transform(&self, events: Vec<Event<'_>>) -> (Vec<Event<'static>>, Vec<String>) {
        let mut result = Vec::with_capacity(events.len());
        let mut outgoing = Vec::new();
        let mut in_code_block = false;
        let mut pending_text = String::new();

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    self.flush(&mut pending_text, &mut result, &mut outgoing);
                    in_code_block = true;
                    result.push(Event::Start(Tag::CodeBlock(kind)).into_static());
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    result.push(Event::End(TagEnd::CodeBlock));
                }
                // pulldown splits text around brackets, so merge runs first
                Event::Text(text) if !in_code_block => pending_text.push_str(&text),
                other => {
                    self.flush(&mut pending_text, &mut result, &mut outgoing);
                    result.push(other.into_static());
                }
            }
        }
        self.flush(&mut pending_text, &mut result, &mut outgoing);

        (result, outgoing)
    }

    fn flush(
        &self,
        pending: &mut String,
        result: &mut Vec<Event<'static>>,
        outgoing: &mut Vec<String>,
    ) {
        if pending.is_empty() {
            return;
        }
        let text = std::mem::take(pending);
        if text.contains("[[") && text.contains("]]") {
            let (events, links) = self.process_wikilinks(&text);
            result.extend(events);
            outgoing.extend(links);
        } else {
            result.push(Event::Text(CowStr::Boxed(text.into_boxed_str())));
        }
    }

    fn process_wikilinks(&self, text: &str) -> (Vec<Event<'static>>, Vec<String>) {
        let mut events = Vec::new();
        let mut links = Vec::new();
        let mut remaining = text;

        while let Some(start) = remaining.find("[[") {
            let Some(end) = remaining[start..].find("]]") else {
                break;
            };
            let inner = &remaining[start + 2..start + end];

            match self.create_link(inner) {
                Some((link_events, url)) => {
                    if start > 0 {
                        events.push(text_event(&remaining[..start]));
                    }
                    events.extend(link_events);
                    links.push(url);
                }
                // `[[]]` and friends stay literal
                None => events.push(text_event(&remaining[..start + end + 2])),
            }

            remaining = &remaining[start + end + 2..];
        }

        if !remaining.is_empty() {
            events.push(text_event(remaining));
        }

        (events, links)
    }

    fn create_link(&self, inner: &str) -> Option<(Vec<Event<'static>>, String)> {
        let (target, label) = match inner.split_once('|') {
            Some((target, label)) => (target.trim(), Some(label.trim())),
            None => (inner.trim(), None),
        };

        let url = clean_url(target);
        if url.is_empty() {
            return None;
        }
        let label = label.filter(|l| !l.is_empty()).unwrap_or(target);

        let events = vec![
            Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: CowStr::Boxed(format!("/{url}/").into_boxed_str()),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }),
            text_event(label),
            Event::End(TagEnd::Link),
        ];

        Some((events, url))
    }
}

impl Default for WikilinkTransformer {
    fn default() -> Self {
        Self::new()
    }
}

fn text_event(text: &str) -> Event<'static> {
    Event::Text(CowStr::Boxed(text.to_string().into_boxed_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrefs(events: &[Event<'static>]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Start(Tag::Link { dest_url, .. }) => Some(dest_url.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_simple_wikilink() {
        let transformer = WikilinkTransformer::new();
        let events = vec![Event::Text(CowStr::Borrowed("Check out [[Getting Started]]"))];

        let (result, links) = transformer.transform(events);

        assert_eq!(links, vec!["getting_started"]);
        assert_eq!(hrefs(&result), vec!["/getting_started/"]);
    }

    #[test]
    fn test_wikilink_with_label() {
        let transformer = WikilinkTransformer::new();
        let events = vec![Event::Text(CowStr::Borrowed(
            "See [[projects/Road Map|the roadmap]]",
        ))];
        let (result, links) = transformer.transform(events);

        assert_eq!(links, vec!["projects/road_map"]);
        assert!(result
            .iter()
            .any(|e| matches!(e, Event::Text(t) if t.as_ref() == "the roadmap")));
    }

    #[test]
    fn test_split_text_events_are_merged() {
        let transformer = WikilinkTransformer::new();
        let events = vec![
            Event::Text(CowStr::Borrowed("before [")),
            Event::Text(CowStr::Borrowed("[Page")),
            Event::Text(CowStr::Borrowed("]]")),
        ];
        let (result, links) = transformer.transform(events);

        assert_eq!(links, vec!["page"]);
        assert_eq!(hrefs(&result), vec!["/page/"]);
    }

    #[test]
    fn test_code_blocks_untouched() {
        let transformer = WikilinkTransformer::new();
        let events = vec![
            Event::Start(Tag::CodeBlock(pulldown_cmark::CodeBlockKind::Indented)),
            Event::Text(CowStr::Borrowed("[[Not A Link]]")),
            Event::End(TagEnd::CodeBlock),
        ];
        let (result, links) = transformer.transform(events);

        assert!(links.is_empty());
        assert!(hrefs(&result).is_empty());
    }

    #[test]
    fn test_unclosed_is_literal() {
        let transformer = WikilinkTransformer::new();
        let events = vec![Event::Text(CowStr::Borrowed("a [[dangling link"))];
        let (result, links) = transformer.transform(events);

        assert!(links.is_empty());
        assert!(matches!(&result[0], Event::Text(t) if t.as_ref() == "a [[dangling link"));
    }
}
