//! Feed reader: fetch a source and turn it into entries to process
//!
//! Handles RSS 2.0 `<item>` and Atom `<entry>` elements. Entries come back
//! oldest-first (the reverse of feed order) so an interrupted run resumes
//! where it stopped.

use chrono::{DateTime, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{FeedError, Result};
use crate::fetcher::Fetcher;
use crate::types::{FeedEntry, SourceSpec};

pub struct FeedReader<'a> {
    fetcher: &'a dyn Fetcher,
    gateway: String,
}

impl<'a> FeedReader<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, gateway: &str) -> Self {
        Self {
            fetcher,
            gateway: gateway.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the entries of `source`, oldest first
    ///
    /// Also returns the bound source account: the handle for gateway
    /// sources, `None` for literal feed URLs.
    pub async fn fetch(&self, source: &SourceSpec) -> Result<(Vec<FeedEntry>, Option<String>)> {
        let url = source.feed_url(&self.gateway);
        let body = self.fetcher.fetch_feed(&url).await?;

        let mut entries = parse_feed(&body)?;
        entries.reverse();
        tracing::debug!("Parsed {} entries from {}", entries.len(), url);

        Ok((entries, source.account().map(str::to_string)))
    }
}

/// Parse an RSS or Atom document into entries, in document order
///
/// Only direct children of `<item>`/`<entry>` feed the entry's fields; an
/// Atom `<source>` block is skipped. Entries without an identifier or a
/// parseable publication date are dropped with a warning; they can be
/// neither deduplicated nor aged.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    // Names of the currently open elements, outermost first
    let mut open: Vec<String> = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    // Index of the open item/entry element in `open`
    let mut entry_depth = 0;
    let mut saw_feed = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);
                match name.as_str() {
                    "rss" | "feed" | "rdf:RDF" => saw_feed = true,
                    "item" | "entry" if current.is_none() => {
                        current = Some(EntryBuilder::default());
                        entry_depth = open.len();
                    }
                    "link" => {
                        if let Some(ref mut entry) = current {
                            if open.len() == entry_depth + 1 {
                                entry.take_link_attribute(&e);
                            }
                        }
                    }
                    _ => {}
                }
                open.push(name);
            }
            Ok(Event::Empty(e)) => {
                if let Some(ref mut entry) = current {
                    if open.len() == entry_depth + 1 && element_name(&e) == "link" {
                        entry.take_link_attribute(&e);
                    }
                }
            }
            Ok(Event::End(_)) => {
                let closed = open.pop().unwrap_or_default();
                if current.is_some() && open.len() == entry_depth {
                    if let Some(builder) = current.take() {
                        match builder.build() {
                            Ok(entry) => entries.push(entry),
                            Err(reason) => tracing::warn!("Skipping feed entry: {}", reason),
                        }
                    }
                } else if let Some(ref mut entry) = current {
                    if open.len() == entry_depth + 1 {
                        entry.close_child(&closed);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(ref mut entry) = current {
                    let text = e
                        .unescape()
                        .map_err(|e| FeedError::Parse(format!("XML parse error: {}", e)))?;
                    entry.push_text(&open[entry_depth + 1..], &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(ref mut entry) = current {
                    let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                    entry.push_text(&open[entry_depth + 1..], &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Parse(format!("XML parse error: {}", e)).into()),
            _ => {}
        }
        buf.clear();
    }

    if !saw_feed {
        return Err(FeedError::Parse("document is not an RSS or Atom feed".to_string()).into());
    }

    Ok(entries)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

/// Parse RFC 2822 (RSS) or RFC 3339 (Atom) timestamps into naive UTC
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.naive_utc())
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    content: String,
    author: String,
    /// Set once an author element with a value has closed
    author_done: bool,
    published: String,
    updated: String,
    link: String,
}

impl EntryBuilder {
    /// Append text found under `path`, the open elements below the entry
    fn push_text(&mut self, path: &[String], text: &str) {
        let Some(child) = path.first() else {
            return;
        };

        let field = match (child.as_str(), path.len()) {
            ("source", _) => return,
            // xhtml bodies nest markup; keep the text of every descendant
            ("description" | "summary", depth) => {
                Self::separate(&mut self.summary, depth);
                &mut self.summary
            }
            ("content" | "content:encoded", depth) => {
                Self::separate(&mut self.content, depth);
                &mut self.content
            }
            ("dc:creator" | "author", 1) if !self.author_done => &mut self.author,
            ("author", 2) if path[1] == "name" && !self.author_done => &mut self.author,
            (_, 1) => match child.as_str() {
                "guid" | "id" => &mut self.id,
                "title" => &mut self.title,
                "pubDate" | "published" | "dc:date" => &mut self.published,
                "updated" => &mut self.updated,
                "link" => &mut self.link,
                _ => return,
            },
            _ => return,
        };
        field.push_str(text);
    }

    fn separate(field: &mut String, depth: usize) {
        if depth > 1 && !field.is_empty() {
            field.push(' ');
        }
    }

    /// A direct child of the entry closed; the first non-empty author wins
    fn close_child(&mut self, name: &str) {
        if matches!(name, "author" | "dc:creator") && !self.author.trim().is_empty() {
            self.author_done = true;
        }
    }

    /// Atom links carry the URL in `href`; keep the first alternate one
    fn take_link_attribute(&mut self, e: &BytesStart<'_>) {
        if !self.link.is_empty() {
            return;
        }
        let rel = attribute(e, b"rel");
        if rel.as_deref().is_some_and(|rel| rel != "alternate") {
            return;
        }
        if let Some(href) = attribute(e, b"href") {
            self.link = href;
        }
    }

    fn build(self) -> std::result::Result<FeedEntry, String> {
        let id = if self.id.trim().is_empty() {
            self.link.trim().to_string()
        } else {
            self.id.trim().to_string()
        };
        if id.is_empty() {
            return Err(format!("entry '{}' has no identifier", self.title));
        }

        let stamp = if self.published.trim().is_empty() {
            &self.updated
        } else {
            &self.published
        };
        let published = parse_timestamp(stamp)
            .ok_or_else(|| format!("entry {} has an unparseable date '{}'", id, stamp))?;

        let summary = if self.summary.is_empty() {
            self.content
        } else {
            self.summary
        };

        Ok(FeedEntry {
            id,
            title: self.title,
            summary,
            author: self.author.trim().to_string(),
            published,
            link: self.link.trim().to_string(),
        })
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.to_string()))
}
