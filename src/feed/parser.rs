use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link};
use feed_rs::parser;

/// Feed-level metadata. Each field is present only when the document
/// supplies it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedMetadata {
    pub title: Option<String>,
    pub link: Option<String>,
    pub icon: Option<String>,
}

/// One entry as found in the document, before any defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub guid: String,
    pub link: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    /// Published time, else updated time, from the parsed date representation
    pub published: Option<DateTime<Utc>>,
}

/// A parsed feed document: metadata plus entries in document order.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub metadata: FeedMetadata,
    pub entries: Vec<ParsedEntry>,
}

/// Parse RSS, Atom or JSON Feed bytes.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let metadata = FeedMetadata {
        title: feed.title.map(|t| t.content).filter(|t| !t.is_empty()),
        link: select_link(&feed.links),
        icon: feed
            .icon
            .or(feed.logo)
            .map(|image| image.uri)
            .filter(|uri| !uri.is_empty()),
    };

    let entries = feed.entries.into_iter().map(parse_entry).collect();

    Ok(ParsedFeed { metadata, entries })
}

fn parse_entry(entry: Entry) -> ParsedEntry {
    let link = select_link(&entry.links);
    let published = entry.published.or(entry.updated);
    let content = select_content(&entry);
    let author = entry
        .authors
        .into_iter()
        .map(|person| person.name)
        .find(|name| !name.trim().is_empty());

    ParsedEntry {
        guid: entry.id.trim().to_string(),
        link,
        title: entry.title.map(|t| t.content),
        author,
        content,
        published,
    }
}

/// The first link with no `rel` or `rel="alternate"`, else the first link.
fn select_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
        .filter(|href| !href.is_empty())
}

fn is_html(essence: &str) -> bool {
    matches!(essence, "text/html" | "application/xhtml+xml")
}

/// Candidates are the content body then the summary. The first HTML
/// candidate wins; with no HTML candidate the content body wins.
fn select_content(entry: &Entry) -> Option<String> {
    let body = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_ref().map(|b| (c.content_type.essence().to_string(), b)));
    let summary = entry
        .summary
        .as_ref()
        .map(|s| (s.content_type.essence().to_string(), &s.content));

    let candidates = [body, summary];
    candidates
        .iter()
        .flatten()
        .find(|(mime, _)| is_html(mime.as_str()))
        .or_else(|| candidates.iter().flatten().next())
        .map(|(_, text)| text.to_string())
}
