// src/ingest/parser.rs
//! Best-effort RSS 2.0 / Atom parsing. Never fails: broken XML yields whatever
//! items were complete before the error.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::ingest::clean_text;
use crate::ingest::types::NewsItem;

/// `toLocaleString('it-IT')` shape, e.g. `17/10/2026, 14:05:00`.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Date,
    Updated,
    Description,
    Content,
}

#[derive(Default)]
struct RawEntry {
    title: String,
    link: String,
    date: String,
    updated: String,
    description: String,
    content: String,
    // Atom: href of the preferred <link>, and of the first one seen
    alt_href: Option<String>,
    any_href: Option<String>,
}

impl RawEntry {
    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Date => &mut self.date,
            Field::Updated => &mut self.updated,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
        }
    }

    fn push(&mut self, field: Field, text: &str) {
        self.slot(field).push_str(text);
    }

    // First occurrence wins; a repeated child element is ignored.
    fn open(&mut self, field: Option<Field>) -> Option<(Field, usize)> {
        let f = field?;
        self.slot(f).trim().is_empty().then_some((f, 0))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Container {
    RssItem,
    AtomEntry,
}

fn rss_field(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"pubDate" => Some(Field::Date),
        b"description" => Some(Field::Description),
        _ => None,
    }
}

fn atom_field(local: &[u8]) -> Option<Field> {
    match local {
        b"title" => Some(Field::Title),
        b"published" => Some(Field::Date),
        b"updated" => Some(Field::Updated),
        b"summary" => Some(Field::Description),
        b"content" => Some(Field::Content),
        _ => None,
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}

fn atom_link(entry: &mut RawEntry, e: &BytesStart<'_>) {
    let Some(href) = attr(e, b"href").filter(|h| !h.trim().is_empty()) else {
        return;
    };
    let rel = attr(e, b"rel");
    if entry.alt_href.is_none() && matches!(rel.as_deref(), None | Some("alternate")) {
        entry.alt_href = Some(href.clone());
    }
    if entry.any_href.is_none() {
        entry.any_href = Some(href);
    }
}

/// Parse feed text into news items tagged with `source_name`.
/// `now_millis` is the ingestion time used when an item carries no usable date.
pub fn parse_feed(raw: &str, source_name: &str, now_millis: i64) -> Vec<NewsItem> {
    let t0 = std::time::Instant::now();

    let mut reader = Reader::from_str(raw);
    let mut rss_items = Vec::new();
    let mut atom_items = Vec::new();

    let mut container: Option<Container> = None;
    let mut entry = RawEntry::default();
    // Active field plus how many nested elements we are inside of it.
    let mut field: Option<(Field, usize)> = None;
    // Open non-field elements below the container (e.g. <source>, <media:group>).
    // Fields are only read from direct children.
    let mut nested = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if let Some((_, depth)) = field.as_mut() {
                    *depth += 1;
                    continue;
                }
                let qname = e.name();
                let local = e.local_name();
                match container {
                    None if qname.as_ref() == b"item" => {
                        container = Some(Container::RssItem);
                        entry = RawEntry::default();
                        nested = 0;
                    }
                    None if local.as_ref() == b"entry" => {
                        container = Some(Container::AtomEntry);
                        entry = RawEntry::default();
                        nested = 0;
                    }
                    Some(_) if nested > 0 => nested += 1,
                    Some(Container::RssItem) => {
                        field = entry.open(rss_field(qname.as_ref()));
                        if field.is_none() {
                            nested += 1;
                        }
                    }
                    Some(Container::AtomEntry) => {
                        if local.as_ref() == b"link" {
                            atom_link(&mut entry, &e);
                        }
                        field = entry.open(atom_field(local.as_ref()));
                        if field.is_none() {
                            nested += 1;
                        }
                    }
                    None => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if field.is_none()
                    && nested == 0
                    && container == Some(Container::AtomEntry)
                    && e.local_name().as_ref() == b"link"
                {
                    atom_link(&mut entry, &e);
                }
            }
            Ok(Event::End(e)) => {
                if let Some((f, depth)) = field {
                    field = if depth == 0 { None } else { Some((f, depth - 1)) };
                    continue;
                }
                if container.is_some() && nested > 0 {
                    nested -= 1;
                    continue;
                }
                match container {
                    Some(Container::RssItem) if e.name().as_ref() == b"item" => {
                        container = None;
                        if let Some(item) =
                            finish_rss(std::mem::take(&mut entry), source_name, now_millis)
                        {
                            rss_items.push(item);
                        }
                    }
                    Some(Container::AtomEntry) if e.local_name().as_ref() == b"entry" => {
                        container = None;
                        if let Some(item) =
                            finish_atom(std::mem::take(&mut entry), source_name, now_millis)
                        {
                            atom_items.push(item);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((f, _)) = field {
                    // Unescaped exactly once. HTML-only entities (`&nbsp;`) are not
                    // XML and make `unescape` fail, so those go through html-escape.
                    match t.unescape() {
                        Ok(text) => entry.push(f, &text),
                        Err(_) => {
                            let raw = String::from_utf8_lossy(&t);
                            entry.push(f, &html_escape::decode_html_entities(&raw));
                        }
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((f, _)) = field {
                    entry.push(f, &String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(
                    target: "ingest",
                    source = source_name,
                    error = %e,
                    pos = reader.buffer_position(),
                    "feed xml error; keeping items parsed so far"
                );
                break;
            }
            _ => {}
        }
    }

    let out = if rss_items.is_empty() { atom_items } else { rss_items };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_events_total").increment(out.len() as u64);
    out
}

fn finish_rss(raw: RawEntry, source: &str, now_millis: i64) -> Option<NewsItem> {
    build_item(
        &raw.title,
        &raw.link,
        &raw.date,
        &raw.description,
        source,
        now_millis,
    )
}

fn finish_atom(raw: RawEntry, source: &str, now_millis: i64) -> Option<NewsItem> {
    let link = raw.alt_href.or(raw.any_href).unwrap_or_default();
    let date = if raw.date.trim().is_empty() {
        &raw.updated
    } else {
        &raw.date
    };
    let summary = if raw.description.trim().is_empty() {
        &raw.content
    } else {
        &raw.description
    };
    build_item(&raw.title, &link, date, summary, source, now_millis)
}

fn build_item(
    title: &str,
    link: &str,
    date: &str,
    description: &str,
    source: &str,
    now_millis: i64,
) -> Option<NewsItem> {
    let title = clean_text(title);
    let link = clean_text(link);
    if title.is_empty() || link.is_empty() {
        return None;
    }
    let (published_display, timestamp_millis) = match parse_feed_date(date) {
        Some(ms) => (format_display(ms), ms),
        None => (String::new(), now_millis),
    };
    Some(NewsItem {
        title,
        link,
        published_display,
        description: clean_text(description),
        source: source.to_string(),
        timestamp_millis,
    })
}

/// Parse RSS/Atom date strings to unix millis.
pub fn parse_feed_date(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    None
}

/// Local-time display string; empty if the instant is out of range.
pub fn format_display(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}
