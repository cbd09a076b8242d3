// src/report.rs
//! Plain-text presentation of an aggregation run (console and `/news/text`).

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::AggregateReport;

const MONTHS_IT: [&str; 12] = [
    "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto",
    "settembre", "ottobre", "novembre", "dicembre",
];

pub const LINK_WIDTH: usize = 60;

/// Italian relative time for a `dd/mm/yyyy, HH:MM:SS` display string.
/// Unparsable input, or a date in the future, is returned unchanged.
pub fn time_ago(display: &str, now: DateTime<Local>) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(\d{2})/(\d{2})/(\d{4}),?\s*(\d{2}):(\d{2}):(\d{2})").unwrap()
    });
    let Some(c) = re.captures(display) else {
        return display.to_string();
    };
    let num = |i: usize| c[i].parse::<u32>().unwrap_or(0);
    let date = NaiveDate::from_ymd_opt(num(3) as i32, num(2), num(1))
        .and_then(|d| d.and_hms_opt(num(4), num(5), num(6)))
        .and_then(|n| Local.from_local_datetime(&n).earliest());
    let Some(date) = date else {
        return display.to_string();
    };

    let diff_ms = (now - date).num_milliseconds();
    if diff_ms < 0 {
        return display.to_string();
    }

    let minutes = diff_ms / 1000 / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        return "Poco fa".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} min fa");
    }
    if hours < 24 {
        return format!("{hours} {} fa", if hours > 1 { "ore" } else { "ora" });
    }
    if days < 7 {
        return format!("{days} giorn{} fa", if days > 1 { "i" } else { "o" });
    }
    let weeks = days / 7;
    if weeks < 4 {
        return format!("{weeks} settiman{} fa", if weeks > 1 { "e" } else { "a" });
    }
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_IT[date.month0() as usize],
        date.year()
    )
}

pub fn truncate_url(url: &str, max_len: usize) -> String {
    if url.chars().count() <= max_len {
        return url.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = url.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub fn render_text(report: &AggregateReport, now: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.status_message());

    if report.all_news.is_empty() {
        let _ = writeln!(out, "\nNo news found");
        return out;
    }

    for group in &report.groups.groups {
        let _ = writeln!(out, "\n== {} ({})", group.name, group.items.len());
        for it in &group.items {
            let _ = writeln!(out, "- {}", it.title);
            let _ = writeln!(out, "  {}", truncate_url(&it.link, LINK_WIDTH));
            if it.published_display.is_empty() {
                let _ = writeln!(out, "  [{}]", it.source);
            } else {
                let _ = writeln!(out, "  [{}] {}", it.source, time_ago(&it.published_display, now));
            }
        }
    }
    out
}
