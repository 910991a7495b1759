// Path: crates/connectors/src/extract.rs

//! Deterministic text extraction and date parsing.
//!
//! Extraction is a pure function of the fetched bytes: tag stripping,
//! entity decoding, and whitespace shaping never consult anything outside
//! the input, so the same bytes always yield the same text, chunks, and
//! hashes.

use chrono::{NaiveDate, TimeZone, Utc};
use scopegate_types::document::{Document, DocumentId, SourceKind, Tier};
use scopegate_types::error::ConnectorError;

/// Extracts plain text from a fetched body. HTML bodies lose their markup
/// (script and style subtrees are dropped wholly); other bodies pass
/// through with normalized line endings.
pub fn body_to_text(body: &str) -> String {
    let looks_like_html = body.contains("<html") || body.contains("<HTML") || body.contains("<div");
    let text = if looks_like_html {
        strip_html(body)
    } else {
        body.to_string()
    };
    normalize_lines(&text)
}

fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;
    let mut skip_depth = 0usize;

    while let Some(open) = rest.find('<') {
        let (before, after_open) = rest.split_at(open);
        if skip_depth == 0 {
            out.push_str(before);
        }
        let Some(close) = after_open.find('>') else {
            break;
        };
        let tag_body = after_open.get(1..close).unwrap_or_default();
        let tag_name: String = tag_body
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match tag_name.as_str() {
            "script" | "style" => {
                if tag_body.starts_with('/') {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if !tag_body.ends_with('/') {
                    skip_depth += 1;
                }
            }
            // Block-level boundaries become line breaks so paragraph
            // structure survives for the chunker.
            "p" | "div" | "br" | "li" | "tr" | "h1" | "h2" | "h3" | "h4" | "table" => {
                if skip_depth == 0 {
                    out.push('\n');
                }
            }
            _ => {}
        }
        rest = after_open.get(close + 1..).unwrap_or_default();
    }
    if skip_depth == 0 {
        out.push_str(rest);
    }
    decode_entities(&out)
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Collapses runs of blank lines to one and trims trailing spaces, keeping
/// paragraph breaks for the chunker.
fn normalize_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.replace("\r\n", "\n").lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            blank_run += 1;
            if blank_run == 1 {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(trimmed);
            out.push('\n');
        }
    }
    out.trim_matches('\n').to_string()
}

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Finds the first date written as `Month day, year` at or after `from` in
/// lowercased `text`. Returns the date and the offset just past it.
fn parse_written_date(text: &str, from: usize) -> Option<(NaiveDate, usize)> {
    let hay = text.get(from..)?;
    let mut best: Option<(usize, NaiveDate, usize)> = None;
    for (name, month) in MONTHS {
        let mut search = 0usize;
        while let Some(pos) = hay.get(search..).and_then(|s| s.find(name)) {
            let at = search + pos;
            let after = hay.get(at + name.len()..).unwrap_or_default();
            if let Some((date, used)) = parse_day_year(after, *month) {
                let end = at + name.len() + used;
                if best.map(|(b, _, _)| at < b).unwrap_or(true) {
                    best = Some((at, date, end));
                }
                break;
            }
            search = at + name.len();
        }
    }
    best.map(|(_, date, end)| (date, from + end))
}

/// Parses ` 12, 2025`-shaped tails after a month name.
fn parse_day_year(after: &str, month: u32) -> Option<(NaiveDate, usize)> {
    let mut consumed = 0usize;
    let bytes: Vec<char> = after.chars().collect();
    let mut i = 0usize;
    while bytes.get(i).is_some_and(|c| *c == ' ') {
        i += 1;
    }
    let day_start = i;
    while bytes.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    let day: u32 = bytes
        .get(day_start..i)?
        .iter()
        .collect::<String>()
        .parse()
        .ok()?;
    while bytes.get(i).is_some_and(|c| *c == ',' || *c == ' ') {
        i += 1;
    }
    let year_start = i;
    while bytes.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    let year: i32 = bytes
        .get(year_start..i)?
        .iter()
        .collect::<String>()
        .parse()
        .ok()?;
    if !(1990..=2100).contains(&year) {
        return None;
    }
    consumed += i;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, consumed))
}

/// Derives the effective-start date from the document's own language: the
/// first written date following an occurrence of the word `effective`.
pub fn effective_date(text: &str) -> Option<NaiveDate> {
    let lower = text.to_lowercase();
    let mut search = 0usize;
    while let Some(pos) = lower.get(search..).and_then(|s| s.find("effective")) {
        let at = search + pos;
        // Look within a short window after the keyword.
        let window_end = (at + 120).min(lower.len());
        if let Some((date, _)) = lower
            .get(at..window_end)
            .and_then(|w| parse_written_date(w, 0))
        {
            return Some(date);
        }
        search = at + "effective".len();
    }
    None
}

/// The first written date anywhere in the text; used as the published
/// timestamp when the source offers nothing better.
pub fn first_written_date(text: &str) -> Option<NaiveDate> {
    parse_written_date(&text.to_lowercase(), 0).map(|(d, _)| d)
}

/// Assembles a `Document` from fetched bytes.
///
/// `sha256_raw` is computed here, over the exact bytes fetched, and never
/// again. When `require_effective` is set (Federal Register notices state
/// their effective dates) a missing date is an error; otherwise the
/// publication date stands in, with a warning.
pub fn build_document(
    source_kind: SourceKind,
    tier: Tier,
    canonical_ref: String,
    url: String,
    raw: Vec<u8>,
    require_effective: bool,
) -> Result<Document, ConnectorError> {
    let text = body_to_text(&String::from_utf8_lossy(&raw));
    if text.trim().is_empty() {
        return Err(ConnectorError::Extraction(format!(
            "{}: extracted text is empty",
            canonical_ref
        )));
    }

    let published_date = first_written_date(&text);
    let effective_start = match effective_date(&text) {
        Some(date) => date,
        None if require_effective => return Err(ConnectorError::EffectiveDateNotFound),
        None => {
            let fallback = published_date.unwrap_or_else(|| Utc::now().date_naive());
            tracing::warn!(
                canonical_ref = %canonical_ref,
                fallback = %fallback,
                "no effective-date language found; using publication date"
            );
            fallback
        }
    };
    let published_at = published_date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_else(Utc::now);

    let sha256_raw = Document::hash_raw(&raw);
    Ok(Document {
        id: DocumentId::from_sha256(&sha256_raw),
        source_kind,
        tier,
        canonical_ref,
        url,
        published_at,
        effective_start,
        sha256_raw,
        raw,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_is_deterministic() {
        let html = "<html><body><div>GUIDANCE: Section 232 Copper.</div>\
                    <script>var x = 1;</script><p>Effective August 1, 2025, \
                    imports of copper derivative products under subheading \
                    8544.42.9090 are subject to duty.</p></body></html>";
        let a = body_to_text(html);
        let b = body_to_text(html);
        assert_eq!(a, b);
        assert!(a.contains("GUIDANCE: Section 232 Copper."));
        assert!(a.contains("8544.42.9090"));
        assert!(!a.contains("var x"));
        assert!(!a.contains('<'));
    }

    #[test]
    fn effective_date_follows_the_keyword() {
        let text = "Published July 15, 2025. Effective August 1, 2025, the \
                    additional duties apply.";
        assert_eq!(
            effective_date(text),
            Some(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())
        );
        assert_eq!(
            first_written_date(text),
            Some(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap())
        );
    }

    #[test]
    fn effective_without_a_date_is_none() {
        assert_eq!(effective_date("effective immediately upon publication"), None);
        assert_eq!(effective_date("no keyword here"), None);
    }

    #[test]
    fn invalid_calendar_dates_are_rejected() {
        assert_eq!(effective_date("effective February 30, 2025"), None);
        assert_eq!(effective_date("effective March 12, 1802"), None);
    }

    #[test]
    fn entities_decode_and_blank_lines_collapse() {
        let html = "<div>Steel &amp; Aluminum</div>\n\n\n\n<div>Proclamation&nbsp;10896</div>";
        let text = body_to_text(html);
        assert!(text.contains("Steel & Aluminum"));
        assert!(text.contains("Proclamation 10896"));
        assert!(!text.contains("\n\n\n"));
    }
}
