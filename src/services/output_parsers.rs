//! Parsers for resolver tool output
//!
//! Each `ParserKind` turns a candidate's stdout into one of three shapes:
//! a single playable URL, a list of media items, or a title.

use serde_json::Value;

use crate::errors::CandidateError;
use crate::models::{MediaListItem, MediaUrlFilter, ParserKind, ResolvedMedia};

fn parse_error(message: impl Into<String>) -> CandidateError {
    CandidateError::Parse {
        message: message.into(),
    }
}

/// Parse a single-media resolution
pub fn parse_media(
    kind: ParserKind,
    stdout: &str,
    filter: &MediaUrlFilter,
) -> Result<ResolvedMedia, CandidateError> {
    match kind {
        ParserKind::JsonMedia => parse_json_media(stdout, filter),
        ParserKind::PlainUrl => parse_plain_url(stdout, filter),
        other => Err(parse_error(format!("parser {other} does not produce a media URL"))),
    }
}

/// Parse a search or related list; zero items is a failure
pub fn parse_list(kind: ParserKind, stdout: &str) -> Result<Vec<MediaListItem>, CandidateError> {
    let items = match kind {
        ParserKind::JsonLines => parse_json_lines(stdout)?,
        ParserKind::TabSeparated => parse_tab_separated(stdout),
        other => return Err(parse_error(format!("parser {other} does not produce a list"))),
    };

    if items.is_empty() {
        return Err(CandidateError::NoResults);
    }
    Ok(items)
}

/// Parse a title for the related-list fallback query
pub fn parse_title(kind: ParserKind, stdout: &str) -> Result<String, CandidateError> {
    match kind {
        ParserKind::PlainTitle => stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or(CandidateError::EmptyOutput),
        ParserKind::JsonMedia => {
            let doc = first_json_document(stdout)?;
            doc.get("title")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| parse_error("no title field"))
        }
        other => Err(parse_error(format!("parser {other} does not produce a title"))),
    }
}

fn first_json_document(stdout: &str) -> Result<Value, CandidateError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| parse_error("no JSON document in output"))?;
    serde_json::from_str(line).map_err(|e| parse_error(format!("invalid JSON: {e}")))
}

fn parse_json_media(stdout: &str, filter: &MediaUrlFilter) -> Result<ResolvedMedia, CandidateError> {
    let doc = first_json_document(stdout)?;

    // A single selected format puts its URL at the top level
    if let Some(url) = doc.get("url").and_then(Value::as_str) {
        return ResolvedMedia::validated(url, mime_hint(&doc), filter);
    }

    let best = doc
        .get("formats")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|f| is_audio_only(f) && f.get("url").and_then(Value::as_str).is_some())
        .max_by(|a, b| audio_bitrate(a).total_cmp(&audio_bitrate(b)))
        .ok_or_else(|| parse_error("no url and no audio-only format"))?;

    let url = best.get("url").and_then(Value::as_str).unwrap_or_default();
    ResolvedMedia::validated(url, mime_hint(best), filter)
}

fn is_audio_only(format: &Value) -> bool {
    let codec = |key: &str| format.get(key).and_then(Value::as_str).unwrap_or("none");
    codec("acodec") != "none" && codec("vcodec") == "none"
}

fn audio_bitrate(format: &Value) -> f64 {
    format
        .get("abr")
        .or_else(|| format.get("tbr"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn mime_hint(format: &Value) -> Option<String> {
    let ext = format.get("audio_ext").and_then(Value::as_str).filter(|e| *e != "none");
    let ext = ext.or_else(|| format.get("ext").and_then(Value::as_str))?;
    let mime = match ext {
        "m4a" | "mp4" => "audio/mp4",
        "webm" | "weba" => "audio/webm",
        "opus" | "ogg" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "aac" => "audio/aac",
        _ => return None,
    };
    Some(mime.to_string())
}

fn parse_plain_url(stdout: &str, filter: &MediaUrlFilter) -> Result<ResolvedMedia, CandidateError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("http://") || line.starts_with("https://"))
        .ok_or_else(|| parse_error("no http(s) URL in output"))?;
    ResolvedMedia::validated(line, None, filter)
}

fn parse_json_lines(stdout: &str) -> Result<Vec<MediaListItem>, CandidateError> {
    let mut items = Vec::new();
    let mut invalid = 0usize;

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(entry) => items.extend(item_from_json(&entry)),
            Err(_) => invalid += 1,
        }
    }

    if items.is_empty() && invalid > 0 {
        return Err(parse_error(format!("{invalid} unparseable JSON lines")));
    }
    Ok(items)
}

fn item_from_json(entry: &Value) -> Option<MediaListItem> {
    let id = entry.get("id").and_then(Value::as_str)?;
    let title = entry
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown title");

    let duration_label = match entry.get("duration").and_then(Value::as_f64) {
        Some(seconds) => format_duration_label(seconds),
        None => entry
            .get("duration_string")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    };

    let item = MediaListItem::new(id, title, duration_label);
    let page_url = entry
        .get("webpage_url")
        .or_else(|| entry.get("url"))
        .and_then(Value::as_str)
        .filter(|u| u.starts_with("http"));

    Some(match page_url {
        Some(url) => item.with_canonical_url(url),
        None => item,
    })
}

fn parse_tab_separated(stdout: &str) -> Vec<MediaListItem> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let id = fields.next()?.trim();
            let title = fields.next()?.trim();
            if id.is_empty() || id == "NA" {
                return None;
            }
            let duration = fields.next().map(str::trim).unwrap_or_default();
            let duration = if duration == "NA" { "" } else { duration };
            Some(MediaListItem::new(id, title, duration))
        })
        .collect()
}

/// Render seconds as `m:ss`, or `h:mm:ss` from one hour up
pub fn format_duration_label(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::new();
    }
    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
