//! Media resolution results and identifier handling

use regex::RegexSet;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{CandidateError, ResolveError};

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";
const VIDEO_ID_LEN: usize = 11;

/// A direct, playable media URL produced by a resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    pub url: String,
    /// Container or codec hint reported by the resolver, if any
    pub mime_hint: Option<String>,
}

impl ResolvedMedia {
    /// Build a resolution, enforcing the scheme and non-media checks
    pub fn validated(
        url: &str,
        mime_hint: Option<String>,
        filter: &MediaUrlFilter,
    ) -> Result<Self, CandidateError> {
        let url = filter.check(url)?;
        Ok(Self {
            url: url.to_string(),
            mime_hint,
        })
    }
}

/// Rejects URLs that are not audio: thumbnails, storyboards, images
#[derive(Debug, Clone)]
pub struct MediaUrlFilter {
    patterns: RegexSet,
}

impl MediaUrlFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    /// Parse and check a resolver-produced URL
    pub fn check(&self, raw: &str) -> Result<Url, CandidateError> {
        let raw = raw.trim();
        let invalid = |reason: &str| CandidateError::InvalidResolution {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&format!("not an absolute URL ({e})")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if self.patterns.is_match(raw) {
            return Err(invalid("matches a non-media pattern"));
        }
        Ok(url)
    }
}

/// One entry of a search or related list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaListItem {
    pub id: String,
    pub title: String,
    pub duration_label: String,
    pub canonical_url: String,
}

impl MediaListItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration_label: impl Into<String>) -> Self {
        let id = id.into();
        let canonical_url = watch_url(&id);
        Self {
            id,
            title: title.into(),
            duration_label: duration_label.into(),
            canonical_url,
        }
    }

    pub fn with_canonical_url(mut self, canonical_url: impl Into<String>) -> Self {
        self.canonical_url = canonical_url.into();
        self
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL_PREFIX}{video_id}")
}

/// True for an 11-character platform video id
pub fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the video id from a watch, short, shorts or embed URL
pub fn video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Some(input.to_string());
    }

    let url = Url::parse(input).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" => {
            let from_query = url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned());
            from_query.or_else(|| {
                let mut segments = url.path_segments()?;
                match segments.next()? {
                    "shorts" | "embed" | "live" => segments.next().map(str::to_string),
                    _ => None,
                }
            })
        }
        _ => None,
    }?;

    is_video_id(&id).then_some(id)
}

/// Normalise a client-supplied media identifier before it reaches a resolver.
///
/// Bare ids and recognised platform URLs become canonical watch URLs. Other
/// http(s) URLs and `ytsearch` queries pass through unchanged.
pub fn normalize_identifier(input: &str) -> Result<String, ResolveError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ResolveError::InvalidInput("identifier is empty".to_string()));
    }
    if let Some(id) = video_id(input) {
        return Ok(watch_url(&id));
    }

    // Resolvers would read a leading dash as an option
    if input.starts_with('-') {
        return Err(ResolveError::InvalidInput(format!(
            "identifier must not start with '-': {input}"
        )));
    }

    if input.starts_with("ytsearch") {
        return Ok(input.to_string());
    }

    match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(input.to_string()),
        Ok(url) => Err(ResolveError::InvalidInput(format!(
            "unsupported URL scheme '{}'",
            url.scheme()
        ))),
        Err(_) => Err(ResolveError::InvalidInput(format!(
            "not a URL or video id: {input}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::DEFAULT_NON_MEDIA_PATTERNS;

    fn filter() -> MediaUrlFilter {
        MediaUrlFilter::new(DEFAULT_NON_MEDIA_PATTERNS).unwrap()
    }

    #[test]
    fn test_accepts_audio_url() {
        let media = ResolvedMedia::validated(
            "https://rr3---sn-abc.googlevideo.com/videoplayback?mime=audio%2Fwebm&itag=251",
            Some("audio/webm".to_string()),
            &filter(),
        )
        .unwrap();
        assert!(media.url.starts_with("https://rr3---sn-abc.googlevideo.com/"));
    }

    #[test]
    fn test_rejects_thumbnail_urls() {
        let f = filter();
        for url in [
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg",
            "https://img.youtube.com/vi/dQw4w9WgXcQ/0.jpg",
            "https://example.com/cover.webp?size=large",
            "https://i.ytimg.com/sb/dQw4w9WgXcQ/storyboard3_L1/M0.jpg",
        ] {
            let err = f.check(url).unwrap_err();
            assert!(
                matches!(err, CandidateError::InvalidResolution { .. }),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(filter().check("file:///etc/passwd").is_err());
        assert!(filter().check("not a url").is_err());
    }

    #[test]
    fn test_video_id_extraction() {
        assert_eq!(video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(video_id("https://youtu.be/dQw4w9WgXcQ?si=x").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(
            video_id("https://youtube.com/shorts/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(
            normalize_identifier(" dQw4w9WgXcQ ").unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            normalize_identifier("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            normalize_identifier("https://soundcloud.com/artist/track").unwrap(),
            "https://soundcloud.com/artist/track"
        );
        assert!(normalize_identifier("   ").is_err());
        assert!(normalize_identifier("--exec=id").is_err());
        assert!(normalize_identifier("ftp://example.com/a.mp3").is_err());
    }

    #[test]
    fn test_list_item_serializes_camel_case() {
        let item = MediaListItem::new("dQw4w9WgXcQ", "Song", "3:32");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["durationLabel"], "3:32");
        assert_eq!(json["canonicalUrl"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
