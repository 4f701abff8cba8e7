use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::models::{ParserKind, ResolveCandidate};
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Ordered resolver invocations used to turn a media identifier into a
/// direct playable URL. The first entry is the most preferred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Per-candidate timeout; each candidate gets its own budget
    #[serde(with = "duration_serde::duration", default = "default_resolver_timeout")]
    pub timeout: Duration,
    /// Regexes for resolver output that is not audio (thumbnails etc.)
    #[serde(default = "default_non_media_patterns")]
    pub non_media_patterns: Vec<String>,
    #[serde(default = "default_resolve_candidates")]
    pub candidates: Vec<ResolveCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(with = "duration_serde::duration", default = "default_resolver_timeout")]
    pub timeout: Duration,
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
    /// Number of title words used to build the degraded "related" query
    #[serde(default = "default_related_query_words")]
    pub related_query_words: usize,
    #[serde(default = "default_search_candidates")]
    pub candidates: Vec<ResolveCandidate>,
    #[serde(default = "default_related_candidates")]
    pub related_candidates: Vec<ResolveCandidate>,
    #[serde(default = "default_title_candidates")]
    pub title_candidates: Vec<ResolveCandidate>,
}

/// Transcoder invocation. `{input}` in the argument lists is replaced with
/// the resolved source URL; arguments are never passed through a shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    #[serde(default = "default_transcoder_command")]
    pub command: String,
    #[serde(default = "default_transcoder_args")]
    pub args: Vec<String>,
    #[serde(default = "default_radio_args")]
    pub radio_args: Vec<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Maximum size of a single write to the client
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Fail the session if no output arrives within this window
    #[serde(with = "duration_serde::duration", default = "default_startup_timeout")]
    pub startup_timeout: Duration,
    #[serde(with = "duration_serde::duration", default = "default_stall_check_interval")]
    pub stall_check_interval: Duration,
    /// Silence longer than this emits a stall warning
    #[serde(with = "duration_serde::duration", default = "default_stall_threshold")]
    pub stall_threshold: Duration,
    /// Sessions younger than this never emit stall warnings
    #[serde(with = "duration_serde::duration", default = "default_stall_min_session_age")]
    pub stall_min_session_age: Duration,
    #[serde(default = "default_max_concurrent_streams")]
    pub max_concurrent_streams: usize,
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,
    /// Number of stderr lines kept for error details
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Resolver defaults
fn default_resolver_timeout() -> Duration {
    Duration::from_secs(DEFAULT_RESOLVER_TIMEOUT_SECONDS)
}

fn yt_dlp_args(extra: &[&str]) -> Vec<String> {
    extra.iter().map(|s| s.to_string()).collect()
}

fn default_resolve_candidates() -> Vec<ResolveCandidate> {
    let json_args = yt_dlp_args(&[
        "-f",
        DEFAULT_AUDIO_FORMAT,
        "-j",
        "--no-playlist",
        "--no-warnings",
        "{input}",
    ]);
    let plain_args = yt_dlp_args(&[
        "-f",
        DEFAULT_AUDIO_FORMAT,
        "-g",
        "--no-playlist",
        "--no-warnings",
        "{input}",
    ]);

    vec![
        ResolveCandidate::new("local-yt-dlp-json", DEFAULT_LOCAL_RESOLVER, json_args.clone(), ParserKind::JsonMedia),
        ResolveCandidate::new("yt-dlp-json", DEFAULT_RESOLVER_COMMAND, json_args, ParserKind::JsonMedia),
        ResolveCandidate::new("yt-dlp-url", DEFAULT_RESOLVER_COMMAND, plain_args.clone(), ParserKind::PlainUrl),
        ResolveCandidate::new(
            "python-yt-dlp-url",
            DEFAULT_PYTHON_COMMAND,
            [yt_dlp_args(&["-m", "yt_dlp"]), plain_args].concat(),
            ParserKind::PlainUrl,
        ),
    ]
}

fn default_non_media_patterns() -> Vec<String> {
    DEFAULT_NON_MEDIA_PATTERNS.iter().map(|s| s.to_string()).collect()
}

// Search defaults
fn default_search_max_results() -> usize {
    DEFAULT_SEARCH_MAX_RESULTS
}

fn default_related_query_words() -> usize {
    DEFAULT_RELATED_QUERY_WORDS
}

fn default_search_candidates() -> Vec<ResolveCandidate> {
    let json_args = yt_dlp_args(&["ytsearch{limit}:{input}", "--flat-playlist", "-j", "--no-warnings"]);
    let print_args = yt_dlp_args(&[
        "ytsearch{limit}:{input}",
        "--flat-playlist",
        "--print",
        "%(id)s\t%(title)s\t%(duration_string)s",
        "--no-warnings",
    ]);

    vec![
        ResolveCandidate::new("yt-dlp-search-json", DEFAULT_RESOLVER_COMMAND, json_args.clone(), ParserKind::JsonLines),
        ResolveCandidate::new("yt-dlp-search-print", DEFAULT_RESOLVER_COMMAND, print_args, ParserKind::TabSeparated),
        ResolveCandidate::new(
            "python-yt-dlp-search-json",
            DEFAULT_PYTHON_COMMAND,
            [yt_dlp_args(&["-m", "yt_dlp"]), json_args].concat(),
            ParserKind::JsonLines,
        ),
    ]
}

fn default_related_candidates() -> Vec<ResolveCandidate> {
    let args = yt_dlp_args(&[
        "{input}",
        "--flat-playlist",
        "-j",
        "--playlist-end",
        "{limit}",
        "--no-warnings",
    ]);

    vec![ResolveCandidate::new(
        "yt-dlp-mix-playlist",
        DEFAULT_RESOLVER_COMMAND,
        args,
        ParserKind::JsonLines,
    )]
}

fn default_title_candidates() -> Vec<ResolveCandidate> {
    let args = yt_dlp_args(&["--get-title", "--no-playlist", "--no-warnings", "{input}"]);

    vec![
        ResolveCandidate::new("yt-dlp-title", DEFAULT_RESOLVER_COMMAND, args.clone(), ParserKind::PlainTitle),
        ResolveCandidate::new(
            "python-yt-dlp-title",
            DEFAULT_PYTHON_COMMAND,
            [yt_dlp_args(&["-m", "yt_dlp"]), args].concat(),
            ParserKind::PlainTitle,
        ),
    ]
}

// Transcoder defaults
fn default_transcoder_command() -> String {
    DEFAULT_TRANSCODER_COMMAND.to_string()
}

fn default_transcoder_args() -> Vec<String> {
    yt_dlp_args(&[
        "-hide_banner",
        "-reconnect",
        "1",
        "-reconnect_streamed",
        "1",
        "-reconnect_delay_max",
        "5",
        "-i",
        "{input}",
        "-vn",
        "-c:a",
        "aac",
        "-b:a",
        "128k",
        "-ac",
        "2",
        "-ar",
        "44100",
        "-f",
        "adts",
        "pipe:1",
    ])
}

fn default_radio_args() -> Vec<String> {
    yt_dlp_args(&[
        "-hide_banner",
        "-reconnect",
        "1",
        "-reconnect_streamed",
        "1",
        "-reconnect_on_network_error",
        "1",
        "-reconnect_delay_max",
        "10",
        "-user_agent",
        "Mozilla/5.0 (compatible; audio-relay)",
        "-i",
        "{input}",
        "-vn",
        "-c:a",
        "aac",
        "-b:a",
        "128k",
        "-ac",
        "2",
        "-ar",
        "44100",
        "-f",
        "adts",
        "pipe:1",
    ])
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

// Relay defaults
fn default_startup_timeout() -> Duration {
    Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECONDS)
}

fn default_stall_check_interval() -> Duration {
    Duration::from_secs(DEFAULT_STALL_CHECK_INTERVAL_SECONDS)
}

fn default_stall_threshold() -> Duration {
    Duration::from_secs(DEFAULT_STALL_THRESHOLD_SECONDS)
}

fn default_stall_min_session_age() -> Duration {
    Duration::from_secs(DEFAULT_STALL_MIN_SESSION_AGE_SECONDS)
}

fn default_max_concurrent_streams() -> usize {
    DEFAULT_MAX_CONCURRENT_STREAMS
}

fn default_max_concurrent_lookups() -> usize {
    DEFAULT_MAX_CONCURRENT_LOOKUPS
}

fn default_stderr_tail_lines() -> usize {
    DEFAULT_STDERR_TAIL_LINES
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: default_resolver_timeout(),
            non_media_patterns: default_non_media_patterns(),
            candidates: default_resolve_candidates(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout: default_resolver_timeout(),
            max_results: default_search_max_results(),
            related_query_words: default_related_query_words(),
            candidates: default_search_candidates(),
            related_candidates: default_related_candidates(),
            title_candidates: default_title_candidates(),
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            command: default_transcoder_command(),
            args: default_transcoder_args(),
            radio_args: default_radio_args(),
            content_type: default_content_type(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            startup_timeout: default_startup_timeout(),
            stall_check_interval: default_stall_check_interval(),
            stall_threshold: default_stall_threshold(),
            stall_min_session_age: default_stall_min_session_age(),
            max_concurrent_streams: default_max_concurrent_streams(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            stderr_tail_lines: default_stderr_tail_lines(),
        }
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let config: Self = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.resolver.candidates.is_empty() {
            anyhow::bail!("resolver.candidates must contain at least one candidate");
        }
        if self.search.candidates.is_empty() {
            anyhow::bail!("search.candidates must contain at least one candidate");
        }
        let groups: [(&str, &[ResolveCandidate], &[ParserKind]); 4] = [
            (
                "resolver.candidates",
                &self.resolver.candidates,
                &[ParserKind::JsonMedia, ParserKind::PlainUrl],
            ),
            (
                "search.candidates",
                &self.search.candidates,
                &[ParserKind::JsonLines, ParserKind::TabSeparated],
            ),
            (
                "search.related_candidates",
                &self.search.related_candidates,
                &[ParserKind::JsonLines, ParserKind::TabSeparated],
            ),
            (
                "search.title_candidates",
                &self.search.title_candidates,
                &[ParserKind::PlainTitle, ParserKind::JsonMedia],
            ),
        ];
        for (group, candidates, allowed) in groups {
            if let Some(c) = candidates.iter().find(|c| !allowed.contains(&c.parser)) {
                anyhow::bail!("{group}: candidate '{}' uses unsupported parser {}", c.name, c.parser);
            }
        }
        if let Err(e) = regex::RegexSet::new(&self.resolver.non_media_patterns) {
            anyhow::bail!("resolver.non_media_patterns is invalid: {e}");
        }
        if self.transcoder.chunk_size == 0 {
            anyhow::bail!("transcoder.chunk_size must be greater than zero");
        }
        for (name, args) in [
            ("transcoder.args", &self.transcoder.args),
            ("transcoder.radio_args", &self.transcoder.radio_args),
        ] {
            if !args.iter().any(|arg| arg.contains("{input}")) {
                anyhow::bail!("{name} must reference the {{input}} placeholder");
            }
        }
        if self.relay.max_concurrent_streams == 0 || self.relay.max_concurrent_lookups == 0 {
            anyhow::bail!("relay concurrency limits must be greater than zero");
        }
        for (name, value) in [
            ("resolver.timeout", self.resolver.timeout),
            ("search.timeout", self.search.timeout),
            ("relay.startup_timeout", self.relay.startup_timeout),
            ("relay.stall_check_interval", self.relay.stall_check_interval),
            ("relay.stall_threshold", self.relay.stall_threshold),
        ] {
            if value.is_zero() {
                anyhow::bail!("{name} must be greater than zero");
            }
        }
        Ok(())
    }
}
