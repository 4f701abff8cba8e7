/// Configuration default values
///
/// Central place for every default used by the configuration layer.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

// Resolver defaults
pub const DEFAULT_RESOLVER_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_LOCAL_RESOLVER: &str = "./bin/yt-dlp";
pub const DEFAULT_RESOLVER_COMMAND: &str = "yt-dlp";
pub const DEFAULT_PYTHON_COMMAND: &str = "python3";
pub const DEFAULT_AUDIO_FORMAT: &str = "bestaudio/best";

// Search defaults
pub const DEFAULT_SEARCH_MAX_RESULTS: usize = 10;
pub const DEFAULT_RELATED_QUERY_WORDS: usize = 4;

// Transcoder defaults
pub const DEFAULT_TRANSCODER_COMMAND: &str = "ffmpeg";
pub const DEFAULT_CONTENT_TYPE: &str = "audio/aac";
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KiB

// Relay defaults
pub const DEFAULT_STARTUP_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_STALL_CHECK_INTERVAL_SECONDS: u64 = 10;
pub const DEFAULT_STALL_THRESHOLD_SECONDS: u64 = 30;
pub const DEFAULT_STALL_MIN_SESSION_AGE_SECONDS: u64 = 60;
pub const DEFAULT_MAX_CONCURRENT_STREAMS: usize = 32;
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 16;
pub const DEFAULT_STDERR_TAIL_LINES: usize = 20;

// Resolver output URLs matching any of these are not audio
pub const DEFAULT_NON_MEDIA_PATTERNS: &[&str] = &[
    r"(?i)^https?://([a-z0-9-]+\.)*ytimg\.com/",
    r"(?i)^https?://img\.youtube\.com/",
    r"(?i)\.(jpe?g|png|webp|gif)(\?|#|$)",
    r"(?i)storyboard",
];
