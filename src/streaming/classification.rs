/*!
 * Transcoder Diagnostic Classification
 * ====================================
 *
 * Purpose:
 *   Map one line of transcoder stderr to a `LineClass`:
 *
 * ```text
 *     - Fatal(kind)    the input could not be read; the session must end
 *     - Informational  stream/codec metadata, progress, reconnect notices
 *     - Ignored        everything else
 * ```
 *
 * Strategy:
 *   1. Informational markers are checked first, so progress lines such as
 *      `size= 404kB time=...` and reconnect notices never count as fatal.
 *   2. Fatal markers match whole tokens (`404`, `403`, `forbidden`, `error`)
 *      or the phrase `connection refused`. Token matching keeps hex
 *      addresses like `[http @ 0x55d4043a]` from looking like status codes.
 *
 * This module is pure; it never touches a process.
 */

use std::fmt;

/// Why the transcoder could not read its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalKind {
    /// Source answered 404; the URL has likely expired or moved
    NotFound,
    /// Source answered 403 / forbidden
    Forbidden,
    /// Source host refused the connection
    ConnectionRefused,
    /// Any other line carrying an error marker
    Other,
}

impl FatalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatalKind::NotFound => "not_found",
            FatalKind::Forbidden => "forbidden",
            FatalKind::ConnectionRefused => "connection_refused",
            FatalKind::Other => "error",
        }
    }
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Fatal(FatalKind),
    Informational,
    Ignored,
}

const INFORMATIONAL_PREFIXES: &[&str] = &[
    "input #",
    "output #",
    "stream #",
    "stream mapping",
    "duration:",
    "metadata:",
    "press [q]",
    "size=",
];

const INFORMATIONAL_MARKERS: &[&str] = &[
    "will reconnect",
    "bitrate=",
    "time=",
    "encoder",
    "audio:",
    "opening '",
];

/// Classify a single stderr line
pub fn classify(line: &str) -> LineClass {
    let lower = line.trim().to_lowercase();
    if lower.is_empty() {
        return LineClass::Ignored;
    }

    if is_informational(line, &lower) {
        return LineClass::Informational;
    }

    match fatal_kind(&lower) {
        Some(kind) => LineClass::Fatal(kind),
        None => LineClass::Ignored,
    }
}

fn is_informational(raw: &str, lower: &str) -> bool {
    // Indented `key : value` lines are container/stream metadata
    let indented_metadata = raw.starts_with("  ") && lower.contains(" : ");

    indented_metadata
        || INFORMATIONAL_PREFIXES.iter().any(|p| lower.starts_with(p))
        || INFORMATIONAL_MARKERS.iter().any(|m| lower.contains(m))
}

fn fatal_kind(lower: &str) -> Option<FatalKind> {
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has = |token: &str| tokens.contains(&token);

    if has("404") {
        Some(FatalKind::NotFound)
    } else if has("403") || has("forbidden") {
        Some(FatalKind::Forbidden)
    } else if lower.contains("connection refused") {
        Some(FatalKind::ConnectionRefused)
    } else if has("error") {
        Some(FatalKind::Other)
    } else {
        None
    }
}
