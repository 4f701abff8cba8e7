//! Resolver candidate descriptors
//!
//! A candidate is one (tool, argument set, output parser) combination tried
//! during fallback resolution. Candidates are plain data so they can be
//! declared in the configuration file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder replaced with the media identifier or query
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder replaced with the requested result count
pub const LIMIT_PLACEHOLDER: &str = "{limit}";

/// How a candidate's stdout is turned into a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    /// One JSON document describing a single media item
    JsonMedia,
    /// First http(s) line of plain text output
    PlainUrl,
    /// One JSON object per line, each a list entry
    JsonLines,
    /// `id<TAB>title<TAB>duration` per line
    TabSeparated,
    /// First non-empty line, used as a title
    PlainTitle,
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserKind::JsonMedia => "json_media",
            ParserKind::PlainUrl => "plain_url",
            ParserKind::JsonLines => "json_lines",
            ParserKind::TabSeparated => "tab_separated",
            ParserKind::PlainTitle => "plain_title",
        };
        f.write_str(name)
    }
}

impl FromStr for ParserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json_media" => Ok(ParserKind::JsonMedia),
            "plain_url" => Ok(ParserKind::PlainUrl),
            "json_lines" => Ok(ParserKind::JsonLines),
            "tab_separated" => Ok(ParserKind::TabSeparated),
            "plain_title" => Ok(ParserKind::PlainTitle),
            _ => Err(format!("Invalid parser kind: {s}")),
        }
    }
}

/// One external resolver invocation and the parser for its output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveCandidate {
    /// Name used in logs and failure records
    pub name: String,
    /// Executable name or path
    pub command: String,
    /// Arguments, may contain `{input}` and `{limit}`
    #[serde(default)]
    pub args: Vec<String>,
    pub parser: ParserKind,
}

impl ResolveCandidate {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        parser: ParserKind,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            parser,
        }
    }

    /// Substitute placeholders in the argument list.
    ///
    /// Each argument stays a single argv entry, so an input containing
    /// spaces or shell metacharacters is passed through verbatim.
    pub fn render_args(&self, input: &str, limit: usize) -> Vec<String> {
        let limit = limit.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(LIMIT_PLACEHOLDER, &limit)
                    .replace(INPUT_PLACEHOLDER, input)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_args_substitutes_placeholders() {
        let candidate = ResolveCandidate::new(
            "search",
            "yt-dlp",
            vec!["ytsearch{limit}:{input}".to_string(), "-j".to_string()],
            ParserKind::JsonLines,
        );

        let args = candidate.render_args("lofi hip hop; rm -rf /", 5);
        assert_eq!(args, vec!["ytsearch5:lofi hip hop; rm -rf /", "-j"]);
    }

    #[test]
    fn test_input_containing_limit_placeholder_is_not_expanded() {
        let candidate = ResolveCandidate::new(
            "resolve",
            "yt-dlp",
            vec!["{input}".to_string()],
            ParserKind::PlainUrl,
        );

        assert_eq!(candidate.render_args("{limit}", 3), vec!["{limit}"]);
    }

    #[test]
    fn test_parser_kind_from_str() {
        assert_eq!("json_lines".parse::<ParserKind>().unwrap(), ParserKind::JsonLines);
        assert_eq!("PLAIN_URL".parse::<ParserKind>().unwrap(), ParserKind::PlainUrl);
        assert!("xml".parse::<ParserKind>().is_err());
        assert_eq!(ParserKind::TabSeparated.to_string(), "tab_separated");
    }
}
