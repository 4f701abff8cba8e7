//! External tool availability
//!
//! Probed once at startup and reported by `/health`. A missing tool is not
//! fatal at startup; requests that need it fail with an install hint.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::models::ResolveCandidate;
use crate::services::process_runner::{CommandSpec, ProcessRunner};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub command: String,
    pub available: bool,
    pub version: Option<String>,
}

impl ToolStatus {
    fn missing(command: &str) -> Self {
        Self {
            command: command.to_string(),
            available: false,
            version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReport {
    pub transcoder: ToolStatus,
    pub resolver: ToolStatus,
}

/// Run `spec` and extract a version from the first output line
pub async fn probe_tool(runner: &dyn ProcessRunner, spec: &CommandSpec) -> ToolStatus {
    match runner.run(spec, PROBE_TIMEOUT).await {
        Ok(result) if result.success() => ToolStatus {
            command: spec.to_string(),
            available: true,
            version: parse_version_line(&result.stdout_text()),
        },
        Ok(result) => {
            warn!("{} exited with {:?}", spec, result.exit_code);
            ToolStatus::missing(&spec.to_string())
        }
        Err(e) => {
            warn!("{} unavailable: {}", spec, e);
            ToolStatus::missing(&spec.to_string())
        }
    }
}

/// `ffmpeg version 6.1.1-3ubuntu5 Copyright...` becomes `6.1.1-3ubuntu5`;
/// other tools print the bare version.
fn parse_version_line(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let version = match line.split_once(" version ") {
        Some((_, rest)) => rest.split_whitespace().next()?,
        None => line,
    };
    Some(version.to_string())
}

/// Version probe for a resolver candidate, keeping a `-m module` prefix
fn resolver_probe(candidate: &ResolveCandidate) -> CommandSpec {
    let mut args = Vec::new();
    if let [flag, module, ..] = candidate.args.as_slice() {
        if flag == "-m" {
            args.extend([flag.clone(), module.clone()]);
        }
    }
    args.push("--version".to_string());
    CommandSpec::new(&candidate.command, args)
}

/// Probe the transcoder and the first working resolver candidate
pub async fn check_tools(
    runner: &dyn ProcessRunner,
    transcoder_command: &str,
    resolvers: &[ResolveCandidate],
) -> ToolReport {
    let transcoder = probe_tool(
        runner,
        &CommandSpec::new(transcoder_command, vec!["-version".to_string()]),
    )
    .await;
    info!(
        "Transcoder: available={}, version={:?}, command={}",
        transcoder.available, transcoder.version, transcoder_command
    );

    let mut probed: Vec<CommandSpec> = Vec::new();
    let mut resolver = None;
    for candidate in resolvers {
        let spec = resolver_probe(candidate);
        if probed.contains(&spec) {
            continue;
        }
        let status = probe_tool(runner, &spec).await;
        probed.push(spec);
        if status.available {
            resolver = Some(status);
            break;
        }
    }

    let resolver = resolver.unwrap_or_else(|| {
        let names: Vec<&str> = resolvers.iter().map(|c| c.command.as_str()).collect();
        ToolStatus::missing(&names.join(", "))
    });
    info!(
        "Resolver: available={}, version={:?}, command={}",
        resolver.available, resolver.version, resolver.command
    );

    ToolReport { transcoder, resolver }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParserKind;
    use crate::services::fallback::test_support::{Scripted, ScriptedRunner};

    #[test]
    fn test_parse_version_line() {
        assert_eq!(
            parse_version_line("ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023\nbuilt with gcc").as_deref(),
            Some("6.1.1-3ubuntu5")
        );
        assert_eq!(parse_version_line("\n2024.08.06\n").as_deref(), Some("2024.08.06"));
        assert_eq!(parse_version_line(""), None);
    }

    #[tokio::test]
    async fn test_check_tools_skips_missing_resolvers() {
        let runner = ScriptedRunner::default()
            .with("ffmpeg", Scripted::ok("ffmpeg version 7.0 Copyright\n"))
            .with("python3", Scripted::ok("2024.08.06\n"));
        let resolvers = vec![
            ResolveCandidate::new("local", "./bin/yt-dlp", vec![], ParserKind::JsonMedia),
            ResolveCandidate::new("path", "yt-dlp", vec![], ParserKind::JsonMedia),
            ResolveCandidate::new("path-plain", "yt-dlp", vec![], ParserKind::PlainUrl),
            ResolveCandidate::new(
                "python",
                "python3",
                vec!["-m".to_string(), "yt_dlp".to_string(), "-g".to_string()],
                ParserKind::PlainUrl,
            ),
        ];

        let report = check_tools(&runner, "ffmpeg", &resolvers).await;

        assert!(report.transcoder.available);
        assert_eq!(report.transcoder.version.as_deref(), Some("7.0"));
        assert_eq!(report.resolver.command, "python3 -m yt_dlp --version");
        assert_eq!(report.resolver.version.as_deref(), Some("2024.08.06"));
        // duplicate yt-dlp probe skipped
        assert_eq!(
            runner.called_commands(),
            vec!["ffmpeg", "./bin/yt-dlp", "yt-dlp", "python3"]
        );
    }
}
