//! Shared fixtures for HTTP integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use audio_relay::{
    config::Config,
    errors::ProcessError,
    models::{ParserKind, ProcessResult, ResolveCandidate},
    services::{CommandSpec, ProcessRunner, ToolReport, ToolStatus},
    web::{AppState, create_router},
};

/// Answers `run` calls by program name; streaming spawns real processes
#[derive(Default)]
pub struct FakeRunner {
    outputs: Mutex<HashMap<String, (i32, String)>>,
    pub calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn with(self, program: &str, exit_code: i32, stdout: &str) -> Self {
        self.outputs
            .lock()
            .unwrap()
            .insert(program.to_string(), (exit_code, stdout.to_string()));
        self
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.program.clone()).collect()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec, _timeout: Duration) -> Result<ProcessResult, ProcessError> {
        self.calls.lock().unwrap().push(spec.clone());
        match self.outputs.lock().unwrap().get(&spec.program) {
            Some((code, stdout)) => Ok(ProcessResult {
                exit_code: Some(*code),
                stdout: stdout.clone().into_bytes(),
                stderr: Vec::new(),
            }),
            None => Err(ProcessError::Spawn {
                command: spec.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

fn candidate(name: &str, args: &[&str], parser: ParserKind) -> ResolveCandidate {
    ResolveCandidate::new(name, name, args.iter().map(|a| a.to_string()).collect(), parser)
}

/// Config whose resolver programs are fake and whose transcoder runs `script` under `sh`
pub fn test_config(script: &str) -> Config {
    let mut config = Config::default();
    config.resolver.candidates = vec![
        candidate("resolver-json", &["-j", "{input}"], ParserKind::JsonMedia),
        candidate("resolver-plain", &["-g", "{input}"], ParserKind::PlainUrl),
    ];
    config.search.candidates = vec![candidate("search-json", &["ytsearch{limit}:{input}"], ParserKind::JsonLines)];
    config.search.related_candidates = vec![candidate("mix", &["{input}"], ParserKind::JsonLines)];
    config.search.title_candidates = vec![candidate("title", &["{input}"], ParserKind::PlainTitle)];
    config.search.max_results = 5;

    let args = vec!["-c".to_string(), script.to_string(), "{input}".to_string()];
    config.transcoder.command = "sh".to_string();
    config.transcoder.args = args.clone();
    config.transcoder.radio_args = args;
    config.relay.startup_timeout = Duration::from_secs(5);
    config
}

fn tools() -> ToolReport {
    let status = |command: &str| ToolStatus {
        command: command.to_string(),
        available: true,
        version: Some("test".to_string()),
    };
    ToolReport {
        transcoder: status("sh"),
        resolver: status("resolver-json"),
    }
}

pub fn app_state(config: Config, runner: Arc<FakeRunner>) -> AppState {
    AppState::new(config, runner, tools()).unwrap()
}

pub fn server(config: Config, runner: Arc<FakeRunner>) -> TestServer {
    TestServer::new(create_router(app_state(config, runner))).unwrap()
}

pub fn json_line(id: &str, title: &str) -> String {
    format!(r#"{{"id":"{id}","title":"{title}","duration":185}}"#)
}
