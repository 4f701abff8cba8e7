//! Transcode Relay
//!
//! Pipes a transcoder's stdout to an HTTP response body. A session moves
//! through `Starting -> Streaming -> Draining -> Completed | Failed`.
//!
//! The response is only committed once the first chunk exists, so spawn
//! failures, startup timeouts, fatal diagnostics and early exits all
//! surface as an error status instead of an empty 200. After that, a fatal
//! diagnostic ends the body without further writes.
//!
//! The body is a pull-based stream: the transcoder is only read as fast as
//! the client consumes, and dropping the body (client disconnect) drops the
//! session, which kills the transcoder. Server shutdown cancels the relay's
//! token, which ends every open body the same way.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::config::{RelayConfig, TranscoderConfig};
use crate::errors::{ProcessError, RelayError, RelayResult};
use crate::models::candidate::INPUT_PLACEHOLDER;
use crate::models::{SessionState, SessionStats, StreamKind};
use crate::services::active_streams::StreamHandle;
use crate::services::process_runner::{CommandSpec, ProcessRunner, StreamingProcess};
use crate::services::stall_monitor::{StallMonitor, StallStatus};
use crate::streaming::classification::{FatalKind, LineClass, classify};

/// How long to wait for stderr to drain after the transcoder exits
const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// First fatal diagnostic seen on stderr
#[derive(Debug, Clone)]
pub struct FatalEvent {
    pub kind: FatalKind,
    pub line: String,
}

/// Spawns transcoder sessions
#[derive(Clone)]
pub struct TranscodeRelay {
    runner: Arc<dyn ProcessRunner>,
    transcoder: TranscoderConfig,
    relay: RelayConfig,
    shutdown: CancellationToken,
}

impl TranscodeRelay {
    /// Sessions started by this relay end when `shutdown` is cancelled
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        transcoder: TranscoderConfig,
        relay: RelayConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            runner,
            transcoder,
            relay,
            shutdown,
        }
    }

    pub fn content_type(&self) -> &str {
        &self.transcoder.content_type
    }

    /// Transcoder invocation for `source_url` using the profile for `kind`
    pub fn command_for(&self, source_url: &str, kind: StreamKind) -> CommandSpec {
        let template = match kind {
            StreamKind::Stream => &self.transcoder.args,
            StreamKind::Radio => &self.transcoder.radio_args,
        };
        let args = template
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, source_url))
            .collect();
        CommandSpec::new(&self.transcoder.command, args)
    }

    /// Spawn the transcoder for a registered session.
    ///
    /// Spawn failure is final; there is no further fallback once a source
    /// has been resolved.
    pub fn start(&self, source_url: &str, handle: StreamHandle) -> RelayResult<RelaySession> {
        let stats = handle.stats().clone();
        let spec = self.command_for(source_url, stats.kind);

        let mut process = self.runner.spawn_streaming(&spec).map_err(|e| {
            error!(
                "session_id={} event=spawn_failed command={} error={}",
                stats.id, spec.program, e
            );
            stats.set_state(SessionState::Failed(e.to_string()));
            match e {
                ProcessError::Spawn { command, source } => RelayError::Spawn { command, source },
                ProcessError::Io { source, .. } => RelayError::Io(source),
                other => RelayError::Io(std::io::Error::other(other.to_string())),
            }
        })?;

        let stdout = process
            .take_stdout(self.transcoder.chunk_size)
            .ok_or_else(|| RelayError::Io(std::io::Error::other("transcoder stdout not piped")))?;

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(self.relay.stderr_tail_lines)));
        let (fatal_tx, fatal_rx) = oneshot::channel();
        let stderr_task = process.take_stderr().map(|stderr| {
            spawn_stderr_monitor(
                stats.id,
                stderr,
                stderr_tail.clone(),
                self.relay.stderr_tail_lines,
                fatal_tx,
            )
        });

        info!(
            "session_id={} event=started kind={} pid={:?} command={}",
            stats.id,
            stats.kind,
            process.pid(),
            spec.program
        );

        Ok(RelaySession {
            id: stats.id,
            monitor: StallMonitor::new(&self.relay, Instant::now()),
            startup_timeout: self.relay.startup_timeout,
            chunk_size: self.transcoder.chunk_size,
            process,
            stdout,
            fatal_rx,
            fatal_open: true,
            stderr_task,
            stderr_tail,
            shutdown: self.shutdown.clone(),
            stats,
            _handle: handle,
        })
    }
}

/// One client's transcoder session; exclusively owns the process
pub struct RelaySession {
    id: Uuid,
    monitor: StallMonitor,
    startup_timeout: Duration,
    chunk_size: usize,
    process: StreamingProcess,
    stdout: ReaderStream<ChildStdout>,
    fatal_rx: oneshot::Receiver<FatalEvent>,
    fatal_open: bool,
    stderr_task: Option<JoinHandle<()>>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    shutdown: CancellationToken,
    stats: Arc<SessionStats>,
    _handle: StreamHandle,
}

enum Event {
    Fatal(FatalEvent),
    FatalChannelClosed,
    Chunk(Bytes),
    ReadError(std::io::Error),
    Eof,
    StartupDeadline,
    StallCheck,
    Shutdown,
}

impl RelaySession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    /// Wait in `Starting` for the first output chunk.
    ///
    /// Fails on a fatal diagnostic, on exit before output, or when the
    /// startup deadline passes.
    pub async fn await_first_chunk(&mut self) -> RelayResult<Bytes> {
        let deadline = self.monitor.startup_deadline();

        loop {
            let event = tokio::select! {
                biased;
                fatal = &mut self.fatal_rx, if self.fatal_open => match fatal {
                    Ok(event) => Event::Fatal(event),
                    Err(_) => Event::FatalChannelClosed,
                },
                chunk = self.stdout.next() => match chunk {
                    Some(Ok(bytes)) => Event::Chunk(bytes),
                    Some(Err(e)) => Event::ReadError(e),
                    None => Event::Eof,
                },
                _ = tokio::time::sleep_until(deadline) => Event::StartupDeadline,
            };

            match event {
                Event::Fatal(event) => return Err(self.fail(source_unavailable(event))),
                Event::FatalChannelClosed => self.fatal_open = false,
                Event::Chunk(bytes) if bytes.is_empty() => continue,
                Event::Chunk(bytes) => {
                    self.monitor.record_data(Instant::now());
                    self.stats.set_state(SessionState::Streaming);
                    debug!("session_id={} event=first_chunk bytes={}", self.id, bytes.len());
                    return Ok(bytes);
                }
                Event::ReadError(e) => return Err(self.fail(RelayError::Io(e))),
                Event::Eof => {
                    let code = self.wait_for_exit().await;
                    let err = match self.take_late_fatal() {
                        Some(event) => source_unavailable(event),
                        None => RelayError::TranscodeFailed {
                            code,
                            stderr: self.stderr_tail(),
                        },
                    };
                    return Err(self.fail(err));
                }
                Event::StartupDeadline => {
                    warn!(
                        "session_id={} event=startup_timeout timeout={:?}",
                        self.id, self.startup_timeout
                    );
                    return Err(self.fail(RelayError::StartupTimeout {
                        timeout: self.startup_timeout,
                    }));
                }
                Event::StallCheck | Event::Shutdown => {}
            }
        }
    }

    /// Stream the session to the client, starting with `first`.
    ///
    /// Chunks are split to at most `chunk_size` bytes and yielded in order.
    pub fn into_body_stream(self, first: Bytes) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        async_stream::stream! {
            let mut session = self;
            let chunk_size = session.chunk_size;

            for piece in split_chunk(first, chunk_size) {
                session.stats.record_chunk(piece.len());
                yield Ok(piece);
            }

            let period = session.monitor.check_interval();
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let event = tokio::select! {
                    biased;
                    fatal = &mut session.fatal_rx, if session.fatal_open => match fatal {
                        Ok(event) => Event::Fatal(event),
                        Err(_) => Event::FatalChannelClosed,
                    },
                    _ = session.shutdown.cancelled() => Event::Shutdown,
                    chunk = session.stdout.next() => match chunk {
                        Some(Ok(bytes)) => Event::Chunk(bytes),
                        Some(Err(e)) => Event::ReadError(e),
                        None => Event::Eof,
                    },
                    _ = ticker.tick() => Event::StallCheck,
                };

                match event {
                    Event::Fatal(event) => {
                        let err = source_unavailable(event);
                        session.fail(err);
                        break;
                    }
                    Event::FatalChannelClosed => session.fatal_open = false,
                    Event::Chunk(bytes) => {
                        if let Some(gap) = session.monitor.record_data(Instant::now()) {
                            info!("session_id={} event=stall_recovered silent_for={:?}", session.id, gap);
                        }
                        for piece in split_chunk(bytes, chunk_size) {
                            session.stats.record_chunk(piece.len());
                            yield Ok(piece);
                        }
                    }
                    Event::ReadError(e) => {
                        error!("session_id={} event=read_error error={}", session.id, e);
                        session.stats.set_state(SessionState::Failed(e.to_string()));
                        yield Err(e);
                        break;
                    }
                    Event::Eof => {
                        session.finish().await;
                        break;
                    }
                    Event::Shutdown => {
                        session.stop_for_shutdown();
                        break;
                    }
                    Event::StartupDeadline => {}
                    Event::StallCheck => {
                        if let StallStatus::Stalled { silent_for } = session.monitor.check(Instant::now()) {
                            warn!(
                                "session_id={} event=stall silent_for={:?} bytes_sent={}",
                                session.id,
                                silent_for,
                                session.stats.bytes_sent()
                            );
                        }
                    }
                }
            }
        }
    }

    /// `Draining`: stdout closed after data; decide how the session ended
    async fn finish(&mut self) {
        self.stats.set_state(SessionState::Draining);
        let code = self.wait_for_exit().await;

        if let Some(event) = self.take_late_fatal() {
            self.fail(source_unavailable(event));
            return;
        }

        match code {
            Some(0) | Some(1) => {
                info!(
                    "session_id={} event=completed exit_code={:?} bytes_sent={} chunks={}",
                    self.id,
                    code,
                    self.stats.bytes_sent(),
                    self.stats.chunks_sent()
                );
                self.stats.set_state(SessionState::Completed);
            }
            _ => {
                self.fail(RelayError::TranscoderExited {
                    code,
                    stderr: self.stderr_tail(),
                });
            }
        }
    }

    /// Server is going down: end the body and kill the transcoder
    fn stop_for_shutdown(&mut self) {
        info!(
            "session_id={} event=shutdown bytes_sent={} chunks={}",
            self.id,
            self.stats.bytes_sent(),
            self.stats.chunks_sent()
        );
        self.stats.set_state(SessionState::Completed);
        self.process.kill();
    }

    async fn wait_for_exit(&mut self) -> Option<i32> {
        let code = match self.process.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!("session_id={} event=wait_failed error={}", self.id, e);
                None
            }
        };

        if let Some(mut task) = self.stderr_task.take() {
            if tokio::time::timeout(STDERR_DRAIN_GRACE, &mut task).await.is_err() {
                debug!("session_id={} stderr still open after exit", self.id);
            }
        }
        code
    }

    fn take_late_fatal(&mut self) -> Option<FatalEvent> {
        if !self.fatal_open {
            return None;
        }
        self.fatal_rx.try_recv().ok()
    }

    fn stderr_tail(&self) -> String {
        self.stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default()
    }

    /// Record a terminal failure and hand the error back
    fn fail(&mut self, err: RelayError) -> RelayError {
        error!(
            "session_id={} event=failed bytes_sent={} error={}",
            self.id,
            self.stats.bytes_sent(),
            err
        );
        self.stats.set_state(SessionState::Failed(err.to_string()));
        self.process.kill();
        err
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        if !self.stats.state().is_terminal() {
            info!(
                "session_id={} event=client_disconnected bytes_sent={}",
                self.id,
                self.stats.bytes_sent()
            );
            self.stats.set_state(SessionState::Completed);
        }
        // StreamingProcess kills the transcoder when dropped
    }
}

fn source_unavailable(event: FatalEvent) -> RelayError {
    RelayError::SourceUnavailable {
        kind: event.kind,
        line: event.line,
    }
}

/// Split `chunk` into pieces of at most `max` bytes without copying
pub fn split_chunk(mut chunk: Bytes, max: usize) -> impl Iterator<Item = Bytes> {
    let max = max.max(1);
    std::iter::from_fn(move || {
        if chunk.is_empty() {
            None
        } else {
            let take = chunk.len().min(max);
            Some(chunk.split_to(take))
        }
    })
}

/// Read stderr line by line, keep a tail, and report the first fatal line
fn spawn_stderr_monitor(
    session_id: Uuid,
    stderr: ChildStderr,
    tail: Arc<Mutex<VecDeque<String>>>,
    tail_lines: usize,
    fatal_tx: oneshot::Sender<FatalEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut segments = BufReader::new(stderr).split(b'\n');
        let mut fatal_tx = Some(fatal_tx);

        while let Ok(Some(segment)) = segments.next_segment().await {
            let text = String::from_utf8_lossy(&segment);
            // Progress output uses carriage returns within one segment
            for line in text.split('\r').map(str::trim_end).filter(|l| !l.trim().is_empty()) {
                if let Ok(mut tail) = tail.lock() {
                    if tail.len() >= tail_lines.max(1) {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }

                match classify(line) {
                    LineClass::Fatal(kind) => match fatal_tx.take() {
                        Some(tx) => {
                            error!("session_id={} event=fatal_diagnostic kind={} line={}", session_id, kind, line);
                            let _ = tx.send(FatalEvent {
                                kind,
                                line: line.to_string(),
                            });
                        }
                        None => debug!("session_id={} event=repeat_fatal line={}", session_id, line),
                    },
                    LineClass::Informational => debug!("session_id={} transcoder: {}", session_id, line),
                    LineClass::Ignored => trace!("session_id={} transcoder: {}", session_id, line),
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::active_streams::ActiveStreams;
    use crate::services::process_runner::TokioProcessRunner;

    fn relay(script: &str, startup_timeout: Duration) -> TranscodeRelay {
        relay_with_shutdown(script, startup_timeout, CancellationToken::new())
    }

    fn relay_with_shutdown(script: &str, startup_timeout: Duration, shutdown: CancellationToken) -> TranscodeRelay {
        let transcoder = TranscoderConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "{input}".to_string()],
            radio_args: vec!["-c".to_string(), script.to_string(), "{input}".to_string()],
            chunk_size: 4,
            ..TranscoderConfig::default()
        };
        let relay = RelayConfig {
            startup_timeout,
            ..RelayConfig::default()
        };
        TranscodeRelay::new(Arc::new(TokioProcessRunner::new()), transcoder, relay, shutdown)
    }

    fn register(registry: &ActiveStreams) -> StreamHandle {
        registry
            .reserve()
            .unwrap()
            .register(Arc::new(SessionStats::new(StreamKind::Stream, "https://cdn.example/a")))
    }

    /// Whether `pid` is still a live (non-zombie) process
    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn collect(session: RelaySession, first: Bytes) -> Vec<Bytes> {
        session
            .into_body_stream(first)
            .filter_map(|r| async move { r.ok() })
            .collect()
            .await
    }

    #[test]
    fn test_split_chunk() {
        let pieces: Vec<Bytes> = split_chunk(Bytes::from_static(b"abcdefghij"), 4).collect();
        assert_eq!(pieces, vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh"), Bytes::from_static(b"ij")]);
        assert_eq!(split_chunk(Bytes::new(), 4).count(), 0);
    }

    #[test]
    fn test_command_substitutes_input() {
        let relay = relay("cat", Duration::from_secs(1));
        let spec = relay.command_for("https://radio.example/live", StreamKind::Radio);
        assert_eq!(spec.program, "sh");
        assert_eq!(spec.args[2], "https://radio.example/live");
    }

    #[tokio::test]
    async fn test_streams_output_and_completes() {
        let registry = ActiveStreams::new(4, 4);
        let relay = relay("printf 'hello world'", Duration::from_secs(5));
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();
        let stats = session.stats().clone();

        let first = session.await_first_chunk().await.unwrap();
        let pieces = collect(session, first).await;

        let body: Vec<u8> = pieces.iter().flat_map(|b| b.to_vec()).collect();
        assert_eq!(body, b"hello world");
        assert!(pieces.iter().all(|p| p.len() <= 4));
        assert_eq!(stats.bytes_sent(), 11);
        assert_eq!(stats.state(), SessionState::Completed);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_exit_before_output_fails() {
        let registry = ActiveStreams::new(4, 4);
        let relay = relay("echo 'Invalid data found when processing input' >&2; exit 1", Duration::from_secs(5));
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();

        let err = session.await_first_chunk().await.unwrap_err();
        match err {
            RelayError::TranscodeFailed { code, stderr } => {
                assert_eq!(code, Some(1));
                assert!(stderr.contains("Invalid data"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fatal_diagnostic_before_output() {
        let registry = ActiveStreams::new(4, 4);
        let relay = relay(
            "echo '[https @ 0x1] HTTP error 404 Not Found' >&2; exec sleep 5",
            Duration::from_secs(5),
        );
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();

        let err = session.await_first_chunk().await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::SourceUnavailable {
                kind: FatalKind::NotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_startup_timeout() {
        let registry = ActiveStreams::new(4, 4);
        let relay = relay("exec sleep 5", Duration::from_millis(200));
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();
        let stats = session.stats().clone();

        let err = session.await_first_chunk().await.unwrap_err();
        assert!(matches!(err, RelayError::StartupTimeout { .. }));
        assert!(matches!(stats.state(), SessionState::Failed(_)));
        assert_eq!(stats.bytes_sent(), 0);
    }

    #[tokio::test]
    async fn test_fatal_mid_stream_ends_body() {
        let registry = ActiveStreams::new(4, 4);
        let relay = relay(
            "printf aaaa; sleep 0.2; printf bbbb; sleep 0.2; printf cccc; sleep 0.3; \
             echo 'Server returned 403 Forbidden (access denied)' >&2; sleep 0.3; \
             echo 'Server returned 403 Forbidden (access denied)' >&2; exec sleep 5",
            Duration::from_secs(5),
        );
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();
        let stats = session.stats().clone();

        let first = session.await_first_chunk().await.unwrap();
        let pieces = collect(session, first).await;

        assert_eq!(pieces.concat(), b"aaaabbbbcccc");
        assert_eq!(stats.bytes_sent(), 12);
        assert!(matches!(stats.state(), SessionState::Failed(_)));
        assert_eq!(registry.count(), 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropping_body_kills_transcoder() {
        let registry = ActiveStreams::new(4, 4);
        let relay = relay("while true; do printf data; sleep 0.05; done", Duration::from_secs(5));
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();
        let stats = session.stats().clone();
        let pid = session.process.pid().unwrap();

        let first = session.await_first_chunk().await.unwrap();
        let mut body = Box::pin(session.into_body_stream(first));
        body.next().await.unwrap().unwrap();
        assert!(is_running(pid));
        drop(body);

        let frozen = stats.bytes_sent();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!is_running(pid));
        assert_eq!(stats.bytes_sent(), frozen);
        assert_eq!(stats.state(), SessionState::Completed);
        assert_eq!(registry.count(), 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_shutdown_ends_live_body() {
        let registry = ActiveStreams::new(4, 4);
        let shutdown = CancellationToken::new();
        let relay = relay_with_shutdown(
            "while true; do printf data; sleep 0.05; done",
            Duration::from_secs(5),
            shutdown.clone(),
        );
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();
        let stats = session.stats().clone();
        let pid = session.process.pid().unwrap();

        let first = session.await_first_chunk().await.unwrap();
        let body = tokio::spawn(collect(session, first));
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();

        let pieces = tokio::time::timeout(Duration::from_secs(2), body)
            .await
            .expect("body did not end after shutdown")
            .unwrap();
        assert!(!pieces.is_empty());
        assert_eq!(stats.state(), SessionState::Completed);
        assert_eq!(registry.count(), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!is_running(pid));
    }

    #[tokio::test]
    async fn test_exit_one_after_data_completes() {
        let registry = ActiveStreams::new(4, 4);
        let relay = relay("printf abcd; exit 1", Duration::from_secs(5));
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();
        let stats = session.stats().clone();

        let first = session.await_first_chunk().await.unwrap();
        let pieces = collect(session, first).await;

        assert_eq!(pieces.concat(), b"abcd");
        assert_eq!(stats.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_exit_two_after_data_fails_mid_stream() {
        let registry = ActiveStreams::new(4, 4);
        let relay = relay("printf abcd; exit 2", Duration::from_secs(5));
        let mut session = relay.start("https://cdn.example/a", register(&registry)).unwrap();
        let stats = session.stats().clone();

        let first = session.await_first_chunk().await.unwrap();
        let pieces = collect(session, first).await;

        assert_eq!(pieces.concat(), b"abcd");
        match stats.state() {
            SessionState::Failed(reason) => {
                assert!(reason.contains("mid-stream"), "{reason}");
                assert!(!reason.contains("before producing audio"), "{reason}");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_transcoder_is_spawn_error() {
        let registry = ActiveStreams::new(4, 4);
        let transcoder = TranscoderConfig {
            command: "definitely-not-ffmpeg-4b2a".to_string(),
            ..TranscoderConfig::default()
        };
        let relay = TranscodeRelay::new(
            Arc::new(TokioProcessRunner::new()),
            transcoder,
            RelayConfig::default(),
            CancellationToken::new(),
        );

        let err = relay.start("https://cdn.example/a", register(&registry)).err().unwrap();
        assert!(matches!(err, RelayError::Spawn { .. }));
        assert_eq!(registry.count(), 0);
    }
}
