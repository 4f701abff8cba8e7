pub mod active_streams;
pub mod fallback;
pub mod output_parsers;
pub mod process_runner;
pub mod search_aggregator;
pub mod source_resolver;
pub mod stall_monitor;
pub mod tool_check;
pub mod transcode_relay;

pub use active_streams::{ActiveStreams, StreamHandle, StreamSlot};
pub use process_runner::{CommandSpec, ProcessRunner, StreamingProcess, TokioProcessRunner};
pub use search_aggregator::SearchAggregator;
pub use source_resolver::{ResolvedSource, SourceResolver};
pub use stall_monitor::{StallMonitor, StallStatus};
pub use tool_check::{ToolReport, ToolStatus};
pub use transcode_relay::{RelaySession, TranscodeRelay};
