pub mod candidate;
pub mod media;
pub mod process;
pub mod relay;

pub use candidate::{ParserKind, ResolveCandidate};
pub use media::{MediaListItem, MediaUrlFilter, ResolvedMedia};
pub use process::ProcessResult;
pub use relay::{SessionSnapshot, SessionState, SessionStats, StreamKind};
