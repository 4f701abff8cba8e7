pub mod classification;

pub use classification::{FatalKind, LineClass, classify};
