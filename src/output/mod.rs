//! Output encoding for the Graphite line protocol

pub mod format;

pub use format::{LineFormat, LineFormatter};
