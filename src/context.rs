//! Per-run context
//!
//! The original cron-style tools of this kind kept the query window and output
//! settings in process-global mutable state. Here everything a pipeline needs
//! is captured once at startup in an immutable `RunContext` and passed
//! explicitly into every discoverer and executor call.

use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::output::LineFormatter;

/// How far back from "now" each run queries.
pub const QUERY_WINDOW: Duration = Duration::minutes(3);

/// Immutable run-wide values: the shared query time window and the output
/// formatter chosen once from configuration.
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Start of the query window (UTC, now minus `QUERY_WINDOW`).
    pub start_time: OffsetDateTime,
    /// End of the query window (UTC, now at construction).
    pub end_time: OffsetDateTime,
    /// Line formatter selected once per run.
    pub formatter: LineFormatter,
}

impl RunContext {
    /// Capture the current time window and the chosen formatter.
    pub fn new(formatter: LineFormatter) -> Self {
        let end_time = OffsetDateTime::now_utc();
        RunContext {
            start_time: end_time - QUERY_WINDOW,
            end_time,
            formatter,
        }
    }

    /// The window bounds rendered as RFC 3339, for startup logging.
    pub fn window_rfc3339(&self) -> (String, String) {
        (
            self.start_time.format(&Rfc3339).unwrap_or_default(),
            self.end_time.format(&Rfc3339).unwrap_or_default(),
        )
    }
}
