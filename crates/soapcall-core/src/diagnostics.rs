use std::{error::Error, fmt};

use tracing::error;

/// Where user-facing problems are reported.
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    /// A problem the user has to act on (e.g. a request without endpoint).
    fn show_error(&self, message: &str);

    /// A recovered failure worth keeping in the logs.
    fn log_error(&self, error: &dyn Error);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn show_error(&self, message: &str) {
        error!(message, "request error");
    }

    fn log_error(&self, error: &dyn Error) {
        error!(%error, "recovered error");
    }
}
