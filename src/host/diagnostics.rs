use super::DiagnosticsSink;
use crate::core::UnitId;

/// Reports template diagnostics through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn warning(&self, unit: &UnitId, message: &str) {
        tracing::warn!(target: "markup", "{unit}: {message}");
    }

    fn error(&self, unit: &UnitId, message: &str) {
        tracing::error!(target: "markup", "{unit}: {message}");
    }
}
