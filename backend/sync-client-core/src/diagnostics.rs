//! Reporting of remote call failures.

use crate::error::RemoteError;

use common::AppName;

use log::error;

/// Receives every remote failure the proxy observes, before it is returned to the caller.
pub trait DiagnosticSink: Send + Sync {
    fn report_remote_failure(&self, app_name: &AppName, operation: &str, error: &RemoteError);
}

/// Writes failures to the `log` facade under the namespace's own target
/// (`odk_sync::<app_name>`), so each application's diagnostics can be filtered apart.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnosticSink;

impl DiagnosticSink for LogDiagnosticSink {
    fn report_remote_failure(&self, app_name: &AppName, operation: &str, error: &RemoteError) {
        let target = app_name.log_target();
        error!(target: target.as_str(), "{operation} failed for {app_name}: {error}");
    }
}
