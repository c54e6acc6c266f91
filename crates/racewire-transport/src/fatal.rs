use tracing::error;

use crate::TransportError;

/// Receives process-fatal transport failures.
///
/// Connect, send, and receive failures arrive here after the connection
/// is torn down; queue overflow arrives from the enqueuing call. Production
/// code uses [`ExitProcess`]; tests plug in a recorder.
pub trait FatalHandler: Send + Sync + 'static {
    fn fatal(&self, error: &TransportError);
}

/// Logs the failure and exits with status 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitProcess;

impl FatalHandler for ExitProcess {
    fn fatal(&self, error: &TransportError) {
        error!(%error, "fatal transport failure, exiting");
        std::process::exit(1);
    }
}
