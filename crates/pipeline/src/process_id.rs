use tokio::process::Child;

/// The OS process id of a launched job could not be determined.
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// The child was already reaped, so the handle no longer carries a pid.
    #[error("process handle no longer carries a pid")]
    Unavailable,

    #[error("process id could not be read: {0}")]
    Other(String),
}

/// Extracts the integer process id from a launched process handle.
pub trait ProcessIdentifier: Send + Sync {
    fn process_id(&self, child: &Child) -> Result<u32, IdentifierError>;
}

/// Reads the pid straight from the tokio child handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeProcessIdentifier;

impl ProcessIdentifier for NativeProcessIdentifier {
    fn process_id(&self, child: &Child) -> Result<u32, IdentifierError> {
        child.id().ok_or(IdentifierError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
