use linewatch_client::error::ApiError;
use linewatch_core::error::CoreError;

/// Errors surfaced by the sync engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Input rejected before any request was made, or an unknown line.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SyncError {
    /// Whether the error was raised locally, without touching the network.
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Core(CoreError::Validation(_)))
    }
}
