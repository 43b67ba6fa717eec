use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The state was read before the initializer returned.
    #[error("store state read before its initializer returned")]
    NotInitialized,

    #[error("store initializer failed: {0}")]
    Initializer(#[source] BoxError),
}
