use thiserror::Error;

/// Failures from the best-score persistence collaborator.
///
/// Gameplay itself has no error paths; invalid interactions degrade to silent
/// no-op outcomes instead.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not access best-score storage")]
    Io(#[from] std::io::Error),
    #[error("best-score storage is malformed")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
