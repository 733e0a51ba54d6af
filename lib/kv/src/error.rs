use thiserror::Error;

#[derive(Error, Debug)]
pub enum KVError {
    /// The backend could not be reached at all (connection or transaction
    /// failure). Distinct from per-key storage faults: callers degrade on
    /// this one.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("storage error: {0}")]
    Storage(String),
}
