use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The key that was absent at its traversal depth.
    #[error("{0}")]
    KeyMissing(String),
}
