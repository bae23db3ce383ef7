use thiserror::Error;

/// Errors returned by [`AvlTree`](crate::AvlTree) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No node holds the requested key.
    #[error("key not found")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, Error>;
