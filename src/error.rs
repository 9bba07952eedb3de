use thiserror::Error;

use crate::model::PostId;

pub type RepoResult<T> = Result<T, RepoError>;

/// Failure of a single repository operation.
///
/// A failed call never leaves a partial change behind: the collection is
/// exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RepoError {
    /// Unknown `sort` or `direction` value on a list query.
    #[error("{0}")]
    InvalidParameter(String),

    /// A create or update payload that does not describe a valid post.
    #[error("Invalid post data: {0}")]
    Validation(String),

    #[error("Post with ID {0} not found")]
    NotFound(PostId),

    /// Comparing two posts failed while sorting. Carries the cause.
    /// The typed sort keys never fail; the variant keeps the 500 mapping at the boundary.
    #[error("Sorting failed")]
    SortFailure(String),
}

impl RepoError {
    pub fn invalid_sort() -> RepoError {
        RepoError::InvalidParameter("Invalid sort parameter. Use 'title' or 'content'.".to_owned())
    }

    pub fn invalid_direction() -> RepoError {
        RepoError::InvalidParameter("Invalid direction parameter. Use 'asc' or 'desc'.".to_owned())
    }

    /// Extra detail worth reporting next to the message, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            RepoError::SortFailure(cause) => Some(cause),
            _ => None,
        }
    }
}
