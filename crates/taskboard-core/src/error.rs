use thiserror::Error;

/// Errors raised by [`crate::store::TaskStore`] operations.
///
/// An empty-name `add_task` is not represented here: it is a silent no-op
/// and surfaces as `None`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl StoreError {
    pub(crate) fn task_index(index: usize, len: usize) -> Self {
        Self::OutOfRange {
            what: "task",
            index,
            len,
        }
    }

    pub(crate) fn subtask_index(index: usize, len: usize) -> Self {
        Self::OutOfRange {
            what: "subtask",
            index,
            len,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
