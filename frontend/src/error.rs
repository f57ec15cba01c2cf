use futures::task::SpawnError;
use shared::RowIndex;

/// The table markup does not follow the contract the generator is supposed to honor.
///
/// These are never retried: they mean the generator and this crate disagree on
/// class names or structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("member row has no leading cell")]
    MissingLeadingCell,
    #[error("leading cell carries no row ordinal class (classes: {classes:?})")]
    MissingRowIndex { classes: Vec<String> },
    #[error("no control in group '{group}' with value '{index}'")]
    MissingControl { group: String, index: RowIndex },
    #[error("node is not an element")]
    NotAnElement,
    #[error("node is not a checkbox control")]
    NotAControl,
}

#[derive(Debug, thiserror::Error)]
pub enum RewireError {
    #[error("markup contract violated: {0}")]
    Contract(#[from] ContractViolation),
    #[error("DOM operation failed: {0}")]
    Host(String),
    #[error("failed to spawn observer task: {0}")]
    Spawn(#[from] SpawnError),
}
