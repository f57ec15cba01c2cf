//! Persisted-visibility side channel
//!
//! Each member row is paired with a hidden checkbox (same group name, `value`
//! equal to the row ordinal). Flipping the checkbox and firing a bubbling
//! `change` is how the backend learns which rows are collapsed.

use crate::error::{ContractViolation, RewireError};
use crate::host::Host;
use crate::selector;
use shared::{MarkupContract, RowIndex};

/// Find the ordinal class (`row<N>`) among a cell's classes.
pub fn row_index(classes: &[String], prefix: &str) -> Option<RowIndex> {
    classes
        .iter()
        .find_map(|class_name| RowIndex::from_class(class_name, prefix))
}

/// Flip the checkbox paired with `row` and announce the change.
///
/// Returns the row ordinal and the new checked state.
pub fn toggle_persisted<H: Host>(
    host: &H,
    contract: &MarkupContract,
    row: &H::Node,
) -> Result<(RowIndex, bool), RewireError> {
    let leading_cell = host
        .first_element_child(row)
        .ok_or(ContractViolation::MissingLeadingCell)?;
    let classes = host.class_list(&leading_cell);
    let index = row_index(&classes, &contract.row_class_prefix)
        .ok_or(ContractViolation::MissingRowIndex { classes })?;

    let control = host
        .query(&host.document_root(), &selector::control(contract, &index))
        .ok_or_else(|| ContractViolation::MissingControl {
            group: contract.control_group.clone(),
            index: index.clone(),
        })?;

    let checked = !host.is_checked(&control)?;
    host.set_checked(&control, checked)?;
    host.dispatch_change(&control)?;

    log::debug!("row {index}: persisted hidden={checked}");
    Ok((index, checked))
}
