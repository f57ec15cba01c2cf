//! Collapse/expand of the member rows under a group header

use crate::error::RewireError;
use crate::host::{Display, Host};
use crate::selector;
use crate::state_sync;
use shared::MarkupContract;

/// Flip every member row owned by `header` and sync each one's persisted flag.
///
/// Walks forward from the header until the next row without a member marker
/// cell (another header) or the end of the table. Visibility is read from the
/// computed style because the generator hides rows through its stylesheet.
///
/// Fails fast: a row whose checkbox can't be synced stops the sweep. Rows
/// before it keep their new state; the failing row is already flipped visually.
///
/// Returns the number of member rows toggled.
pub fn collapse_toggle<H: Host>(
    host: &H,
    contract: &MarkupContract,
    header: &H::Node,
) -> Result<usize, RewireError> {
    let member_marker = selector::member_cell(contract);
    let mut toggled = 0;

    let mut next_row = host.next_element_sibling(header);
    while let Some(row) = next_row {
        if host.query(&row, &member_marker).is_none() {
            break;
        }

        for cell in host.children(&row) {
            let flipped = if host.computed_display(&cell).is_hidden() {
                Display::TableCell
            } else {
                Display::None
            };
            host.set_inline_display(&cell, &flipped)?;
        }
        state_sync::toggle_persisted(host, contract, &row)?;
        toggled += 1;

        next_row = host.next_element_sibling(&row);
    }

    log::debug!("group header toggled {toggled} member rows");
    Ok(toggled)
}
