//! Delegated listener mirroring the persisted-visibility checkboxes
//!
//! This is the receiving end of the `change` events the toggle emits: what a
//! bridge to the backend attaches to an ancestor of the control group.

use crate::error::RewireError;
use crate::host::Host;
use crate::selector;
use shared::{HiddenRows, MarkupContract, RowIndex};
use std::cell::RefCell;
use std::rc::Rc;

/// Keep a [`HiddenRows`] in step with the control group below `ancestor`.
///
/// Seeded from the controls' current state, then updated on every `change`
/// bubbling up from a control of the contract's group. Changes from other
/// inputs are ignored.
pub fn track_hidden_rows<H: Host>(
    host: &H,
    ancestor: &H::Node,
    contract: &MarkupContract,
) -> Result<Rc<RefCell<HiddenRows>>, RewireError> {
    let mut initial = HiddenRows::new();
    for control in host.query_all(ancestor, &selector::control_group(contract)) {
        if let Some(index) = control_index(host, &control) {
            initial.apply(index, host.is_checked(&control)?);
        }
    }
    let hidden = Rc::new(RefCell::new(initial));

    let group = contract.control_group.clone();
    host.add_change_listener(ancestor, {
        let hidden = hidden.clone();
        Rc::new(move |host: &H, target: &H::Node| {
            if host.attribute(target, "name").as_deref() != Some(group.as_str()) {
                return;
            }
            let Some(index) = control_index(host, target) else {
                log::warn!("control in group '{group}' has no row ordinal value");
                return;
            };
            match host.is_checked(target) {
                Ok(checked) => {
                    hidden.borrow_mut().apply(index, checked);
                }
                Err(error) => log::warn!("ignoring change from row {index}: {error}"),
            }
        })
    })?;

    Ok(hidden)
}

fn control_index<H: Host>(host: &H, control: &H::Node) -> Option<RowIndex> {
    host.attribute(control, "value")
        .and_then(|value| RowIndex::parse(&value).ok())
}
