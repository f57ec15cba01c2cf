//! Click wiring for group header rows

use crate::error::RewireError;
use crate::host::Host;
use crate::selector::{self, Selector};
use crate::toggle::collapse_toggle;
use shared::MarkupContract;
use std::rc::Rc;

/// Assigns the collapse handler to every group header of a table.
///
/// Handlers go into each row's single click slot, so binding a table again
/// replaces the previous handler instead of adding a second one. Listener
/// registration would stack a duplicate toggle on every spurious rebind.
#[derive(Debug, Clone)]
pub struct RowBinder<H: Host> {
    host: H,
    contract: Rc<MarkupContract>,
    header_row: Selector,
}

impl<H: Host> RowBinder<H> {
    pub fn new(host: H, contract: Rc<MarkupContract>) -> Self {
        let header_row = selector::header_row(&contract);
        Self {
            host,
            contract,
            header_row,
        }
    }

    /// Wire every header row in `table`. Returns how many rows were bound.
    pub fn bind(&self, table: &H::Node) -> Result<usize, RewireError> {
        let headers = self.host.query_all(table, &self.header_row);
        for header in &headers {
            let contract = self.contract.clone();
            let target = header.clone();
            self.host.set_click_handler(
                header,
                Rc::new(move |host: &H| collapse_toggle(host, &contract, &target).map(|_| ())),
            )?;
        }
        log::debug!("bound {} group headers", headers.len());
        Ok(headers.len())
    }
}
