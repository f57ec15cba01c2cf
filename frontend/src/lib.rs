//! Tablewire: keeps group rows of a generated HTML table collapsible across re-renders
//!
//! The host page renders a table into a container and rebuilds it from scratch
//! whenever upstream state changes. Each rebuild drops every handler attached to
//! the old table, so this crate watches the container and rewires the group
//! header rows of every new table. Collapsing a group flips its member rows and
//! mirrors the result into a group of checkboxes that the page persists.
//!
//! Components, in the order a page goes through them:
//!
//! - [`waiter::wait_for_element`] resolves once the container exists
//! - [`RenderObserver`] reports the current table after every re-render
//! - [`RowBinder`] assigns the collapse handler to each header row
//! - [`toggle::collapse_toggle`] flips one group and its persisted controls

pub mod binder;
pub mod dataflow;
pub mod error;
pub mod host;
pub mod observer;
pub mod selector;
pub mod state_sync;
pub mod toggle;
pub mod visibility;
pub mod waiter;

#[cfg(test)]
mod testing;

pub use binder::RowBinder;
pub use error::{ContractViolation, RewireError};
pub use host::{Host, MemoryDocument};
pub use observer::RenderObserver;
pub use selector::Selector;
pub use shared::{HiddenRows, MarkupContract, RowIndex};
pub use visibility::track_hidden_rows;

use futures::task::LocalSpawn;
use std::rc::Rc;

/// Wait for the contract's container, then keep every table rendered into it wired.
///
/// A table already inside the container when the watch starts is bound right
/// away; later tables are bound as the observer reports them. Binding failures
/// inside the watch have no caller to go to and are logged. The watch runs
/// until the returned handle is disposed or dropped.
pub async fn observe_table<H: Host>(
    host: H,
    contract: MarkupContract,
    spawner: impl LocalSpawn,
) -> Result<RenderObserver, RewireError> {
    let container = waiter::wait_for_element(&host, &selector::container(&contract)).await;
    log::info!("container '#{}' found", contract.container_id);

    let contract = Rc::new(contract);
    let binder = RowBinder::new(host.clone(), contract.clone());
    let table = selector::table(&contract);

    let observer = RenderObserver::attach(&host, &container, table.clone(), &spawner, {
        let binder = binder.clone();
        move |current| {
            if let Err(error) = binder.bind(&current) {
                log::error!("rebinding re-rendered table failed: {error}");
            }
        }
    })?;

    if let Some(current) = host.query(&container, &table) {
        binder.bind(&current)?;
    }
    Ok(observer)
}

#[cfg(target_arch = "wasm32")]
static WATCH: std::sync::OnceLock<RenderObserver> = std::sync::OnceLock::new();

/// Browser entry point.
///
/// `contract` is a plain object with any of the [`MarkupContract`] fields, or
/// `null`/`undefined` for the defaults. Calling it again while a watch is
/// running has no effect.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn start(contract: wasm_bindgen::JsValue) -> Result<(), wasm_bindgen::JsValue> {
    host::web::init_logging(log::LevelFilter::Info);
    if WATCH.get().is_some() {
        log::warn!("table watch already running");
        return Ok(());
    }

    let contract = if contract.is_null() || contract.is_undefined() {
        MarkupContract::default()
    } else {
        serde_wasm_bindgen::from_value(contract)?
    };
    let host = host::BrowserHost::from_window()
        .map_err(|error| wasm_bindgen::JsValue::from_str(&error.to_string()))?;

    wasm_bindgen_futures::spawn_local(async move {
        match observe_table(host, contract, host::BrowserSpawner).await {
            Ok(observer) => {
                if WATCH.set(observer).is_err() {
                    log::warn!("another table watch started first; dropping this one");
                }
            }
            Err(error) => log::error!("table watch failed to start: {error}"),
        }
    });
    Ok(())
}
