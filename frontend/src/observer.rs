//! Re-resolution of the table after every re-render of its container

use crate::error::RewireError;
use crate::host::{Host, ObserveOptions};
use crate::selector::Selector;
use futures::future::{AbortHandle, Abortable};
use futures::task::{LocalSpawn, LocalSpawnExt};
use futures::StreamExt;

/// Handle to a running container watch.
///
/// The watch lives until [`RenderObserver::dispose`] is called or the handle is
/// dropped; a page that wants it permanent keeps the handle for its lifetime.
#[derive(Debug)]
pub struct RenderObserver {
    abort_handle: AbortHandle,
}

impl RenderObserver {
    /// Watch `container`'s children and call `on_table_ready` with the current
    /// table after every batch that contains a child-list change.
    ///
    /// The subscription is taken before this returns, so nothing that happens
    /// between attaching and the first poll of the spawned task is missed.
    /// Batches are handled in delivery order, each re-querying the container,
    /// so a burst of records for one rebuild resolves to whatever table is there
    /// when the batch is processed. Batches with no table present are skipped.
    pub fn attach<H, F>(
        host: &H,
        container: &H::Node,
        table: Selector,
        spawner: &impl LocalSpawn,
        mut on_table_ready: F,
    ) -> Result<Self, RewireError>
    where
        H: Host,
        F: FnMut(H::Node) + 'static,
    {
        let mut subscription = host.observe(container, ObserveOptions::child_list());
        let host = host.clone();
        let container = container.clone();

        let watch = async move {
            while let Some(batch) = subscription.next().await {
                if !batch.has_child_list() {
                    continue;
                }
                match host.query(&container, &table) {
                    Some(current) => on_table_ready(current),
                    None => log::debug!("container changed without a '{table}' child"),
                }
            }
        };

        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        spawner.spawn_local(async move {
            let _ = Abortable::new(watch, abort_registration).await;
        })?;

        log::info!("watching container for table re-renders");
        Ok(Self { abort_handle })
    }

    /// Stop watching. The subscription is released when the task is next polled.
    pub fn dispose(self) {
        log::info!("container watch disposed");
    }
}

impl Drop for RenderObserver {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}
