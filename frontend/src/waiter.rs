//! One-shot wait for an element to appear

use crate::host::{Host, ObserveOptions};
use crate::selector::Selector;
use futures::StreamExt;

/// Resolve with the first element matching `selector` anywhere in the document.
///
/// Returns immediately if it already exists. Otherwise watches the whole
/// document and re-queries after every mutation batch, unsubscribing as soon
/// as a match shows up. There is no timeout: if the element never appears the
/// future never completes. Each call owns its own subscription.
pub async fn wait_for_element<H: Host>(host: &H, selector: &Selector) -> H::Node {
    let root = host.document_root();
    if let Some(element) = host.query(&root, selector) {
        return element;
    }

    let mut subscription = host.observe(&root, ObserveOptions::subtree());
    // The document may have changed between the first query and subscribing.
    if let Some(element) = host.query(&root, selector) {
        subscription.unsubscribe();
        return element;
    }

    while subscription.next().await.is_some() {
        if let Some(element) = host.query(&root, selector) {
            subscription.unsubscribe();
            log::debug!("'{selector}' appeared");
            return element;
        }
    }

    log::warn!("mutation source for '{selector}' went away; waiting forever");
    futures::future::pending().await
}
