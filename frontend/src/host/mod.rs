//! Host abstraction layer
//!
//! The engine never touches a DOM directly. It talks to a [`Host`], which is
//! implemented by the browser (`web_sys`) and by an in-memory document used in
//! tests and headless embedding.

use crate::dataflow::Subscription;
use crate::error::RewireError;
use crate::selector::Selector;
use std::fmt;
use std::rc::Rc;

pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use memory::{MemoryDocument, NodeId};
#[cfg(target_arch = "wasm32")]
pub use web::{BrowserHost, BrowserSpawner};

/// Click handler stored in an element's single handler slot.
///
/// The host passes itself in on dispatch, so handlers don't have to hold it.
pub type ClickHandler<H> = Rc<dyn Fn(&H) -> Result<(), RewireError>>;

/// Listener for bubbling `change` events; receives the event target.
pub type ChangeListener<H> = Rc<dyn Fn(&H, &<H as Host>::Node)>;

/// Effective CSS `display` value of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Display {
    None,
    TableCell,
    Other(String),
}

impl Display {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "none" => Display::None,
            "table-cell" => Display::TableCell,
            other => Display::Other(other.to_string()),
        }
    }

    pub fn as_css(&self) -> &str {
        match self {
            Display::None => "none",
            Display::TableCell => "table-cell",
            Display::Other(value) => value,
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Display::None)
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes,
}

/// One structural or attribute change observed under a subscription target.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord<N> {
    pub kind: MutationKind,
    pub target: N,
    pub added: Vec<N>,
    pub removed: Vec<N>,
}

/// All records a host delivers to one subscriber in one notification.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationBatch<N> {
    pub records: Vec<MutationRecord<N>>,
}

impl<N> MutationBatch<N> {
    pub fn has_child_list(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.kind == MutationKind::ChildList)
    }
}

/// What a mutation subscription reports, mirroring `MutationObserverInit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
}

impl ObserveOptions {
    /// Direct children of the target only.
    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Self::default()
        }
    }

    /// Children anywhere below the target.
    pub fn subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Self::default()
        }
    }
}

/// DOM operations the engine relies on.
///
/// Everything runs on one thread; implementations are cheap handles that can be
/// cloned into handlers.
pub trait Host: Clone + 'static {
    type Node: Clone + PartialEq + fmt::Debug + 'static;

    /// Root element the whole page hangs off.
    fn document_root(&self) -> Self::Node;

    /// First descendant of `scope` matching `selector`, in document order.
    fn query(&self, scope: &Self::Node, selector: &Selector) -> Option<Self::Node>;

    fn query_all(&self, scope: &Self::Node, selector: &Selector) -> Vec<Self::Node>;

    fn first_element_child(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_element_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn class_list(&self, node: &Self::Node) -> Vec<String>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Display after the stylesheet cascade, not just the inline style.
    fn computed_display(&self, node: &Self::Node) -> Display;

    fn set_inline_display(&self, node: &Self::Node, display: &Display) -> Result<(), RewireError>;

    fn is_checked(&self, node: &Self::Node) -> Result<bool, RewireError>;

    fn set_checked(&self, node: &Self::Node, checked: bool) -> Result<(), RewireError>;

    /// Fire one bubbling `change` event at `node`.
    fn dispatch_change(&self, node: &Self::Node) -> Result<(), RewireError>;

    /// Assign the element's single click-handler slot, replacing any previous handler.
    fn set_click_handler(
        &self,
        node: &Self::Node,
        handler: ClickHandler<Self>,
    ) -> Result<(), RewireError>;

    /// Add a `change` listener; listeners accumulate.
    fn add_change_listener(
        &self,
        node: &Self::Node,
        listener: ChangeListener<Self>,
    ) -> Result<(), RewireError>;

    /// Start receiving mutation batches for `target`.
    ///
    /// A host that fails to attach logs the failure and returns a subscription
    /// that never yields.
    fn observe(
        &self,
        target: &Self::Node,
        options: ObserveOptions,
    ) -> Subscription<MutationBatch<Self::Node>>;
}
