//! In-memory document
//!
//! An arena DOM with just enough behavior for the engine: element queries,
//! a tiny stylesheet for computed `display`, single-slot click handlers,
//! bubbling `change` listeners and mutation subscriptions.
//!
//! Every structural operation is delivered to observers as its own batch unless
//! it runs inside [`MemoryDocument::batch`], which coalesces records the way a
//! browser coalesces mutations made within one task.

use super::{ChangeListener, ClickHandler, Display, Host, MutationBatch, MutationKind, MutationRecord, ObserveOptions};
use crate::dataflow::{Relay, Subscription};
use crate::error::{ContractViolation, RewireError};
use crate::selector::Selector;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Handle to a node of one [`MemoryDocument`].
///
/// Ids are only meaningful for the document that created them. Fallible
/// operations reject ids the document never handed out with
/// [`RewireError::Host`]; lookups treat them as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

struct Element {
    tag_name: String,
    attrs: IndexMap<String, String>,
    inline_display: Option<Display>,
    checked: bool,
    click_handler: Option<ClickHandler<MemoryDocument>>,
    change_listeners: Vec<ChangeListener<MemoryDocument>>,
}

struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    element: Element,
}

struct StyleRule {
    selector: Selector,
    display: Display,
}

struct Registration {
    id: u64,
    target: NodeId,
    options: ObserveOptions,
    relay: Relay<MutationBatch<NodeId>>,
}

struct DocumentState {
    nodes: Vec<Node>,
    root: NodeId,
    style_rules: Vec<StyleRule>,
    registrations: Vec<Registration>,
    next_registration: u64,
    pending: Option<Vec<MutationRecord<NodeId>>>,
}

/// Shared handle to an in-memory document. Clones refer to the same tree.
#[derive(Clone)]
pub struct MemoryDocument {
    state: Rc<RefCell<DocumentState>>,
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryDocument")
            .field("nodes", &state.nodes.len())
            .field("observers", &state.registrations.len())
            .finish()
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// A document holding only an `<html>` root.
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            element: Element::new("html"),
        };
        Self {
            state: Rc::new(RefCell::new(DocumentState {
                nodes: vec![root],
                root: NodeId(0),
                style_rules: Vec::new(),
                registrations: Vec::new(),
                next_registration: 0,
                pending: None,
            })),
        }
    }

    pub fn root(&self) -> NodeId {
        self.state.borrow().root
    }

    /// Create a detached element.
    pub fn create_element(&self, tag_name: &str) -> NodeId {
        let mut state = self.state.borrow_mut();
        let id = NodeId(state.nodes.len());
        state.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            element: Element::new(tag_name),
        });
        id
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut state = self.state.borrow_mut();
        let Some(element) = state.element_mut(node) else {
            log::warn!("set_attribute on unknown {node:?}");
            return;
        };
        if name == "checked" {
            element.checked = true;
        }
        element.attrs.insert(name.to_string(), value.to_string());
        state.record(MutationRecord {
            kind: MutationKind::Attributes,
            target: node,
            added: Vec::new(),
            removed: Vec::new(),
        });
    }

    /// True while `node` is attached below the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let state = self.state.borrow();
        state.check(node).is_ok() && state.is_inclusive_ancestor(state.root, node)
    }

    pub fn inline_display(&self, node: NodeId) -> Option<Display> {
        self.state.borrow().element(node)?.inline_display.clone()
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), RewireError> {
        let mut state = self.state.borrow_mut();
        state.check(parent)?;
        state.check(child)?;
        if child == state.root || state.is_inclusive_ancestor(child, parent) {
            return Err(RewireError::Host("appendChild would create a cycle".into()));
        }
        state.detach(child);
        state.nodes[child.0].parent = Some(parent);
        state.nodes[parent.0].children.push(child);
        state.record(MutationRecord {
            kind: MutationKind::ChildList,
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), RewireError> {
        let mut state = self.state.borrow_mut();
        state.check(parent)?;
        state.check(child)?;
        if state.nodes[child.0].parent != Some(parent) {
            return Err(RewireError::Host("removeChild target is not a direct child".into()));
        }
        state.detach(child);
        Ok(())
    }

    /// Swap out all children of `parent` in one operation, like `innerHTML` assignment.
    pub fn replace_children(&self, parent: NodeId, children: &[NodeId]) -> Result<(), RewireError> {
        let mut state = self.state.borrow_mut();
        state.check(parent)?;
        for &child in children {
            state.check(child)?;
            if child == state.root || state.is_inclusive_ancestor(child, parent) {
                return Err(RewireError::Host("replaceChildren would create a cycle".into()));
            }
        }

        let removed = std::mem::take(&mut state.nodes[parent.0].children);
        for &old in &removed {
            state.nodes[old.0].parent = None;
        }
        for &child in children {
            state.detach(child);
            state.nodes[child.0].parent = Some(parent);
            state.nodes[parent.0].children.push(child);
        }
        state.record(MutationRecord {
            kind: MutationKind::ChildList,
            target: parent,
            added: children.to_vec(),
            removed,
        });
        Ok(())
    }

    /// Run `f` and deliver every mutation it makes as a single batch per observer.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let outermost = {
            let mut state = self.state.borrow_mut();
            if state.pending.is_none() {
                state.pending = Some(Vec::new());
                true
            } else {
                false
            }
        };

        let result = f(self);

        if outermost {
            let mut state = self.state.borrow_mut();
            if let Some(records) = state.pending.take() {
                state.deliver(records);
            }
        }
        result
    }

    /// Add a stylesheet rule; later rules win over earlier ones.
    pub fn add_style_rule(&self, selector: Selector, display: Display) {
        self.state
            .borrow_mut()
            .style_rules
            .push(StyleRule { selector, display });
    }

    /// Dispatch a click at `node`, bubbling through every ancestor's handler slot.
    ///
    /// Returns how many handlers ran. The first handler error stops propagation
    /// and is returned to the caller.
    pub fn click(&self, node: NodeId) -> Result<usize, RewireError> {
        let handlers: Vec<ClickHandler<Self>> = {
            let state = self.state.borrow();
            state.check(node)?;
            state
                .ancestors_inclusive(node)
                .filter_map(|id| state.nodes[id.0].element.click_handler.clone())
                .collect()
        };
        for handler in &handlers {
            handler(self)?;
        }
        Ok(handlers.len())
    }

    /// Number of live mutation subscriptions.
    pub fn observer_count(&self) -> usize {
        self.state
            .borrow()
            .registrations
            .iter()
            .filter(|registration| !registration.relay.is_closed())
            .count()
    }
}

impl Element {
    fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs: IndexMap::new(),
            inline_display: None,
            checked: false,
            click_handler: None,
            change_listeners: Vec::new(),
        }
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attrs
            .get("class")
            .map(|classes| classes.split_whitespace())
            .into_iter()
            .flatten()
    }

    fn default_display(&self) -> Display {
        match self.tag_name.as_str() {
            "td" | "th" => Display::TableCell,
            "tr" => Display::Other("table-row".to_string()),
            "table" => Display::Other("table".to_string()),
            "input" | "span" => Display::Other("inline".to_string()),
            _ => Display::Other("block".to_string()),
        }
    }
}

fn unknown_node(node: NodeId) -> RewireError {
    RewireError::Host(format!("{node:?} does not belong to this document"))
}

impl DocumentState {
    fn check(&self, node: NodeId) -> Result<(), RewireError> {
        self.element(node).map(|_| ()).ok_or_else(|| unknown_node(node))
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(node.0).map(|entry| &entry.element)
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(node.0).map(|entry| &mut entry.element)
    }

    fn ancestors_inclusive(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node), move |id| self.nodes[id.0].parent)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors_inclusive(node).any(|id| id == ancestor)
    }

    /// Unlink `node` from its parent, recording the removal.
    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|id| *id != node);
            self.record(MutationRecord {
                kind: MutationKind::ChildList,
                target: parent,
                added: Vec::new(),
                removed: vec![node],
            });
        }
    }

    fn descendants(&self, scope: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[scope.0].children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        let element = &self.nodes[node.0].element;
        if let Some(tag) = &selector.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &selector.id {
            if element.attrs.get("id") != Some(id) {
                return false;
            }
        }
        if !selector
            .classes
            .iter()
            .all(|wanted| element.classes().any(|class_name| class_name == wanted))
        {
            return false;
        }
        if !selector
            .attributes
            .iter()
            .all(|(name, value)| element.attrs.get(name) == Some(value))
        {
            return false;
        }
        match &selector.has {
            Some(inner) => self.find(node, inner).is_some(),
            None => true,
        }
    }

    fn find(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut nodes = Vec::new();
        self.descendants(scope, &mut nodes);
        nodes.into_iter().find(|&id| self.matches(id, selector))
    }

    fn record(&mut self, record: MutationRecord<NodeId>) {
        match &mut self.pending {
            Some(pending) => pending.push(record),
            None => self.deliver(vec![record]),
        }
    }

    fn wants(&self, registration: &Registration, record: &MutationRecord<NodeId>) -> bool {
        let kind_wanted = match record.kind {
            MutationKind::ChildList => registration.options.child_list,
            MutationKind::Attributes => registration.options.attributes,
        };
        kind_wanted
            && (record.target == registration.target
                || (registration.options.subtree
                    && self.is_inclusive_ancestor(registration.target, record.target)))
    }

    fn deliver(&mut self, records: Vec<MutationRecord<NodeId>>) {
        self.registrations
            .retain(|registration| !registration.relay.is_closed());
        for registration in &self.registrations {
            let relevant: Vec<_> = records
                .iter()
                .filter(|record| self.wants(registration, record))
                .cloned()
                .collect();
            if !relevant.is_empty() {
                registration.relay.send(MutationBatch { records: relevant });
            }
        }
    }
}

impl Host for MemoryDocument {
    type Node = NodeId;

    fn document_root(&self) -> NodeId {
        self.root()
    }

    fn query(&self, scope: &NodeId, selector: &Selector) -> Option<NodeId> {
        let state = self.state.borrow();
        state.check(*scope).ok()?;
        state.find(*scope, selector)
    }

    fn query_all(&self, scope: &NodeId, selector: &Selector) -> Vec<NodeId> {
        let state = self.state.borrow();
        let mut nodes = Vec::new();
        if state.check(*scope).is_err() {
            return nodes;
        }
        state.descendants(*scope, &mut nodes);
        nodes.retain(|&id| state.matches(id, selector));
        nodes
    }

    fn first_element_child(&self, node: &NodeId) -> Option<NodeId> {
        self.state.borrow().nodes.get(node.0)?.children.first().copied()
    }

    fn next_element_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let state = self.state.borrow();
        let parent = state.nodes.get(node.0)?.parent?;
        let siblings = &state.nodes[parent.0].children;
        let position = siblings.iter().position(|id| id == node)?;
        siblings.get(position + 1).copied()
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.state
            .borrow()
            .nodes
            .get(node.0)
            .map(|entry| entry.children.clone())
            .unwrap_or_default()
    }

    fn class_list(&self, node: &NodeId) -> Vec<String> {
        self.state
            .borrow()
            .element(*node)
            .map(|element| element.classes().map(ToOwned::to_owned).collect())
            .unwrap_or_default()
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.state.borrow().element(*node)?.attrs.get(name).cloned()
    }

    fn computed_display(&self, node: &NodeId) -> Display {
        let state = self.state.borrow();
        let Some(element) = state.element(*node) else {
            return Display::Other(String::new());
        };
        if let Some(display) = &element.inline_display {
            return display.clone();
        }
        state
            .style_rules
            .iter()
            .rev()
            .find(|rule| state.matches(*node, &rule.selector))
            .map(|rule| rule.display.clone())
            .unwrap_or_else(|| element.default_display())
    }

    fn set_inline_display(&self, node: &NodeId, display: &Display) -> Result<(), RewireError> {
        let mut state = self.state.borrow_mut();
        state.element_mut(*node).ok_or_else(|| unknown_node(*node))?.inline_display =
            Some(display.clone());
        state.record(MutationRecord {
            kind: MutationKind::Attributes,
            target: *node,
            added: Vec::new(),
            removed: Vec::new(),
        });
        Ok(())
    }

    fn is_checked(&self, node: &NodeId) -> Result<bool, RewireError> {
        let state = self.state.borrow();
        let element = state.element(*node).ok_or_else(|| unknown_node(*node))?;
        if element.tag_name != "input" {
            return Err(ContractViolation::NotAControl.into());
        }
        Ok(element.checked)
    }

    fn set_checked(&self, node: &NodeId, checked: bool) -> Result<(), RewireError> {
        let mut state = self.state.borrow_mut();
        let element = state.element_mut(*node).ok_or_else(|| unknown_node(*node))?;
        if element.tag_name != "input" {
            return Err(ContractViolation::NotAControl.into());
        }
        element.checked = checked;
        Ok(())
    }

    fn dispatch_change(&self, node: &NodeId) -> Result<(), RewireError> {
        let listeners: Vec<ChangeListener<Self>> = {
            let state = self.state.borrow();
            state.check(*node)?;
            state
                .ancestors_inclusive(*node)
                .flat_map(|id| state.nodes[id.0].element.change_listeners.iter().cloned())
                .collect()
        };
        for listener in &listeners {
            listener(self, node);
        }
        Ok(())
    }

    fn set_click_handler(&self, node: &NodeId, handler: ClickHandler<Self>) -> Result<(), RewireError> {
        self.state
            .borrow_mut()
            .element_mut(*node)
            .ok_or_else(|| unknown_node(*node))?
            .click_handler = Some(handler);
        Ok(())
    }

    fn add_change_listener(
        &self,
        node: &NodeId,
        listener: ChangeListener<Self>,
    ) -> Result<(), RewireError> {
        self.state
            .borrow_mut()
            .element_mut(*node)
            .ok_or_else(|| unknown_node(*node))?
            .change_listeners
            .push(listener);
        Ok(())
    }

    fn observe(&self, target: &NodeId, options: ObserveOptions) -> Subscription<MutationBatch<NodeId>> {
        let (relay, receiver) = Relay::new();
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_registration;
            state.next_registration += 1;
            state.registrations.push(Registration {
                id,
                target: *target,
                options,
                relay,
            });
            id
        };

        let state: Weak<RefCell<DocumentState>> = Rc::downgrade(&self.state);
        Subscription::new(receiver, move || {
            // A registration we can't borrow now is pruned on the next delivery
            // since its receiver is already closed.
            if let Some(state) = state.upgrade() {
                if let Ok(mut state) = state.try_borrow_mut() {
                    state.registrations.retain(|registration| registration.id != id);
                }
            }
        })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt};
    use std::cell::Cell;

    fn cell(doc: &MemoryDocument, class_name: &str) -> NodeId {
        let td = doc.create_element("td");
        doc.set_attribute(td, "class", class_name);
        td
    }

    #[test]
    fn test_query_matches_has_selector() {
        let doc = MemoryDocument::new();
        let table = doc.create_element("table");
        let header = doc.create_element("tr");
        let member = doc.create_element("tr");
        doc.append_child(header, cell(&doc, "summary-row")).unwrap();
        doc.append_child(member, cell(&doc, "normal-row")).unwrap();
        doc.append_child(table, header).unwrap();
        doc.append_child(table, member).unwrap();

        let rows = doc.query_all(
            &table,
            &Selector::new().tag("tr").has(Selector::new().tag("td").class("summary-row")),
        );
        assert_eq!(rows, vec![header]);
        assert_eq!(doc.next_element_sibling(&header), Some(member));
        assert_eq!(doc.next_element_sibling(&member), None);
    }

    #[test]
    fn test_computed_display_cascade() {
        let doc = MemoryDocument::new();
        let td = cell(&doc, "data row3");
        assert_eq!(doc.computed_display(&td), Display::TableCell);

        doc.add_style_rule(Selector::new().class("row3"), Display::None);
        assert_eq!(doc.computed_display(&td), Display::None);
        assert_eq!(doc.inline_display(td), None);

        doc.set_inline_display(&td, &Display::TableCell).unwrap();
        assert_eq!(doc.computed_display(&td), Display::TableCell);
    }

    #[test]
    fn test_click_handler_slot_is_replaced() {
        let doc = MemoryDocument::new();
        let row = doc.create_element("tr");
        let fired = Rc::new(Cell::new(0));

        for _ in 0..2 {
            let fired = fired.clone();
            doc.set_click_handler(
                &row,
                Rc::new(move |_: &MemoryDocument| {
                    fired.set(fired.get() + 1);
                    Ok(())
                }),
            )
            .unwrap();
        }

        assert_eq!(doc.click(row).unwrap(), 1);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_click_bubbles_from_cell_to_row() {
        let doc = MemoryDocument::new();
        let row = doc.create_element("tr");
        let td = cell(&doc, "summary-row");
        doc.append_child(row, td).unwrap();
        doc.set_click_handler(&row, Rc::new(|_: &MemoryDocument| Ok(()))).unwrap();

        assert_eq!(doc.click(td).unwrap(), 1);
    }

    #[test]
    fn test_change_event_bubbles_to_ancestor() {
        let doc = MemoryDocument::new();
        let group = doc.create_element("div");
        let input = doc.create_element("input");
        doc.append_child(group, input).unwrap();

        let targets = Rc::new(RefCell::new(Vec::new()));
        doc.add_change_listener(&group, {
            let targets = targets.clone();
            Rc::new(move |_: &MemoryDocument, target: &NodeId| targets.borrow_mut().push(*target))
        })
        .unwrap();

        doc.dispatch_change(&input).unwrap();
        assert_eq!(*targets.borrow(), vec![input]);
    }

    #[test]
    fn test_checked_requires_input() {
        let doc = MemoryDocument::new();
        let div = doc.create_element("div");
        assert!(matches!(
            doc.is_checked(&div),
            Err(RewireError::Contract(ContractViolation::NotAControl))
        ));

        let input = doc.create_element("input");
        doc.set_attribute(input, "checked", "checked");
        assert!(doc.is_checked(&input).unwrap());
    }

    #[test]
    fn test_foreign_node_ids_are_rejected() {
        let doc = MemoryDocument::new();
        let other = MemoryDocument::new();
        let input = other.create_element("input");

        assert!(matches!(doc.is_checked(&input), Err(RewireError::Host(_))));
        assert!(matches!(doc.click(input), Err(RewireError::Host(_))));
        assert!(doc.append_child(doc.root(), input).is_err());
        assert!(doc.set_inline_display(&input, &Display::None).is_err());
        assert!(doc.set_click_handler(&input, Rc::new(|_: &MemoryDocument| Ok(()))).is_err());
        assert_eq!(doc.query(&input, &Selector::new()), None);
        assert!(doc.children(&input).is_empty());
        assert!(doc.class_list(&input).is_empty());
        assert!(!doc.is_connected(input));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let doc = MemoryDocument::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();

        assert!(doc.append_child(inner, outer).is_err());
        assert!(doc.append_child(doc.root(), doc.root()).is_err());
    }

    #[tokio::test]
    async fn test_each_operation_is_one_batch() {
        let doc = MemoryDocument::new();
        let container = doc.create_element("div");
        doc.append_child(doc.root(), container).unwrap();
        let mut subscription = doc.observe(&container, ObserveOptions::child_list());

        let first = doc.create_element("table");
        doc.append_child(container, first).unwrap();
        let second = doc.create_element("table");
        doc.replace_children(container, &[second]).unwrap();

        let batch = subscription.next().await.unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].added, vec![first]);

        let batch = subscription.next().await.unwrap();
        assert_eq!(batch.records[0].removed, vec![first]);
        assert_eq!(batch.records[0].added, vec![second]);
        assert!(!doc.is_connected(first));
    }

    #[tokio::test]
    async fn test_batch_coalesces_records() {
        let doc = MemoryDocument::new();
        let container = doc.create_element("div");
        doc.append_child(doc.root(), container).unwrap();
        let old = doc.create_element("table");
        doc.append_child(container, old).unwrap();
        let mut subscription = doc.observe(&container, ObserveOptions::child_list());

        doc.batch(|doc| {
            doc.remove_child(container, old).unwrap();
            let new = doc.create_element("table");
            doc.append_child(container, new).unwrap();
        });

        let batch = subscription.next().await.unwrap();
        assert_eq!(batch.records.len(), 2);
    }

    #[tokio::test]
    async fn test_subtree_option_sees_deep_changes() {
        let doc = MemoryDocument::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(doc.root(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();

        let shallow = doc.observe(&doc.root(), ObserveOptions::child_list());
        let mut deep = doc.observe(&doc.root(), ObserveOptions::subtree());

        let leaf = doc.create_element("span");
        doc.append_child(inner, leaf).unwrap();

        let batch = deep.next().await.unwrap();
        assert_eq!(batch.records[0].target, inner);

        // Only the deep observer was notified.
        drop(deep);
        let mut shallow = shallow;
        doc.append_child(doc.root(), doc.create_element("p")).unwrap();
        assert_eq!(shallow.next().await.unwrap().records[0].target, doc.root());
    }

    #[test]
    fn test_unsubscribe_removes_registration() {
        let doc = MemoryDocument::new();
        let mut subscription = doc.observe(&doc.root(), ObserveOptions::subtree());
        assert_eq!(doc.observer_count(), 1);

        subscription.unsubscribe();
        assert_eq!(doc.observer_count(), 0);

        doc.append_child(doc.root(), doc.create_element("p")).unwrap();
        assert!(matches!(subscription.next().now_or_never(), Some(None)));
    }
}
