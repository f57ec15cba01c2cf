//! Test fixtures reproducing the generator's table markup in a [`MemoryDocument`]
//!
//! Rows are numbered across the whole table the way the generator numbers them:
//! headers and members share one `row<N>` sequence, and every row has a
//! checkbox with `value=N` in the hidden control group.

use crate::host::{Display, Host, MemoryDocument, NodeId};
use crate::selector::Selector;
use shared::{MarkupContract, RowIndex};
use std::cell::RefCell;
use std::rc::Rc;

const COLUMNS: usize = 2;

pub struct TableFixtureBuilder {
    groups: Vec<usize>,
    hidden: Vec<usize>,
    mounted: bool,
}

impl TableFixtureBuilder {
    /// Append a header followed by `members` member rows.
    pub fn group(mut self, members: usize) -> Self {
        self.groups.push(members);
        self
    }

    /// Start with row `ordinal` collapsed by the stylesheet and its checkbox checked.
    pub fn hidden(mut self, ordinal: usize) -> Self {
        self.hidden.push(ordinal);
        self
    }

    /// Leave the container empty; the first [`TableFixture::rerender`] mounts a table.
    pub fn unmounted(mut self) -> Self {
        self.mounted = false;
        self
    }

    pub fn build(self) -> TableFixture {
        let doc = MemoryDocument::new();
        let contract = MarkupContract::default();

        let container = doc.create_element("div");
        doc.set_attribute(container, "id", &contract.container_id);
        doc.append_child(doc.root(), container).unwrap();

        let control_group = doc.create_element("div");
        doc.append_child(doc.root(), control_group).unwrap();
        let total_rows = self.groups.iter().map(|members| members + 1).sum::<usize>();
        let controls = (0..total_rows)
            .map(|ordinal| {
                let input = doc.create_element("input");
                doc.set_attribute(input, "type", "checkbox");
                doc.set_attribute(input, "name", &contract.control_group);
                doc.set_attribute(input, "value", &ordinal.to_string());
                if self.hidden.contains(&ordinal) {
                    doc.set_attribute(input, "checked", "checked");
                }
                doc.append_child(control_group, input).unwrap();
                input
            })
            .collect();

        let mut fixture = TableFixture {
            doc,
            contract,
            container,
            control_group,
            controls,
            groups: self.groups,
            renders: 0,
            table: None,
            headers: Vec::new(),
            members: Vec::new(),
        };
        if self.mounted {
            fixture.rerender();
        }
        fixture
    }
}

pub struct TableFixture {
    pub doc: MemoryDocument,
    pub contract: MarkupContract,
    pub container: NodeId,
    pub control_group: NodeId,
    pub controls: Vec<NodeId>,
    groups: Vec<usize>,
    renders: usize,
    pub table: Option<NodeId>,
    pub headers: Vec<NodeId>,
    pub members: Vec<Vec<NodeId>>,
}

impl TableFixture {
    pub fn builder() -> TableFixtureBuilder {
        TableFixtureBuilder {
            groups: Vec::new(),
            hidden: Vec::new(),
            mounted: true,
        }
    }

    /// Build a brand-new table from the checkbox state and swap it into the container
    /// in one mutation, as the host does on every upstream change.
    pub fn rerender(&mut self) -> NodeId {
        let table = self.build_table();
        self.doc.replace_children(self.container, &[table]).unwrap();
        table
    }

    fn build_table(&mut self) -> NodeId {
        self.renders += 1;
        let doc = &self.doc;
        let table = doc.create_element("table");
        doc.set_attribute(table, "class", &self.contract.table_class);
        doc.set_attribute(table, "id", &format!("T_{}", self.renders));

        self.headers.clear();
        self.members.clear();
        let mut ordinal = 0;
        for &member_count in &self.groups {
            let header = self.build_row(table, ordinal, &self.contract.header_cell_class);
            ordinal += 1;
            let members = (0..member_count)
                .map(|_| {
                    let row = self.build_row(table, ordinal, &self.contract.member_cell_class);
                    ordinal += 1;
                    row
                })
                .collect();
            self.headers.push(header);
            self.members.push(members);
        }
        self.table = Some(table);
        table
    }

    fn build_row(&self, table: NodeId, ordinal: usize, marker: &str) -> NodeId {
        let doc = &self.doc;
        let row = doc.create_element("tr");
        let hidden = doc.is_checked(&self.controls[ordinal]).unwrap();
        let row_class = self.contract.row_class(&RowIndex::from(ordinal));

        let heading = doc.create_element("th");
        doc.set_attribute(heading, "class", &format!("row_heading level0 {row_class}"));
        doc.append_child(row, heading).unwrap();
        let mut cells = vec![heading];
        for column in 0..COLUMNS {
            let td = doc.create_element("td");
            doc.set_attribute(td, "class", &format!("data {row_class} col{column} {marker}"));
            doc.append_child(row, td).unwrap();
            cells.push(td);
        }

        for (column, cell) in cells.into_iter().enumerate() {
            let id = format!("T_{}_row{ordinal}_col{column}", self.renders);
            doc.set_attribute(cell, "id", &id);
            if hidden {
                doc.add_style_rule(Selector::new().id(id), Display::None);
            }
        }
        doc.append_child(table, row).unwrap();
        row
    }

    /// Visibility of each member row in `group`, judged by computed style.
    pub fn visible_members(&self, group: usize) -> Vec<bool> {
        self.members[group]
            .iter()
            .map(|row| {
                self.doc
                    .children(row)
                    .iter()
                    .all(|cell| !self.doc.computed_display(cell).is_hidden())
            })
            .collect()
    }

    pub fn checked_ordinals(&self) -> Vec<String> {
        self.controls
            .iter()
            .filter(|control| self.doc.is_checked(control).unwrap())
            .filter_map(|control| self.doc.attribute(control, "value"))
            .collect()
    }

    /// Record the `value` of every control whose change bubbles to the document root.
    pub fn record_changes(&self) -> Rc<RefCell<Vec<String>>> {
        let values = Rc::new(RefCell::new(Vec::new()));
        self.doc
            .add_change_listener(&self.doc.root(), {
                let values = values.clone();
                Rc::new(move |doc: &MemoryDocument, target: &NodeId| {
                    values
                        .borrow_mut()
                        .push(doc.attribute(target, "value").unwrap_or_default());
                })
            })
            .unwrap();
        values
    }

    pub fn remove_control(&self, ordinal: usize) {
        self.doc
            .remove_child(self.control_group, self.controls[ordinal])
            .unwrap();
    }
}
