//! Typed CSS selectors
//!
//! The engine only ever needs a handful of selector shapes. Keeping them typed
//! lets the browser host render them to CSS text while the in-memory host
//! matches them structurally, without either side parsing selector strings.

use shared::{MarkupContract, RowIndex};
use std::fmt;

/// A compound selector with an optional `:has(...)` descendant test.
///
/// Renders as `tag#id.class[name='value']:has(inner)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub has: Option<Box<Selector>>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class_name: impl Into<String>) -> Self {
        self.classes.push(class_name.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn has(mut self, inner: Selector) -> Self {
        self.has = Some(Box::new(inner));
        self
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class_name in &self.classes {
            write!(f, ".{class_name}")?;
        }
        for (name, value) in &self.attributes {
            write!(f, "[{name}='{}']", escape_attribute_value(value))?;
        }
        if let Some(inner) = &self.has {
            write!(f, ":has({inner})")?;
        }
        if self.tag.is_none() && self.id.is_none() && self.classes.is_empty()
            && self.attributes.is_empty() && self.has.is_none()
        {
            f.write_str("*")?;
        }
        Ok(())
    }
}

fn escape_attribute_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\'' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// ===== CONTRACT SELECTORS =====

/// `#table_output`
pub fn container(contract: &MarkupContract) -> Selector {
    Selector::new().id(&contract.container_id)
}

/// `.interactive-table`
pub fn table(contract: &MarkupContract) -> Selector {
    Selector::new().class(&contract.table_class)
}

/// `tr:has(td.summary-row)`
pub fn header_row(contract: &MarkupContract) -> Selector {
    Selector::new()
        .tag("tr")
        .has(Selector::new().tag("td").class(&contract.header_cell_class))
}

/// `td.normal-row`, the marker distinguishing member rows from headers
pub fn member_cell(contract: &MarkupContract) -> Selector {
    Selector::new().tag("td").class(&contract.member_cell_class)
}

/// `input[name='row_indexes_to_hide']`, every control in the group
pub fn control_group(contract: &MarkupContract) -> Selector {
    Selector::new().tag("input").attr("name", &contract.control_group)
}

/// `input[name='row_indexes_to_hide'][value='N']`
pub fn control(contract: &MarkupContract, index: &RowIndex) -> Selector {
    control_group(contract).attr("value", index.as_str())
}
