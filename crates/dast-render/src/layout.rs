//! Layouts map node kinds to the handlers that print them.

use std::collections::BTreeSet;

use dast_diff::DEFAULT_IGNORED_FIELDS;

use crate::merged::{Mark, Merged, MergedNode};
use crate::printer::{presence, Printer};

/// Prints one node kind.
pub type Handler = fn(&mut Printer<'_>, &MergedNode);

/// Binding strength of atoms: names, literals, calls, displays.
pub const ATOM: u8 = u8::MAX;

/// Capability table from node kind to handler.
///
/// Kinds without a handler print in the generic `Kind(field=value, ...)`
/// form, leaving out hidden fields.
pub trait Layout {
    fn handler(&self, kind: &str) -> Option<Handler>;

    /// Binding strength of an expression node, for parenthesisation.
    fn precedence(&self, _node: &MergedNode) -> u8 {
        ATOM
    }

    /// Fields the generic form leaves out.
    fn is_hidden(&self, field: &str) -> bool;
}

/// Prints every node in the generic form.
#[derive(Clone, Debug)]
pub struct GenericLayout {
    hidden: BTreeSet<String>,
}

impl GenericLayout {
    pub fn hiding<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hidden: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for GenericLayout {
    fn default() -> Self {
        Self::hiding(DEFAULT_IGNORED_FIELDS)
    }
}

impl Layout for GenericLayout {
    fn handler(&self, _kind: &str) -> Option<Handler> {
        None
    }

    fn is_hidden(&self, field: &str) -> bool {
        self.hidden.contains(field)
    }
}

/// `Kind(field=value, ...)` over the visible fields in name order.
pub fn generic(p: &mut Printer<'_>, node: &MergedNode) {
    let layout = p.layout();
    let fields: Vec<(&String, Mark, &Merged)> = node
        .fields
        .iter()
        .filter(|(name, _)| !layout.is_hidden(name))
        .map(|(name, value)| {
            let (mark, shown) = presence(value);
            (name, mark, shown)
        })
        .filter(|(_, _, shown)| !shown.is_none())
        .collect();

    p.write(&node.kind);
    p.write("(");
    p.list(
        &fields,
        |(_, mark, _)| *mark,
        |p| p.write(", "),
        |p, (name, _, value)| {
            p.write(name);
            p.write("=");
            p.value(value);
        },
    );
    p.write(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dast_types::Value;
    use serde_json::json;

    fn print(json: serde_json::Value) -> String {
        let value = Value::from_json(&json).unwrap();
        let layout = GenericLayout::default();
        let mut p = Printer::new(&layout);
        p.value(&Merged::lift(&value));
        p.finish().plain_text()
    }

    #[test]
    fn generic_form_lists_fields_in_name_order() {
        assert_eq!(
            print(json!({"_type": "Name", "id": "x", "ctx": {"_type": "Load"}})),
            "Name(ctx=Load(), id='x')"
        );
    }

    #[test]
    fn hidden_and_none_fields_are_left_out() {
        assert_eq!(
            print(json!({"_type": "Return", "value": null, "lineno": 3})),
            "Return()"
        );
    }

    #[test]
    fn sequences_print_as_lists() {
        assert_eq!(print(json!([1, [2, "a"]])), "[1, [2, 'a']]");
    }
}
