//! Depth-first printer over the merged tree.
//!
//! Layout handlers drive the printer through a small set of primitives:
//! plain text, fields, inline lists, statement blocks and optional parts.
//! The primitives apply element marks as styles. Separators are placed so
//! that dropping every removed span leaves exactly the after tree's text.
//!
//! Inside a removed span everything stays removed, including the new side
//! of a nested change.

use crate::layout::{generic, Layout, ATOM};
use crate::merged::{Mark, Marked, Merged, MergedNode};
use crate::span::{Rendered, Style};

const INDENT: &str = "    ";

/// Arrow between the old and new side when both fit on one line.
pub const INLINE_ARROW: &str = "->";
/// Separator line between a multi-line old and new side.
pub const BLOCK_ARROW: &str = "\u{2193}\u{2193}\u{2193}";

pub struct Printer<'l> {
    layout: &'l dyn Layout,
    out: Rendered,
    styles: Vec<Style>,
    indent: usize,
}

impl<'l> Printer<'l> {
    pub fn new(layout: &'l dyn Layout) -> Self {
        Self {
            layout,
            out: Rendered::new(),
            styles: Vec::new(),
            indent: 0,
        }
    }

    pub fn layout(&self) -> &'l dyn Layout {
        self.layout
    }

    pub fn finish(self) -> Rendered {
        self.out
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(Style::Plain)
    }

    /// Write text in the current style.
    pub fn write(&mut self, text: &str) {
        let style = self.style();
        self.out.push(text, style);
    }

    /// Start a new line at the current indentation.
    pub fn newline(&mut self) {
        let line = format!("\n{}", INDENT.repeat(self.indent));
        self.write(&line);
    }

    pub fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    pub fn styled(&mut self, style: Style, f: impl FnOnce(&mut Self)) {
        let style = match self.style() {
            Style::Removed => Style::Removed,
            _ => style,
        };
        self.styles.push(style);
        f(self);
        self.styles.pop();
    }

    pub fn marked(&mut self, mark: Mark, f: impl FnOnce(&mut Self)) {
        match mark {
            Mark::Plain => f(self),
            Mark::Inserted => self.styled(Style::Added, f),
            Mark::Deleted => self.styled(Style::Removed, f),
            Mark::Moved => self.styled(Style::Moved, f),
        }
    }

    /// Write a value with scalars in literal form.
    pub fn value(&mut self, value: &Merged) {
        self.emit(value, false);
    }

    /// Write a value with strings unquoted, for identifiers.
    pub fn ident_value(&mut self, value: &Merged) {
        self.emit(value, true);
    }

    fn emit(&mut self, value: &Merged, raw: bool) {
        match value {
            Merged::Scalar(dast_types::Scalar::Str(s)) if raw => self.write(s),
            Merged::Scalar(s) => self.write(&s.literal()),
            Merged::Node(node) => self.node(node),
            Merged::Seq(items) => {
                self.write("[");
                self.items(items, ", ");
                self.write("]");
            }
            Merged::Delta { old, new } => self.delta(old, new, raw),
        }
    }

    pub fn node(&mut self, node: &MergedNode) {
        match self.layout.handler(&node.kind) {
            Some(handler) => handler(self, node),
            None => generic(self, node),
        }
    }

    pub fn field(&mut self, node: &MergedNode, name: &str) {
        self.value(node.field(name));
    }

    pub fn ident(&mut self, node: &MergedNode, name: &str) {
        self.ident_value(node.field(name));
    }

    /// Write a value, parenthesised when it binds looser than `min`.
    pub fn operand(&mut self, value: &Merged, min: u8) {
        if self.precedence(value) < min {
            self.write("(");
            self.value(value);
            self.write(")");
        } else {
            self.value(value);
        }
    }

    /// Binding strength of a value as it reads in the after tree.
    pub fn precedence(&self, value: &Merged) -> u8 {
        match value.current() {
            Merged::Node(node) => self.layout.precedence(node),
            _ => ATOM,
        }
    }

    /// Write `prefix` and the field when it is present. A field that appears
    /// or disappears is shown whole as added or removed.
    pub fn optional(&mut self, node: &MergedNode, name: &str, prefix: &str) {
        self.optional_part(node.field(name), prefix, false);
    }

    pub fn optional_ident(&mut self, node: &MergedNode, name: &str, prefix: &str) {
        self.optional_part(node.field(name), prefix, true);
    }

    fn optional_part(&mut self, value: &Merged, prefix: &str, raw: bool) {
        let (mark, shown) = presence(value);
        if shown.is_none() {
            return;
        }
        self.marked(mark, |p| {
            p.write(prefix);
            p.emit(shown, raw);
        });
    }

    /// Write sequence elements separated by `sep`.
    pub fn items<'a>(&mut self, items: impl IntoIterator<Item = &'a Marked>, sep: &str) {
        let items: Vec<&Marked> = items.into_iter().collect();
        self.list(&items, |m| m.mark, |p| p.write(sep), |p, m| p.value(&m.value));
    }

    /// General inline list. A removed element carries the separator before
    /// it; a visible element preceded only by removed ones writes its
    /// separator as removed.
    pub fn list<T>(
        &mut self,
        items: &[T],
        mark: impl Fn(&T) -> Mark,
        sep: impl Fn(&mut Self),
        mut write: impl FnMut(&mut Self, &T),
    ) {
        let mut any = false;
        let mut visible = false;
        for item in items {
            let m = mark(item);
            if m == Mark::Deleted {
                self.styled(Style::Removed, |p| {
                    if any {
                        sep(p);
                    }
                    write(p, item);
                });
            } else {
                if any && !visible {
                    self.styled(Style::Removed, |p| sep(p));
                }
                self.marked(m, |p| {
                    if visible {
                        sep(p);
                    }
                    write(p, item);
                });
                visible = true;
            }
            any = true;
        }
    }

    /// Indented statement block: one line per element.
    pub fn body(&mut self, items: &[Marked]) {
        for item in items {
            self.marked(item.mark, |p| {
                p.newline();
                p.value(&item.value);
            });
        }
    }

    /// Top-level statements, each terminated by a newline.
    pub fn lines(&mut self, items: &[Marked]) {
        for item in items {
            self.marked(item.mark, |p| {
                p.value(&item.value);
                p.write("\n");
            });
        }
    }

    /// `header:` followed by an indented block.
    pub fn block(&mut self, items: &[Marked]) {
        self.write(":");
        self.indented(|p| p.body(items));
    }

    /// A trailing clause such as `else:` that is only present when its block
    /// is non-empty.
    pub fn clause(&mut self, keyword: &str, items: &[Marked]) {
        if items.is_empty() {
            return;
        }
        self.marked(group_mark(items), |p| {
            p.newline();
            p.write(keyword);
            p.block(items);
        });
    }

    fn delta(&mut self, old: &Merged, new: &Merged, raw: bool) {
        let old_text = self.sketch(old, raw);
        let new_text = self.sketch(new, raw);
        let inline = !old_text.contains('\n') && !new_text.contains('\n');

        self.styled(Style::Removed, |p| p.write(&old_text));
        self.styled(Style::Separator, |p| {
            if inline {
                p.write(INLINE_ARROW);
            } else {
                p.newline();
                p.write(BLOCK_ARROW);
                p.newline();
            }
        });
        self.styled(Style::Added, |p| p.write(&new_text));
    }

    /// Plain text of a value at the current indentation.
    fn sketch(&self, value: &Merged, raw: bool) -> String {
        let mut p = Printer {
            layout: self.layout,
            out: Rendered::new(),
            styles: Vec::new(),
            indent: self.indent,
        };
        p.emit(value, raw);
        p.out.plain_text()
    }
}

/// How an optional value is shown: a value that appears or disappears is a
/// whole insertion or deletion of its side.
pub fn presence(value: &Merged) -> (Mark, &Merged) {
    match value {
        Merged::Delta { old, new } if new.is_none() => (Mark::Deleted, old),
        Merged::Delta { old, new } if old.is_none() => (Mark::Inserted, new),
        other => (Mark::Plain, other),
    }
}

/// Mark for syntax that exists only while a group of elements is non-empty.
pub fn group_mark<'a>(items: impl IntoIterator<Item = &'a Marked>) -> Mark {
    let marks: Vec<Mark> = items.into_iter().map(|m| m.mark).collect();
    if marks.is_empty() {
        Mark::Plain
    } else if marks.iter().all(|m| *m == Mark::Deleted) {
        Mark::Deleted
    } else if marks.iter().all(|m| *m == Mark::Inserted) {
        Mark::Inserted
    } else {
        Mark::Plain
    }
}
