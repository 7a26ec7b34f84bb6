//! Renderer for dast.
//!
//! Folds a change set back into a copy of the after tree, with deletions
//! re-inserted where they were, then prints the merged tree as source text
//! with every change styled in place.
//!
//! # Key Types
//!
//! - [`Merged`] / [`Mark`] -- The annotated tree built by [`merge`]
//! - [`Printer`] / [`Layout`] -- Depth-first printing through a kind-to-handler table
//! - [`Rendered`] -- Styled spans with ANSI, marker and plain sinks

pub mod error;
pub mod layout;
pub mod merge;
pub mod merged;
pub mod options;
pub mod printer;
pub mod python;
pub mod span;
pub mod summary;

pub use error::{RenderError, RenderResult};
pub use layout::{GenericLayout, Handler, Layout};
pub use merge::merge;
pub use merged::{Mark, Marked, Merged, MergedNode};
pub use options::RenderOptions;
pub use printer::Printer;
pub use python::PythonLayout;
pub use span::{Rendered, Span, Style};
pub use summary::{describe, summarize};

use tracing::debug;

use dast_diff::ChangeSet;
use dast_types::Value;

/// Render the changes between `before` and `after` as styled source text.
///
/// Dropping the removed spans and arrows of the result gives exactly
/// [`unparse`] of `after`.
pub fn render(
    changes: &ChangeSet,
    before: &Value,
    after: &Value,
    layout: &dyn Layout,
    options: &RenderOptions,
) -> RenderResult<Rendered> {
    let merged = merge(changes, before, after, options)?;
    let mut printer = Printer::new(layout);
    printer.value(&merged);
    let rendered = printer.finish();
    debug!(
        records = changes.len(),
        spans = rendered.spans().len(),
        "change set rendered"
    );
    Ok(rendered)
}

/// Canonical text of a tree, without any markup.
pub fn unparse(value: &Value, layout: &dyn Layout) -> String {
    let mut printer = Printer::new(layout);
    printer.value(&Merged::lift(value));
    printer.finish().plain_text()
}
