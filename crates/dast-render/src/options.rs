use serde::{Deserialize, Serialize};

/// Presentation switches for [`render`](crate::render).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Highlight elements that only moved within their sequence.
    pub show_moves: bool,
}
