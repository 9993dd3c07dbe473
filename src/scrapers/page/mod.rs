//! Tree-node view of a loaded results page.
//!
//! The locator, resolver and field strategies only see these traits, so they
//! run the same against a live browser snapshot or an HTML fixture.

mod snapshot;
mod text;

pub use snapshot::{DomNode, PageSnapshot};
pub use text::non_empty_lines;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}

/// A single element of the page.
pub trait PageNode: Clone {
    /// Lowercase tag name, e.g. `a` or `div`.
    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    /// Rendered text, one line per block-level element.
    fn text(&self) -> String;

    /// Unrendered inner markup, including scripts and hidden nodes.
    fn markup(&self) -> String;

    /// Parent element, or `None` at the document root.
    fn parent(&self) -> Option<Self>;

    /// Descendants matching a CSS selector, in document order.
    fn children_matching(&self, selector: &str) -> Result<Vec<Self>, PageError>;

    /// Whether two handles refer to the same element.
    fn same_node(&self, other: &Self) -> bool;

    /// Rendered text split into trimmed, non-empty lines.
    fn lines(&self) -> Vec<String> {
        non_empty_lines(&self.text())
    }

    /// Whether any proper ancestor of this element is one of `others`.
    fn is_inside(&self, others: &[Self]) -> bool {
        std::iter::successors(self.parent(), |node| node.parent())
            .any(|ancestor| others.iter().any(|other| other.same_node(&ancestor)))
    }
}

/// A whole page that can be queried from the root.
pub trait PageTree {
    type Node<'a>: PageNode
    where
        Self: 'a;

    /// All elements matching a CSS selector, in document order.
    fn select_all(&self, selector: &str) -> Result<Vec<Self::Node<'_>>, PageError>;
}
