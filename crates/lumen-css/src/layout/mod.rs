//! Layout tree and layout tree construction
//!
//! [§ 9 Visual formatting model](https://www.w3.org/TR/CSS2/visuren.html)
//!
//! "In the visual formatting model, each element in the document tree
//! generates zero or more boxes according to the box model."
//!
//! - [`tree`]: the arena of layout objects, style-change hooks and dumps.
//! - [`traversal`]: where a node's box goes in the layout tree.
//! - `builder`: attaching and detaching DOM nodes to and from the layout tree.

mod builder;
pub mod traversal;
pub mod tree;

pub use tree::{
    LayoutFlags, LayoutId, LayoutObject, LayoutObjectKind, LayoutSnapshot, LayoutText,
    LayoutTree, StyleDifference,
};
