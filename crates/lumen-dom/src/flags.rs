//! Per-node style invalidation state.

use bitflags::bitflags;
use strum_macros::Display;

/// How much style work a node has requested since the last recalc.
///
/// Ordered by strength: a node can only be raised to a stronger change
/// until the next style recalc clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Display)]
pub enum StyleChangeType {
    /// The node's computed style is up to date.
    #[default]
    NoStyleChange,
    /// Only this node's own style needs recomputing.
    LocalStyleChange,
    /// This node and every descendant must recompute their styles.
    SubtreeStyleChange,
    /// The node has no layout representation yet (never attached, or
    /// detached) and must go through attach.
    NeedsReattachStyleChange,
}

bitflags! {
    /// Boolean node state that is not part of the style change level.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Some flat-tree descendant needs style recalc.
        const CHILD_NEEDS_STYLE_RECALC = 1 << 0;
        /// The node is reachable from the document.
        const IS_CONNECTED = 1 << 1;
        /// The element is in the document's top layer.
        const IS_IN_TOP_LAYER = 1 << 2;
    }
}
