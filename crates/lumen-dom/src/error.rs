//! DOM mutation errors.

use thiserror::Error;

use crate::NodeId;

/// [§ 4.2.3 Mutation algorithms](https://dom.spec.whatwg.org/#mutation-algorithms)
///
/// Errors thrown by the pre-insertion validity checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// "HierarchyRequestError": the insertion would produce an invalid tree.
    #[error("hierarchy request error: cannot insert {node:?} into {parent:?}: {reason}")]
    HierarchyRequest {
        /// The would-be parent.
        parent: NodeId,
        /// The node being inserted.
        node: NodeId,
        /// Which validity rule failed.
        reason: &'static str,
    },
    /// "NotFoundError": the reference child is not a child of the parent.
    #[error("not found error: {child:?} is not a child of {parent:?}")]
    NotFound {
        /// The parent that was searched.
        parent: NodeId,
        /// The reference child that was not found.
        child: NodeId,
    },
}
