//! Mutation observation: options, records, and per-observer queues.

use crate::document::NodeId;

/// Handle addressing one registered observer.
pub type ObserverId = u64;

/// What an observer wants delivered, mirroring `MutationObserverInit`.
/// An empty `attribute_filter` with `attributes` set means all attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    pub attribute_filter: Vec<String>,
    pub character_data: bool,
}

/// One observed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attribute {
        name: String,
    },
    CharacterData,
}

#[derive(Debug)]
pub(crate) struct ObserverSlot {
    pub(crate) id: ObserverId,
    pub(crate) target: NodeId,
    pub(crate) options: ObserveOptions,
    pub(crate) queue: Vec<MutationRecord>,
}

impl ObserverSlot {
    /// Kind gate only; scoping against the target is the document's job
    /// because it needs the tree.
    pub(crate) fn wants(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList { .. } => self.options.child_list,
            MutationKind::Attribute { name } => {
                self.options.attributes
                    && (self.options.attribute_filter.is_empty()
                        || self.options.attribute_filter.iter().any(|f| f == name))
            }
            MutationKind::CharacterData => self.options.character_data,
        }
    }
}
