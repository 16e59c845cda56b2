//! Structural mutation engine.
//!
//! Every command takes the current model by reference and produces a new model plus a
//! structural diff. A command that fails, or whose result would not pass
//! `validate_graph`, returns a `CommandError` and the input model stays as it was.

use crate::error::CommandError;
use crate::model::{ElementType, FlowModel, Guid, LinkKind, validate_graph};
use serde::{Deserialize, Serialize};
use std::fmt;

mod add;
mod delete;
pub mod diff;
pub mod ids;
mod merge;
pub mod paste;
mod relocate;

pub use diff::StructuralDiff;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use merge::can_merge_ended_branch;
pub use paste::CopiedSubgraph;

/// Insertion point of a structural edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Anchor {
    /// Directly after an element, before its current successor.
    After { guid: Guid },
    /// At the head of branch `index` of a Decision, Wait or Loop.
    Branch { parent: Guid, index: usize },
    /// As the fault path of an element.
    Fault { guid: Guid },
}

impl Anchor {
    pub fn after(guid: &str) -> Self {
        Anchor::After {
            guid: guid.to_string(),
        }
    }

    pub fn branch(parent: &str, index: usize) -> Self {
        Anchor::Branch {
            parent: parent.to_string(),
            index,
        }
    }

    pub fn fault(guid: &str) -> Self {
        Anchor::Fault {
            guid: guid.to_string(),
        }
    }

    /// The element the anchor hangs off.
    pub fn owner(&self) -> &Guid {
        match self {
            Anchor::After { guid } | Anchor::Fault { guid } => guid,
            Anchor::Branch { parent, .. } => parent,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::After { guid } => write!(f, "after '{}'", guid),
            Anchor::Branch { parent, index } => write!(f, "branch {} of '{}'", index, parent),
            Anchor::Fault { guid } => write!(f, "fault of '{}'", guid),
        }
    }
}

/// A structural edit of the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddElement {
        anchor: Anchor,
        element_type: ElementType,
        label: Option<String>,
    },
    /// Removes an element. Branching elements with more than one non-empty branch need
    /// `keep_branch` to name the branch that survives.
    DeleteElement {
        guid: Guid,
        keep_branch: Option<usize>,
    },
    MoveElement {
        guid: Guid,
        anchor: Anchor,
    },
    /// Removes the `End` terminating a branch so the branch reconverges.
    MergeBranch {
        parent: Guid,
        index: usize,
    },
    /// Same as `MergeBranch`, addressed through the `End` element itself.
    Reconnect {
        end: Guid,
    },
    Paste {
        clipboard: CopiedSubgraph,
        anchor: Anchor,
    },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AddElement {
                anchor,
                element_type,
                ..
            } => write!(f, "AddElement({} {})", element_type, anchor),
            Command::DeleteElement { guid, keep_branch } => match keep_branch {
                Some(index) => write!(f, "DeleteElement('{}', keep {})", guid, index),
                None => write!(f, "DeleteElement('{}')", guid),
            },
            Command::MoveElement { guid, anchor } => {
                write!(f, "MoveElement('{}' {})", guid, anchor)
            }
            Command::MergeBranch { parent, index } => {
                write!(f, "MergeBranch('{}', {})", parent, index)
            }
            Command::Reconnect { end } => write!(f, "Reconnect('{}')", end),
            Command::Paste { clipboard, anchor } => {
                write!(f, "Paste({} elements {})", clipboard.len(), anchor)
            }
        }
    }
}

/// Result of an accepted command.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub model: FlowModel,
    pub diff: StructuralDiff,
    /// Guids created by the command, head first.
    pub inserted: Vec<Guid>,
}

/// Applies commands, allocating guids for new elements through its `IdGenerator`.
pub struct MutationEngine {
    ids: Box<dyn IdGenerator>,
}

impl Default for MutationEngine {
    fn default() -> Self {
        Self::new(Box::new(SequentialIds::default()))
    }
}

impl MutationEngine {
    pub fn new(ids: Box<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// Applies one command to `model`. `model` itself is never modified.
    pub fn apply(&mut self, model: &FlowModel, command: &Command) -> Result<Mutation, CommandError> {
        log::debug!("Applying {}", command);
        let mut next = model.clone();

        let inserted = match command {
            Command::AddElement {
                anchor,
                element_type,
                label,
            } => {
                let guid = add::add_element(
                    &mut next,
                    anchor,
                    *element_type,
                    label.as_deref(),
                    self.ids.as_mut(),
                )?;
                vec![guid]
            }
            Command::DeleteElement { guid, keep_branch } => {
                delete::delete_element(&mut next, guid, *keep_branch)?;
                Vec::new()
            }
            Command::MoveElement { guid, anchor } => {
                relocate::move_element(&mut next, guid, anchor)?;
                Vec::new()
            }
            Command::MergeBranch { parent, index } => {
                merge::merge_branch(&mut next, parent, *index)?;
                Vec::new()
            }
            Command::Reconnect { end } => {
                merge::reconnect(&mut next, end)?;
                Vec::new()
            }
            Command::Paste { clipboard, anchor } => {
                paste::paste(&mut next, clipboard, anchor, self.ids.as_mut())?
            }
        };

        next.refresh_merge_state();
        let violations = validate_graph(&next);
        if !violations.is_empty() {
            log::warn!(
                "Rejected {}: result has {} violations",
                command,
                violations.len()
            );
            return Err(CommandError::InvalidResult { violations });
        }

        let diff = StructuralDiff::between(model, &next);
        log::debug!(
            "Accepted {}: +{} -{} ~{}",
            command,
            diff.added.len(),
            diff.removed.len(),
            diff.modified.len()
        );
        Ok(Mutation {
            model: next,
            diff,
            inserted,
        })
    }
}

/// The element the anchor currently leads to. Checks that the anchor can take an insertion.
pub(crate) fn anchor_target(
    model: &FlowModel,
    anchor: &Anchor,
) -> Result<Option<Guid>, CommandError> {
    let invalid = |reason: &str| CommandError::InvalidAnchor {
        anchor: anchor.to_string(),
        reason: reason.to_string(),
    };
    let owner = model
        .get(anchor.owner())
        .ok_or_else(|| invalid("the element does not exist"))?;
    if !owner.is_canvas_element {
        return Err(invalid("the element is not on the canvas"));
    }

    match anchor {
        Anchor::After { .. } => {
            if owner.element_type.is_terminal() {
                return Err(invalid("an End element has no successor"));
            }
            Ok(owner.next.clone())
        }
        Anchor::Branch { index, .. } => {
            if !owner.element_type.has_children() {
                return Err(invalid("the element has no branches"));
            }
            owner
                .children
                .get(*index)
                .map(|branch| branch.head.clone())
                .ok_or_else(|| invalid("the branch does not exist"))
        }
        Anchor::Fault { guid } => {
            if !owner.element_type.supports_fault() {
                return Err(CommandError::FaultNotSupported {
                    guid: guid.clone(),
                    element_type: owner.element_type,
                });
            }
            if owner.fault.is_some() {
                return Err(CommandError::AlreadyHasFault { guid: guid.clone() });
            }
            Ok(None)
        }
    }
}

/// Points the anchor's link at `target`.
pub(crate) fn set_anchor_target(
    model: &mut FlowModel,
    anchor: &Anchor,
    target: Option<Guid>,
) -> Result<(), CommandError> {
    let owner = model.get_mut(anchor.owner())?;
    match anchor {
        Anchor::After { .. } => owner.next = target,
        Anchor::Branch { index, .. } => {
            if let Some(branch) = owner.children.get_mut(*index) {
                branch.head = target;
            }
        }
        Anchor::Fault { .. } => owner.fault = target,
    }
    Ok(())
}

/// Points whatever references `guid` at `replacement` instead.
pub(crate) fn redirect_predecessor(
    model: &mut FlowModel,
    guid: &str,
    replacement: Option<Guid>,
) -> Result<(), CommandError> {
    let Some(link) = model.relations().incoming(guid).cloned() else {
        return Ok(());
    };
    let anchor = match link.kind {
        LinkKind::Next => Anchor::After { guid: link.from },
        LinkKind::Branch(index) => Anchor::Branch {
            parent: link.from,
            index,
        },
        LinkKind::Fault => Anchor::Fault { guid: link.from },
    };
    set_anchor_target(model, &anchor, replacement)
}
