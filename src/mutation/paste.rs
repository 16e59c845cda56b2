use super::ids::{IdGenerator, fresh_id};
use super::{Anchor, anchor_target, set_anchor_target};
use crate::error::CommandError;
use crate::model::{Element, FlowModel, Guid};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A contiguous chain of elements, with everything nested under them, captured for pasting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopiedSubgraph {
    head: Guid,
    tail: Guid,
    /// Chain elements and their descendants, in depth-first order.
    elements: Vec<Element>,
}

impl CopiedSubgraph {
    /// Copies the chain from `top` down to `bottom`, both included.
    ///
    /// `bottom` must be reachable from `top` through `next` links. The copied tail loses
    /// its successor.
    pub fn copy(model: &FlowModel, top: &str, bottom: &str) -> Result<Self, CommandError> {
        let invalid = |reason: String| CommandError::InvalidSelection { reason };
        model.get_element(top)?;
        model.get_element(bottom)?;
        if model.root() == top {
            return Err(invalid(format!("the root element '{}' cannot be copied", top)));
        }

        let mut chain = Vec::new();
        for element in model.traverse_branch(top) {
            chain.push(element);
            if element.guid == bottom {
                break;
            }
        }
        if chain.last().map(|e| e.guid.as_str()) != Some(bottom) {
            return Err(invalid(format!(
                "'{}' does not follow '{}' on the same chain",
                bottom, top
            )));
        }

        let mut elements = Vec::new();
        for element in &chain {
            let mut copy = (*element).clone();
            if copy.guid == bottom {
                copy.next = None;
            }
            elements.push(copy);
            for guid in model.descendants(&element.guid) {
                elements.push(model.get_element(&guid)?.clone());
            }
        }

        Ok(Self {
            head: top.to_string(),
            tail: bottom.to_string(),
            elements,
        })
    }

    pub fn head(&self) -> &Guid {
        &self.head
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Inserts a fresh copy of the clipboard at `anchor`. Every guid is remapped, the head
/// takes the anchor's place and the tail continues to the anchor's previous target.
pub(super) fn paste(
    model: &mut FlowModel,
    clipboard: &CopiedSubgraph,
    anchor: &Anchor,
    ids: &mut dyn IdGenerator,
) -> Result<Vec<Guid>, CommandError> {
    if clipboard.is_empty() {
        return Err(CommandError::InvalidSelection {
            reason: "the clipboard is empty".to_string(),
        });
    }
    let target = anchor_target(model, anchor)?;

    let mut mapping: AHashMap<&str, Guid> = AHashMap::new();
    for element in &clipboard.elements {
        let id = fresh_id(ids, |id| {
            model.contains(id) || mapping.values().any(|taken| taken == id)
        });
        mapping.insert(element.guid.as_str(), id);
    }

    let remap = |guid: &str| -> Result<Guid, CommandError> {
        mapping
            .get(guid)
            .cloned()
            .ok_or_else(|| CommandError::InvalidSelection {
                reason: format!("copied elements reference '{}' outside the copy", guid),
            })
    };

    let mut pasted = Vec::with_capacity(clipboard.elements.len());
    for element in &clipboard.elements {
        let mut copy = element.clone();
        copy.guid = remap(&element.guid)?;
        copy.next = match element.next.as_deref() {
            Some(next) => Some(remap(next)?),
            None if element.guid == clipboard.tail => target.clone(),
            None => None,
        };
        for branch in &mut copy.children {
            if let Some(head) = branch.head.as_deref() {
                branch.head = Some(remap(head)?);
            }
        }
        if let Some(fault) = element.fault.as_deref() {
            copy.fault = Some(remap(fault)?);
        }
        pasted.push(copy);
    }

    let head = remap(&clipboard.head)?;
    let inserted: Vec<Guid> = pasted.iter().map(|e| e.guid.clone()).collect();
    for element in pasted {
        model.insert(element);
    }
    set_anchor_target(model, anchor, Some(head))?;
    Ok(inserted)
}
