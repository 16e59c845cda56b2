use super::redirect_predecessor;
use crate::error::{CommandError, MergeRefusal};
use crate::model::{ElementType, FlowModel};

/// Checks whether branch `index` of `parent` may be merged back into the parent's merge
/// point by removing the `End` that terminates it.
///
/// The merge is refused when the parent still carries a continuation that no branch
/// reaches: merging would silently revive it as a second, diverging path. A validated
/// model never has such a continuation (`Violation::DeadContinuation`), so this only
/// fires on models loaded without validation.
pub fn can_merge_ended_branch(
    model: &FlowModel,
    parent: &str,
    index: usize,
) -> Result<(), MergeRefusal> {
    let element = model
        .get(parent)
        .filter(|e| e.element_type.is_branching())
        .ok_or(MergeRefusal::NotBranching)?;
    let branch = element
        .children
        .get(index)
        .ok_or(MergeRefusal::BranchOutOfRange)?;

    let ends_in_end = branch
        .head
        .as_deref()
        .and_then(|head| model.chain_tail(head))
        .is_some_and(|tail| tail.element_type == ElementType::End);
    if !ends_in_end {
        return Err(MergeRefusal::BranchNotEnded);
    }

    if let Some(continuation) = &element.next {
        if element.children.iter().all(|b| !b.merging) {
            return Err(MergeRefusal::ContinuationConflict {
                continuation: continuation.clone(),
            });
        }
    }
    Ok(())
}

pub(super) fn merge_branch(
    model: &mut FlowModel,
    parent: &str,
    index: usize,
) -> Result<(), CommandError> {
    can_merge_ended_branch(model, parent, index).map_err(|reason| {
        CommandError::MergeRefused {
            parent: parent.to_string(),
            index,
            reason,
        }
    })?;

    let end = model
        .get_element(parent)?
        .children
        .get(index)
        .and_then(|b| b.head.as_deref())
        .and_then(|head| model.chain_tail(head))
        .map(|tail| tail.guid.clone())
        .ok_or_else(|| CommandError::InvalidSelection {
            reason: format!("branch {} of '{}' has no End element", index, parent),
        })?;

    redirect_predecessor(model, &end, None)?;
    model.remove(&end);
    Ok(())
}

/// Merges the branch terminated by the given `End` element.
pub(super) fn reconnect(model: &mut FlowModel, end: &str) -> Result<(), CommandError> {
    let element = model.get_element(end)?;
    if element.element_type != ElementType::End {
        return Err(CommandError::InvalidSelection {
            reason: format!("'{}' is not an End element", end),
        });
    }
    let (parent, index) = model
        .relations()
        .enclosing_branch(end)
        .ok_or_else(|| CommandError::InvalidSelection {
            reason: format!("End element '{}' does not terminate a branch", end),
        })?;
    merge_branch(model, &parent, index)
}
