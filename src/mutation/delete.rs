use super::redirect_predecessor;
use crate::error::CommandError;
use crate::model::{FlowModel, Guid};

/// Splices an element out of the flow, reconnecting its predecessor to whatever takes
/// its place.
///
/// For an element with branches, one branch may survive and takes the element's place.
/// If the surviving branch is ended, the element's continuation goes with the rest.
/// Naming a surviving branch on an element without branches is an error.
pub(super) fn delete_element(
    model: &mut FlowModel,
    guid: &str,
    keep_branch: Option<usize>,
) -> Result<Vec<Guid>, CommandError> {
    if model.root() == guid {
        return Err(CommandError::CannotDeleteRoot {
            guid: guid.to_string(),
        });
    }
    let element = model.get_element(guid)?.clone();

    let survivor = if element.element_type.has_children() {
        match keep_branch {
            Some(index) if index >= element.children.len() => {
                return Err(CommandError::InvalidResolution {
                    guid: guid.to_string(),
                    index,
                });
            }
            Some(index) => Some(index),
            None => {
                let non_empty = element.non_empty_branches();
                match non_empty.as_slice() {
                    [] => None,
                    [only] => Some(*only),
                    _ => {
                        return Err(CommandError::AmbiguousDelete {
                            guid: guid.to_string(),
                            non_empty_branches: non_empty,
                        });
                    }
                }
            }
        }
    } else if let Some(index) = keep_branch {
        return Err(CommandError::InvalidResolution {
            guid: guid.to_string(),
            index,
        });
    } else {
        None
    };

    let mut doomed: Vec<Guid> = Vec::new();
    for (index, branch) in element.children.iter().enumerate() {
        if Some(index) != survivor {
            if let Some(head) = branch.head.as_deref() {
                doomed.extend(model.subgraph(head));
            }
        }
    }
    if let Some(fault) = element.fault.as_deref() {
        doomed.extend(model.subgraph(fault));
    }

    let surviving_head = survivor.and_then(|index| element.children[index].head.clone());
    let replacement = match surviving_head {
        Some(head) => {
            if model.is_chain_ended(Some(&head)) {
                if let Some(next) = element.next.as_deref() {
                    doomed.extend(model.subgraph(next));
                }
            } else if let Some(tail) = model.chain_tail(&head).map(|t| t.guid.clone()) {
                model.get_mut(&tail)?.next = element.next.clone();
            }
            Some(head)
        }
        None => element.next.clone(),
    };

    redirect_predecessor(model, guid, replacement)?;
    model.remove(guid);
    for doomed_guid in &doomed {
        model.remove(doomed_guid);
    }

    let mut removed = vec![guid.to_string()];
    removed.extend(doomed);
    Ok(removed)
}
