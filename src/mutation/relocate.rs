use super::{Anchor, anchor_target, redirect_predecessor, set_anchor_target};
use crate::error::CommandError;
use crate::model::FlowModel;

/// Moves an element, with its branches and fault path, to another anchor.
pub(super) fn move_element(
    model: &mut FlowModel,
    guid: &str,
    anchor: &Anchor,
) -> Result<(), CommandError> {
    if model.root() == guid {
        return Err(CommandError::CannotMoveRoot);
    }
    let next = model.get_element(guid)?.next.clone();

    let owner = anchor.owner();
    if owner == guid || model.descendants(guid).iter().any(|d| d == owner) {
        return Err(CommandError::InvalidAnchor {
            anchor: anchor.to_string(),
            reason: format!("the anchor lies inside '{}'", guid),
        });
    }
    // Fails early on anchors that do not exist before anything is rewired.
    anchor_target(model, anchor)?;

    redirect_predecessor(model, guid, next)?;
    model.get_mut(guid)?.next = None;

    let target = anchor_target(model, anchor)?;
    model.get_mut(guid)?.next = target;
    set_anchor_target(model, anchor, Some(guid.to_string()))
}
