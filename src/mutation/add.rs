use super::ids::{IdGenerator, fresh_id};
use super::{Anchor, anchor_target, set_anchor_target};
use crate::error::CommandError;
use crate::model::{Element, ElementType, FlowModel, Guid};

/// Inserts a new element at `anchor`. The new element takes over the anchor's previous
/// target as its `next`.
pub(super) fn add_element(
    model: &mut FlowModel,
    anchor: &Anchor,
    element_type: ElementType,
    label: Option<&str>,
    ids: &mut dyn IdGenerator,
) -> Result<Guid, CommandError> {
    let invalid = |reason: &str| CommandError::InvalidAnchor {
        anchor: anchor.to_string(),
        reason: reason.to_string(),
    };
    if element_type == ElementType::Start {
        return Err(invalid("a flow has exactly one Start element"));
    }
    if !element_type.is_canvas_element() {
        return Err(invalid("resources are not placed on the canvas"));
    }

    let target = anchor_target(model, anchor)?;
    if element_type.is_terminal() && target.is_some() {
        return Err(invalid("an End element cannot be followed by other elements"));
    }

    let guid = fresh_id(ids, |id| model.contains(id));
    let mut element = Element::new(
        guid.clone(),
        element_type,
        label.unwrap_or_else(|| element_type.display_name()),
    );
    element.next = target;

    set_anchor_target(model, anchor, Some(guid.clone()))?;
    model.insert(element);
    Ok(guid)
}
