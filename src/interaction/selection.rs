use crate::error::CommandError;
use crate::model::{ElementType, FlowModel, Guid, LinkKind};
use std::collections::BTreeSet;

/// The set of selected elements. Owned by a single `InteractionState`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<Guid>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects an element. Start and End elements are never selectable.
    pub fn select(&mut self, model: &FlowModel, guid: &str) -> Result<bool, CommandError> {
        let element = model.get_element(guid)?;
        if matches!(element.element_type, ElementType::Start | ElementType::End)
            || !element.is_canvas_element
        {
            return Err(CommandError::InvalidSelection {
                reason: format!("{} elements cannot be selected", element.element_type),
            });
        }
        Ok(self.selected.insert(guid.to_string()))
    }

    /// Removes an element from the selection. Deselecting twice is a no-op.
    pub fn deselect(&mut self, guid: &str) -> bool {
        self.selected.remove(guid)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.selected.contains(guid)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Guid> + '_ {
        self.selected.iter()
    }

    /// Drops selected guids that no longer exist in `model`.
    pub fn retain_existing(&mut self, model: &FlowModel) {
        self.selected.retain(|guid| model.contains(guid));
    }

    /// The first and last element of the selection when it forms one contiguous chain.
    pub fn contiguous_range(&self, model: &FlowModel) -> Result<(Guid, Guid), CommandError> {
        let invalid = |reason: &str| CommandError::InvalidSelection {
            reason: reason.to_string(),
        };
        if self.selected.is_empty() {
            return Err(invalid("nothing is selected"));
        }

        let relations = model.relations();
        let tops: Vec<&Guid> = self
            .selected
            .iter()
            .filter(|guid| {
                !matches!(
                    relations.incoming(guid),
                    Some(link) if link.kind == LinkKind::Next && self.selected.contains(&link.from)
                )
            })
            .collect();
        let [top] = tops.as_slice() else {
            return Err(invalid("the selected elements do not form a single chain"));
        };

        let mut bottom = (*top).clone();
        let mut count = 0;
        for element in model.traverse_branch(top) {
            if !self.selected.contains(&element.guid) {
                break;
            }
            bottom = element.guid.clone();
            count += 1;
        }
        if count != self.selected.len() {
            return Err(invalid("the selected elements do not form a single chain"));
        }
        Ok(((*top).clone(), bottom))
    }
}
