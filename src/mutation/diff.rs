use crate::model::{FlowModel, Guid};
use serde::Serialize;

/// Element level difference between two models, each list sorted by guid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StructuralDiff {
    pub added: Vec<Guid>,
    pub removed: Vec<Guid>,
    /// Present in both models with a different successor, branch, fault or label.
    pub modified: Vec<Guid>,
}

impl StructuralDiff {
    pub fn between(before: &FlowModel, after: &FlowModel) -> Self {
        let mut diff = StructuralDiff::default();

        for guid in after.sorted_guids() {
            match before.get(guid) {
                None => diff.added.push(guid.clone()),
                Some(old) if after.get(guid) != Some(old) => diff.modified.push(guid.clone()),
                Some(_) => {}
            }
        }
        diff.removed = before
            .sorted_guids()
            .into_iter()
            .filter(|guid| !after.contains(guid))
            .cloned()
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Every guid the diff mentions.
    pub fn touched(&self) -> impl Iterator<Item = &Guid> + '_ {
        self.added
            .iter()
            .chain(self.removed.iter())
            .chain(self.modified.iter())
    }
}
