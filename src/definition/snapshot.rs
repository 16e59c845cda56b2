use crate::error::HistoryError;
use crate::model::{Element, FlowModel, Guid};
use ahash::AHashMap;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};

/// Compact binary image of a `FlowModel`, elements sorted by guid so equal models encode
/// to equal bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub root: Guid,
    pub elements: Vec<Element>,
}

impl FlowSnapshot {
    pub fn from_model(model: &FlowModel) -> Self {
        Self {
            root: model.root().clone(),
            elements: model
                .sorted_guids()
                .into_iter()
                .filter_map(|guid| model.get(guid).cloned())
                .collect(),
        }
    }

    pub fn into_model(self) -> FlowModel {
        let elements: AHashMap<Guid, Element> = self
            .elements
            .into_iter()
            .map(|element| (element.guid.clone(), element))
            .collect();
        FlowModel::from_parts(self.root, elements)
    }

    /// Serializes the snapshot using the bincode format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, HistoryError> {
        encode_to_vec(self, standard())
            .map_err(|e| HistoryError::Snapshot(format!("Serialization failed: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HistoryError> {
        decode_from_slice(bytes, standard())
            .map(|(snapshot, _)| snapshot)
            .map_err(|e| HistoryError::Snapshot(format!("Deserialization failed: {}", e)))
    }
}
