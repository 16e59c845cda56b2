use crate::model::{ElementType, FlowModel};
use serde::{Deserialize, Serialize};

/// Interchange form of a flow, as produced by a loader after metadata parsing.
/// This is the target structure for any custom data model conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub root: String,
    pub elements: Vec<ElementDefinition>,
}

/// Defines a single element of the flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    pub guid: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// `None` gives the element the default branches of its type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<BranchDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_canvas_element: Option<bool>,
}

/// Defines one branch of a decision, wait or loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchDefinition {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
}

impl ElementDefinition {
    pub fn new(guid: &str, element_type: ElementType) -> Self {
        Self {
            guid: guid.to_string(),
            element_type: element_type.to_string(),
            label: None,
            next: None,
            branches: None,
            fault: None,
            is_canvas_element: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_next(mut self, next: &str) -> Self {
        self.next = Some(next.to_string());
        self
    }

    pub fn with_fault(mut self, fault: &str) -> Self {
        self.fault = Some(fault.to_string());
        self
    }

    /// Sets the branches as `(label, head)` pairs in order.
    pub fn with_branches(mut self, branches: &[(&str, Option<&str>)]) -> Self {
        self.branches = Some(
            branches
                .iter()
                .map(|(label, head)| BranchDefinition {
                    label: label.to_string(),
                    head: head.map(str::to_string),
                })
                .collect(),
        );
        self
    }
}

impl FlowDefinition {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Captures a model in interchange form, elements sorted by guid.
    pub fn from_model(model: &FlowModel) -> Self {
        let elements = model
            .sorted_guids()
            .into_iter()
            .filter_map(|guid| model.get(guid))
            .map(|element| ElementDefinition {
                guid: element.guid.clone(),
                element_type: element.element_type.to_string(),
                label: Some(element.label.clone()),
                next: element.next.clone(),
                branches: element.element_type.has_children().then(|| {
                    element
                        .children
                        .iter()
                        .map(|b| BranchDefinition {
                            label: b.label.clone(),
                            head: b.head.clone(),
                        })
                        .collect()
                }),
                fault: element.fault.clone(),
                is_canvas_element: (element.is_canvas_element
                    != element.element_type.is_canvas_element())
                .then_some(element.is_canvas_element),
            })
            .collect();

        Self {
            root: model.root().clone(),
            elements,
        }
    }
}
