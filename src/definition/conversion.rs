use super::definition::FlowDefinition;
use crate::error::ConversionError;
use crate::model::{Branch, Element, ElementType, FlowModel};
use ahash::AHashMap;

/// A trait for custom data models that can be converted into a `FlowModel`.
///
/// This is the extension point for loaders: parse your own metadata format, then implement
/// this trait to hand the canvas engine its canonical graph.
///
/// # Example
///
/// ```rust,no_run
/// use flowcanvas::prelude::*;
/// use flowcanvas::error::ConversionError;
///
/// struct MyStep { id: String, kind: String, then: Option<String> }
/// struct MyFlow { steps: Vec<MyStep> }
///
/// impl IntoFlowModel for MyFlow {
///     fn into_flow_model(self) -> std::result::Result<FlowModel, ConversionError> {
///         let root = self.steps.first().map(|s| s.id.clone()).unwrap_or_default();
///         let elements = self
///             .steps
///             .into_iter()
///             .map(|s| ElementDefinition {
///                 guid: s.id,
///                 element_type: s.kind,
///                 next: s.then,
/// #               label: None, branches: None, fault: None, is_canvas_element: None,
///             })
///             .collect();
///         FlowDefinition { root, elements }.into_flow_model()
///     }
/// }
/// ```
pub trait IntoFlowModel {
    /// Consumes the object and converts it into a flow model.
    fn into_flow_model(self) -> Result<FlowModel, ConversionError>;
}

impl IntoFlowModel for FlowDefinition {
    fn into_flow_model(self) -> Result<FlowModel, ConversionError> {
        let mut elements: AHashMap<String, Element> = AHashMap::new();

        for def in self.elements {
            let element_type: ElementType =
                def.element_type
                    .parse()
                    .map_err(|type_name| ConversionError::UnknownElementType {
                        guid: def.guid.clone(),
                        type_name,
                    })?;

            let children = match def.branches {
                Some(branches) => branches
                    .into_iter()
                    .map(|b| Branch {
                        label: b.label,
                        head: b.head,
                        merging: true,
                    })
                    .collect(),
                None => element_type
                    .default_branch_labels()
                    .iter()
                    .map(|label| Branch::empty(*label))
                    .collect(),
            };

            let element = Element {
                label: def
                    .label
                    .unwrap_or_else(|| element_type.display_name().to_string()),
                next: def.next,
                children,
                fault: def.fault,
                is_canvas_element: def
                    .is_canvas_element
                    .unwrap_or_else(|| element_type.is_canvas_element()),
                element_type,
                guid: def.guid,
            };

            if elements.contains_key(&element.guid) {
                return Err(ConversionError::DuplicateGuid(element.guid));
            }
            elements.insert(element.guid.clone(), element);
        }

        if !elements.contains_key(&self.root) {
            return Err(ConversionError::MissingRoot(self.root));
        }

        Ok(FlowModel::from_parts(self.root, elements))
    }
}

impl FlowModel {
    /// Parses interchange JSON and converts it into a model. The result is not validated.
    pub fn from_json(json: &str) -> Result<FlowModel, ConversionError> {
        FlowDefinition::from_json(json)?.into_flow_model()
    }
}
