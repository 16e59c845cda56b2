//! Deterministic layout of a flow model into a render tree.
//!
//! Layout runs in two passes. The measure pass computes the footprint of every element
//! and chain bottom-up. The place pass walks the model top-down from the root and assigns
//! absolute coordinates from the parent origin and cumulative sibling offsets.

use crate::error::LayoutError;
use crate::geometry::{ConnectorStyle, MenuPadding};
use crate::interaction::CanvasMode;
use crate::model::{Element, ElementType, FlowModel};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

mod measure;
mod place;
pub mod render;
pub mod sizing;

use measure::Measurer;
use place::Placer;
pub use render::*;
pub use sizing::{NodeDimensions, SizingFn, default_sizing};

/// Spacing constants of the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical gap between two consecutive elements of a chain.
    pub connector_length: f32,
    /// Vertical gap between a branching element and its branch row.
    pub branch_spacing: f32,
    /// Vertical gap between the lowest branch and the merge point.
    pub merge_spacing: f32,
    pub empty_branch_width: f32,
    pub stub_width: f32,
    pub stub_height: f32,
    pub fault_offset_x: f32,
    pub fault_offset_y: f32,
    /// Horizontal room on each side of a loop body, holding the loop-back and after-last lanes.
    pub loop_gutter: f32,
    /// Vertical room below a loop body for its return connectors.
    pub loop_return_space: f32,
    pub connector: ConnectorStyle,
    pub menu_padding: MenuPadding,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            connector_length: 48.0,
            branch_spacing: 48.0,
            merge_spacing: 48.0,
            empty_branch_width: 160.0,
            stub_width: 48.0,
            stub_height: 48.0,
            fault_offset_x: 48.0,
            fault_offset_y: 24.0,
            loop_gutter: 48.0,
            loop_return_space: 48.0,
            connector: ConnectorStyle::default(),
            menu_padding: MenuPadding::default(),
        }
    }
}

/// Computes render trees. Holds the spacing config and the sizing dispatch table.
pub struct LayoutEngine {
    config: LayoutConfig,
    sizers: AHashMap<ElementType, SizingFn>,
}

pub struct LayoutEngineBuilder {
    config: LayoutConfig,
    sizers: AHashMap<ElementType, SizingFn>,
}

impl LayoutEngineBuilder {
    pub fn new(config: LayoutConfig) -> Self {
        let mut sizers = AHashMap::new();
        sizing::register_default_sizers(&mut sizers);
        Self { config, sizers }
    }

    /// Replaces the sizing function of one element type.
    pub fn with_sizing(mut self, element_type: ElementType, sizing: SizingFn) -> Self {
        self.sizers.insert(element_type, sizing);
        self
    }

    pub fn build(self) -> LayoutEngine {
        LayoutEngine {
            config: self.config,
            sizers: self.sizers,
        }
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        LayoutEngine::builder(LayoutConfig::default()).build()
    }
}

impl LayoutEngine {
    pub fn builder(config: LayoutConfig) -> LayoutEngineBuilder {
        LayoutEngineBuilder::new(config)
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub(crate) fn dimensions(&self, element: &Element) -> NodeDimensions {
        let sizing = self
            .sizers
            .get(&element.element_type)
            .copied()
            .unwrap_or_else(|| default_sizing(element.element_type));
        sizing(element, &self.config)
    }

    /// Lays out the whole model.
    ///
    /// A branch head, successor or fault path that references a missing element is drawn
    /// as a stub and reported in `RenderTree::violations`. A missing root or a cycle is a
    /// precondition failure.
    pub fn compute_layout(
        &self,
        model: &FlowModel,
        mode: CanvasMode,
    ) -> Result<RenderTree, LayoutError> {
        let root = model.root();
        if !model.contains(root) {
            return Err(LayoutError::MissingRoot { root: root.clone() });
        }

        let mut measurer = Measurer::new(self, model);
        let root_size = measurer.measure_chain(Some(root.as_str()))?;
        let measurements = measurer.finish();
        log::trace!(
            "Measured {} elements, root chain {}x{}",
            measurements.elements.len(),
            root_size.width,
            root_size.height
        );

        let mut placer = Placer::new(self, model, &measurements, mode);
        let flow = placer.place_root(root, root_size);
        let violations = placer.finish();
        for violation in &violations {
            log::warn!("Layout fell back to a stub: {}", violation);
        }

        let tree = RenderTree::new(LayoutSource::of(model), flow, mode, violations);
        log::trace!(
            "Layout placed {} nodes within {}x{}",
            tree.nodes().len(),
            tree.bounds.width,
            tree.bounds.height
        );
        Ok(tree)
    }
}

/// Lays out `model` with the default configuration.
pub fn compute_layout(model: &FlowModel, mode: CanvasMode) -> Result<RenderTree, LayoutError> {
    LayoutEngine::default().compute_layout(model, mode)
}
