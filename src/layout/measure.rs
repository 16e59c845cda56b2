use super::{LayoutEngine, NodeDimensions};
use crate::error::LayoutError;
use crate::geometry::Size;
use crate::model::{FlowModel, Guid};
use ahash::{AHashMap, AHashSet};

/// Bottom-up footprint of one element, excluding its successors.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Footprint {
    pub node: NodeDimensions,
    pub width: f32,
    pub height: f32,
    /// One entry per branch for Decision and Wait, the body for a Loop.
    pub branches: Vec<Size>,
    /// Sum of the branch widths.
    pub row_width: f32,
    /// Height of the tallest branch.
    pub row_height: f32,
    /// Fault paths are measured but take no room in the footprint.
    pub fault: Option<Size>,
}

pub(super) struct Measurements {
    pub elements: AHashMap<Guid, Footprint>,
}

/// Measure pass. Footprints are memoised per element.
pub(super) struct Measurer<'a> {
    engine: &'a LayoutEngine,
    model: &'a FlowModel,
    cache: AHashMap<Guid, Footprint>,
    in_progress: AHashSet<Guid>,
}

impl<'a> Measurer<'a> {
    pub fn new(engine: &'a LayoutEngine, model: &'a FlowModel) -> Self {
        Self {
            engine,
            model,
            cache: AHashMap::new(),
            in_progress: AHashSet::new(),
        }
    }

    pub fn finish(self) -> Measurements {
        Measurements {
            elements: self.cache,
        }
    }

    /// Size of the chain starting at `head`, including the connector leaving its tail.
    /// An empty chain is a single connector of the empty-branch width.
    pub fn measure_chain(&mut self, head: Option<&str>) -> Result<Size, LayoutError> {
        let engine = self.engine;
        let model = self.model;
        let config = engine.config();
        let Some(head) = head else {
            return Ok(Size::new(config.empty_branch_width, config.connector_length));
        };

        let mut size = Size::default();
        let mut seen: AHashSet<&str> = AHashSet::new();
        let mut current = Some(head);

        while let Some(guid) = current {
            let Some(element) = model.get(guid) else {
                size.width = size.width.max(config.stub_width);
                size.height += config.stub_height + config.connector_length;
                break;
            };
            if !seen.insert(element.guid.as_str()) {
                return Err(LayoutError::CycleDetected {
                    guid: element.guid.clone(),
                });
            }

            let footprint = self.measure_element(&element.guid)?;
            size.width = size.width.max(footprint.width);
            size.height += footprint.height + config.connector_length;
            current = element.next.as_deref();
        }

        Ok(size)
    }

    fn measure_element(&mut self, guid: &str) -> Result<Footprint, LayoutError> {
        if let Some(cached) = self.cache.get(guid) {
            return Ok(cached.clone());
        }
        if !self.in_progress.insert(guid.to_string()) {
            return Err(LayoutError::CycleDetected {
                guid: guid.to_string(),
            });
        }

        let engine = self.engine;
        let model = self.model;
        let element = model.get_element(guid).map_err(|_| LayoutError::MissingRoot {
            root: guid.to_string(),
        })?;
        let config = engine.config();
        let node = engine.dimensions(element);

        let branches = element
            .children
            .iter()
            .map(|branch| self.measure_chain(branch.head.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;
        let row_width: f32 = branches.iter().map(|s| s.width).sum();
        let row_height = branches.iter().map(|s| s.height).fold(0.0, f32::max);

        let (width, height) = if element.element_type.is_loop() {
            (
                node.width.max(row_width) + 2.0 * config.loop_gutter,
                node.height + config.connector_length + row_height + config.loop_return_space,
            )
        } else if element.element_type.is_branching() && !branches.is_empty() {
            (
                node.width.max(row_width),
                node.height + config.branch_spacing + row_height + config.merge_spacing,
            )
        } else {
            (node.width, node.height)
        };

        let fault = match element.fault.as_deref() {
            Some(fault) => Some(self.measure_chain(Some(fault))?),
            None => None,
        };

        let footprint = Footprint {
            node,
            width,
            height,
            branches,
            row_width,
            row_height,
            fault,
        };
        self.in_progress.remove(guid);
        self.cache.insert(guid.to_string(), footprint.clone());
        Ok(footprint)
    }
}
