use crate::geometry::{
    ConnectorKind, ConnectorPath, MenuPadding, MenuStyle, Point, Rect, menu_style_from_geometry,
};
use crate::interaction::{CanvasMode, InteractionState};
use crate::model::{ElementType, FlowModel, Guid, Violation};
use crate::mutation::Anchor;
use ahash::RandomState;
use serde::Serialize;
use std::hash::{BuildHasher, Hash, Hasher};

/// Derived geometry of a whole flow. Rebuilt on every structural change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTree {
    pub source: LayoutSource,
    pub flow: FlowRender,
    pub bounds: Rect,
    pub mode: CanvasMode,
    /// Missing references that were drawn as stubs.
    pub violations: Vec<Violation>,
}

/// Identifies the model a render tree was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSource {
    pub root: Guid,
    pub element_count: usize,
    /// Hash of every element's guid, type, label and links.
    pub fingerprint: u64,
}

impl LayoutSource {
    pub fn of(model: &FlowModel) -> Self {
        let mut hasher = RandomState::with_seeds(0x5eed, 0xf10, 0xca7, 0x7eee).build_hasher();
        for guid in model.sorted_guids() {
            let Some(element) = model.get(guid) else {
                continue;
            };
            element.guid.hash(&mut hasher);
            element.element_type.hash(&mut hasher);
            element.label.hash(&mut hasher);
            element.next.hash(&mut hasher);
            element.fault.hash(&mut hasher);
            for branch in &element.children {
                branch.label.hash(&mut hasher);
                branch.head.hash(&mut hasher);
                branch.merging.hash(&mut hasher);
            }
        }
        Self {
            root: model.root().clone(),
            element_count: model.len(),
            fingerprint: hasher.finish(),
        }
    }
}

/// A vertically stacked chain of nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRender {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<RenderNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub guid: Guid,
    /// `None` for stubs standing in for a missing element.
    pub element_type: Option<ElementType>,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub connectors: Vec<ConnectorRender>,
    pub children: Vec<BranchRender>,
    pub fault: Option<FlowRender>,
    pub stub: bool,
    pub selectable: bool,
    pub reconnectable: bool,
    pub selected: bool,
    pub menu_open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRender {
    pub index: usize,
    pub label: String,
    /// Horizontal offset from the left edge of the branch row.
    pub offset: f32,
    pub width: f32,
    pub merging: bool,
    pub flow: FlowRender,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorRender {
    pub kind: ConnectorKind,
    pub source: Guid,
    /// `None` when the connector ends in an insertion stub or a merge point.
    pub target: Option<Guid>,
    pub path: ConnectorPath,
    /// Where an element added through this connector's affordance is inserted.
    pub add_anchor: Option<Anchor>,
}

impl RenderNode {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn is_branching(&self) -> bool {
        self.element_type.is_some_and(|t| t.has_children())
    }
}

impl FlowRender {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a RenderNode>) {
        for node in &self.nodes {
            out.push(node);
            for branch in &node.children {
                branch.flow.collect(out);
            }
            if let Some(fault) = &node.fault {
                fault.collect(out);
            }
        }
    }

    fn for_each_mut(&mut self, f: &mut impl FnMut(&mut RenderNode)) {
        for node in &mut self.nodes {
            f(node);
            for branch in &mut node.children {
                branch.flow.for_each_mut(f);
            }
            if let Some(fault) = &mut node.fault {
                fault.for_each_mut(f);
            }
        }
    }
}

impl RenderTree {
    pub(crate) fn new(
        source: LayoutSource,
        flow: FlowRender,
        mode: CanvasMode,
        violations: Vec<Violation>,
    ) -> Self {
        let mut tree = Self {
            source,
            bounds: flow.rect(),
            flow,
            mode,
            violations,
        };
        tree.bounds = tree
            .nodes()
            .iter()
            .flat_map(|node| {
                std::iter::once(node.rect()).chain(node.fault.as_ref().map(FlowRender::rect))
            })
            .fold(tree.bounds, |acc, rect| acc.union(&rect));
        tree
    }

    /// Whether this tree was computed from a model with `model`'s exact structure.
    pub fn describes(&self, model: &FlowModel) -> bool {
        self.source == LayoutSource::of(model)
    }

    /// Every node, depth-first: a node, then its branches in order, then its fault path.
    pub fn nodes(&self) -> Vec<&RenderNode> {
        let mut out = Vec::new();
        self.flow.collect(&mut out);
        out
    }

    pub fn find(&self, guid: &str) -> Option<&RenderNode> {
        self.nodes().into_iter().find(|node| node.guid == guid)
    }

    /// All connectors of the tree in node order.
    pub fn connectors(&self) -> Vec<&ConnectorRender> {
        self.nodes()
            .into_iter()
            .flat_map(|node| node.connectors.iter())
            .collect()
    }

    /// Guids of the real nodes whose slot intersects `area`.
    pub fn nodes_in(&self, area: &Rect) -> Vec<Guid> {
        self.nodes()
            .into_iter()
            .filter(|node| !node.stub && node.rect().intersects(area))
            .map(|node| node.guid.clone())
            .collect()
    }

    /// First real node, depth-first, whose slot contains the point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&RenderNode> {
        self.nodes()
            .into_iter()
            .find(|node| !node.stub && node.rect().contains(Point::new(x, y)))
    }

    /// Position of the contextual menu of a node.
    pub fn menu_style(&self, guid: &str, padding: &MenuPadding) -> Option<MenuStyle> {
        self.find(guid)
            .map(|node| menu_style_from_geometry(&node.rect(), padding))
    }

    /// Applies selection and menu flags without re-running layout.
    pub fn decorate(&mut self, state: &InteractionState) {
        self.flow.for_each_mut(&mut |node| {
            node.selected = state.is_selected(&node.guid);
            node.menu_open = state.open_menu() == Some(node.guid.as_str());
        });
    }
}
