use super::measure::{Footprint, Measurements};
use super::render::{BranchRender, ConnectorRender, FlowRender, RenderNode};
use super::{LayoutEngine, NodeDimensions};
use crate::geometry::{ConnectorKind, Point, Rect, Size, connector_path};
use crate::interaction::CanvasMode;
use crate::model::{Element, ElementType, FlowModel, LinkKind, Relations, Violation};
use crate::mutation::{Anchor, can_merge_ended_branch};

/// How the connector leaving the tail of a chain is drawn.
enum ChainEnd<'b> {
    /// Main line or fault path: ends in an insertion stub.
    Open,
    /// Branch of a Decision or Wait, joining the parent's merge point.
    Merge { merge_point: Point },
    /// Loop body, returning to the loop node through the left lane.
    LoopBack { owner: &'b str, target: Point, lane_x: f32 },
}

/// Who references the head of a chain.
struct Entry<'b> {
    source: &'b str,
    link: LinkKind,
}

struct PlacedChain {
    flow: FlowRender,
    /// Connectors of an empty chain, owned by the element that holds the chain.
    orphans: Vec<ConnectorRender>,
}

/// Place pass. Walks the model top-down and emits absolute geometry.
pub(super) struct Placer<'a> {
    engine: &'a LayoutEngine,
    model: &'a FlowModel,
    measurements: &'a Measurements,
    relations: Relations<'a>,
    mode: CanvasMode,
    violations: Vec<Violation>,
}

impl<'a> Placer<'a> {
    pub fn new(
        engine: &'a LayoutEngine,
        model: &'a FlowModel,
        measurements: &'a Measurements,
        mode: CanvasMode,
    ) -> Self {
        Self {
            engine,
            model,
            measurements,
            relations: model.relations(),
            mode,
            violations: Vec::new(),
        }
    }

    pub fn finish(self) -> Vec<Violation> {
        self.violations
    }

    pub fn place_root(&mut self, root: &str, size: Size) -> FlowRender {
        let entry = Entry {
            source: root,
            link: LinkKind::Next,
        };
        self.place_chain(Some(root), Point::new(0.0, 0.0), size.width, &ChainEnd::Open, entry)
            .flow
    }

    fn place_chain(
        &mut self,
        head: Option<&str>,
        origin: Point,
        width: f32,
        end: &ChainEnd<'_>,
        entry: Entry<'_>,
    ) -> PlacedChain {
        let engine = self.engine;
        let model = self.model;
        let config = engine.config();
        let cx = origin.x + width / 2.0;

        let mut nodes: Vec<RenderNode> = Vec::new();
        let mut cursor = origin.y;
        let mut exit: Option<Point> = None;
        let mut tail: Option<&Element> = None;
        let mut stubbed = false;
        let mut current = head;

        while let Some(guid) = current {
            let Some(element) = model.get(guid) else {
                let source = tail.map(|t| t.guid.as_str()).unwrap_or(entry.source);
                let link = if tail.is_some() { LinkKind::Next } else { entry.link };
                self.violations.push(Violation::DanglingReference {
                    source: source.to_string(),
                    target: guid.to_string(),
                    link,
                });

                let stub = self.stub_node(guid, Point::new(cx, cursor));
                if let (Some(previous), Some(from)) = (nodes.last_mut(), exit) {
                    previous.connectors.push(self.connect(
                        ConnectorKind::Straight,
                        &previous.guid,
                        Some(guid),
                        from,
                        stub.rect().top_center(),
                    ));
                }
                nodes.push(stub);
                cursor += config.stub_height + config.connector_length;
                stubbed = true;
                break;
            };

            let (node, element_exit) = self.place_element(element, Point::new(cx, cursor));
            if let (Some(previous), Some(from), Some(prev_element)) =
                (nodes.last_mut(), exit, tail)
            {
                let connector = self.connect(
                    ConnectorKind::Straight,
                    &previous.guid,
                    Some(guid),
                    from,
                    node.rect().top_center(),
                );
                let connector = if prev_element.element_type.is_loop() {
                    connector
                } else {
                    self.offer(connector, Anchor::after(&prev_element.guid))
                };
                previous.connectors.push(connector);
            }

            cursor += self.footprint(element).height + config.connector_length;
            exit = Some(element_exit);
            tail = Some(element);
            nodes.push(node);
            current = element.next.as_deref();
        }

        if head.is_none() {
            cursor += config.connector_length;
        }

        let mut orphans = Vec::new();
        let ended = tail.is_some() && model.is_chain_ended(head);
        if !stubbed && !ended {
            let from = exit.unwrap_or(origin.offset(width / 2.0, 0.0));
            let connector = match end {
                ChainEnd::Open => self.connect(
                    ConnectorKind::Dangling,
                    tail.map(|t| t.guid.as_str()).unwrap_or(entry.source),
                    None,
                    from,
                    Point::new(cx, cursor),
                ),
                ChainEnd::Merge { merge_point } => self.connect(
                    ConnectorKind::Merge,
                    tail.map(|t| t.guid.as_str()).unwrap_or(entry.source),
                    None,
                    from,
                    *merge_point,
                ),
                ChainEnd::LoopBack {
                    owner,
                    target,
                    lane_x,
                } => self.connect(
                    ConnectorKind::LoopBack { lane_x: *lane_x },
                    tail.map(|t| t.guid.as_str()).unwrap_or(entry.source),
                    Some(*owner),
                    from,
                    *target,
                ),
            };

            match (tail, nodes.last_mut()) {
                (Some(tail), Some(last)) => {
                    let connector = if tail.element_type.is_loop() {
                        connector
                    } else {
                        self.offer(connector, Anchor::after(&tail.guid))
                    };
                    last.connectors.push(connector);
                }
                _ => orphans.push(connector),
            }
        }

        PlacedChain {
            flow: FlowRender {
                x: origin.x,
                y: origin.y,
                width,
                height: cursor - origin.y,
                nodes,
            },
            orphans,
        }
    }

    /// Places one element with its top edge at `top.y`, centred on `top.x`.
    /// Returns the node and the point its successor connector leaves from.
    fn place_element(&mut self, element: &'a Element, top: Point) -> (RenderNode, Point) {
        let engine = self.engine;
        let config = engine.config();
        let footprint = self.footprint(element);
        let cx = top.x;
        let rect = Rect::new(
            cx - footprint.node.width / 2.0,
            top.y,
            footprint.node.width,
            footprint.node.height,
        );
        let guid = element.guid.as_str();
        let mut node = self.render_node(element, rect);

        let exit = if element.element_type.is_loop() {
            let body = footprint
                .branches
                .first()
                .copied()
                .unwrap_or(Size::new(config.empty_branch_width, config.connector_length));
            let half = footprint.width / 2.0 - config.loop_gutter / 2.0;
            let loop_end = Point::new(cx, top.y + footprint.height);
            let body_origin = Point::new(cx - body.width / 2.0, rect.bottom() + config.connector_length);
            let head = element.children.first().and_then(|b| b.head.as_deref());

            let for_each = self.connect(
                ConnectorKind::ForEach,
                guid,
                head,
                rect.bottom_center(),
                Point::new(cx, body_origin.y),
            );
            node.connectors.push(self.offer(for_each, Anchor::branch(guid, 0)));

            let placed = self.place_chain(
                head,
                body_origin,
                body.width,
                &ChainEnd::LoopBack {
                    owner: guid,
                    target: rect.left_middle(),
                    lane_x: cx - half,
                },
                Entry {
                    source: guid,
                    link: LinkKind::Branch(0),
                },
            );
            node.connectors.extend(placed.orphans);

            let after_last = self.connect(
                ConnectorKind::AfterLast { lane_x: cx + half },
                guid,
                None,
                rect.right_middle(),
                loop_end,
            );
            node.connectors.push(self.offer(after_last, Anchor::after(guid)));

            if let Some(branch) = element.children.first() {
                node.children.push(BranchRender {
                    index: 0,
                    label: branch.label.clone(),
                    offset: body_origin.x - (cx - footprint.width / 2.0),
                    width: body.width,
                    merging: branch.merging,
                    flow: placed.flow,
                });
            }
            loop_end
        } else if element.element_type.is_branching() && !element.children.is_empty() {
            let row_y = rect.bottom() + config.branch_spacing;
            let row_x = cx - footprint.row_width / 2.0;
            let merge_point = Point::new(
                cx,
                row_y + footprint.row_height + config.merge_spacing,
            );

            let mut offset = 0.0;
            for (index, branch) in element.children.iter().enumerate() {
                let size = footprint
                    .branches
                    .get(index)
                    .copied()
                    .unwrap_or(Size::new(config.empty_branch_width, config.connector_length));
                let origin = Point::new(row_x + offset, row_y);
                let head = branch.head.as_deref();

                let path = connector_path(
                    ConnectorKind::Branch,
                    rect.bottom_center(),
                    Point::new(origin.x + size.width / 2.0, row_y),
                    Some(&branch.label),
                    &config.connector,
                );
                let connector = ConnectorRender {
                    kind: ConnectorKind::Branch,
                    source: guid.to_string(),
                    target: head.map(str::to_string),
                    path,
                    add_anchor: None,
                };
                node.connectors.push(self.offer(connector, Anchor::branch(guid, index)));

                let placed = self.place_chain(
                    head,
                    origin,
                    size.width,
                    &ChainEnd::Merge { merge_point },
                    Entry {
                        source: guid,
                        link: LinkKind::Branch(index),
                    },
                );
                node.connectors.extend(placed.orphans);
                node.children.push(BranchRender {
                    index,
                    label: branch.label.clone(),
                    offset,
                    width: size.width,
                    merging: branch.merging,
                    flow: placed.flow,
                });
                offset += size.width;
            }
            merge_point
        } else {
            rect.bottom_center()
        };

        if let Some(fault) = element.fault.as_deref() {
            let size = footprint
                .fault
                .unwrap_or(Size::new(config.stub_width, config.stub_height));
            let origin = Point::new(
                rect.right() + config.fault_offset_x,
                rect.bottom() + config.fault_offset_y,
            );
            node.connectors.push(self.connect(
                ConnectorKind::Fault,
                guid,
                Some(fault),
                rect.right_middle(),
                Point::new(origin.x + size.width / 2.0, origin.y),
            ));
            let placed = self.place_chain(
                Some(fault),
                origin,
                size.width,
                &ChainEnd::Open,
                Entry {
                    source: guid,
                    link: LinkKind::Fault,
                },
            );
            node.fault = Some(placed.flow);
        }

        (node, exit)
    }

    fn render_node(&self, element: &Element, rect: Rect) -> RenderNode {
        let element_type = element.element_type;
        let selectable = self.mode == CanvasMode::Selection
            && !matches!(element_type, ElementType::Start | ElementType::End);
        let reconnectable = self.mode == CanvasMode::Reconnect
            && element_type == ElementType::End
            && self
                .relations
                .enclosing_branch(&element.guid)
                .is_some_and(|(parent, index)| {
                    can_merge_ended_branch(self.model, &parent, index).is_ok()
                });

        RenderNode {
            guid: element.guid.clone(),
            element_type: Some(element_type),
            label: element.label.clone(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            connectors: Vec::new(),
            children: Vec::new(),
            fault: None,
            stub: false,
            selectable,
            reconnectable,
            selected: false,
            menu_open: false,
        }
    }

    fn stub_node(&self, guid: &str, top: Point) -> RenderNode {
        let config = self.engine.config();
        RenderNode {
            guid: guid.to_string(),
            element_type: None,
            label: String::new(),
            x: top.x - config.stub_width / 2.0,
            y: top.y,
            width: config.stub_width,
            height: config.stub_height,
            connectors: Vec::new(),
            children: Vec::new(),
            fault: None,
            stub: true,
            selectable: false,
            reconnectable: false,
            selected: false,
            menu_open: false,
        }
    }

    fn footprint(&self, element: &Element) -> Footprint {
        match self.measurements.elements.get(&element.guid) {
            Some(footprint) => footprint.clone(),
            None => {
                let node: NodeDimensions = self.engine.dimensions(element);
                Footprint {
                    node,
                    width: node.width,
                    height: node.height,
                    branches: Vec::new(),
                    row_width: 0.0,
                    row_height: 0.0,
                    fault: None,
                }
            }
        }
    }

    fn connect(
        &self,
        kind: ConnectorKind,
        source: &str,
        target: Option<&str>,
        start: Point,
        end: Point,
    ) -> ConnectorRender {
        ConnectorRender {
            kind,
            source: source.to_string(),
            target: target.map(str::to_string),
            path: connector_path(kind, start, end, None, &self.engine.config().connector),
            add_anchor: None,
        }
    }

    /// Attaches an insertion anchor. Only the default mode offers insertion.
    fn offer(&self, mut connector: ConnectorRender, anchor: Anchor) -> ConnectorRender {
        if self.mode == CanvasMode::Default {
            connector.add_anchor = Some(anchor);
        } else {
            connector.path.add_point = None;
        }
        connector
    }
}
