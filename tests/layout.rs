//! Tests for the layout engine and the geometry it emits.
mod common;
use common::*;
use flowcanvas::error::LayoutError;
use flowcanvas::geometry::MenuPadding;
use flowcanvas::layout::{NodeDimensions, compute_layout};
use flowcanvas::model::LinkKind;
use flowcanvas::prelude::*;

fn layout(model: &FlowModel) -> RenderTree {
    compute_layout(model, CanvasMode::Default).expect("Layout failed")
}

#[cfg(test)]
mod layout_tests {
    use super::*;

    #[test]
    fn test_layout_is_idempotent() {
        for model in [ended_decision_flow(), loop_flow(), fault_flow()] {
            assert_eq!(layout(&model), layout(&model));
        }
    }

    #[test]
    fn test_linear_chain_is_stacked_and_centred() {
        let tree = layout(&linear_flow());

        let positions: Vec<_> = tree
            .nodes()
            .iter()
            .map(|n| (n.guid.as_str(), n.x, n.y))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("start", 20.0, 0.0),
                ("a", 0.0, 96.0),
                ("b", 0.0, 192.0),
                ("end", 20.0, 288.0),
            ]
        );
        assert_eq!(tree.bounds, Rect::new(0.0, 0.0, 160.0, 384.0));
        assert!(tree.violations.is_empty());

        let start = tree.find("start").unwrap();
        assert_eq!(start.connectors.len(), 1);
        let connector = &start.connectors[0];
        assert_eq!(connector.kind, ConnectorKind::Straight);
        assert_eq!(connector.target.as_deref(), Some("a"));
        assert_eq!(connector.add_anchor, Some(Anchor::after("start")));
        assert_eq!(connector.path.start(), Point::new(80.0, 48.0));
        assert_eq!(connector.path.end(), Point::new(80.0, 96.0));
        assert_eq!(connector.path.add_point, Some(Point::new(80.0, 72.0)));

        // An ended chain has no trailing insertion connector.
        assert!(tree.find("end").unwrap().connectors.is_empty());
    }

    #[test]
    fn test_branch_offsets_are_cumulative_widths() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("d"),
                ElementDefinition::new("d", ElementType::Decision)
                    .with_branches(&[("A", Some("p")), ("B", Some("q")), ("C", Some("r"))])
                    .with_next("end"),
                ElementDefinition::new("p", ElementType::Assignment),
                ElementDefinition::new("q", ElementType::Screen),
                ElementDefinition::new("r", ElementType::RecordCreate),
                ElementDefinition::new("end", ElementType::End),
            ],
        });
        let engine = LayoutEngine::builder(LayoutConfig::default())
            .with_sizing(ElementType::Assignment, |_, _| NodeDimensions::new(40.0, 48.0))
            .with_sizing(ElementType::Screen, |_, _| NodeDimensions::new(100.0, 48.0))
            .with_sizing(ElementType::RecordCreate, |_, _| NodeDimensions::new(60.0, 48.0))
            .build();
        let tree = engine.compute_layout(&model, CanvasMode::Default).unwrap();

        let d = tree.find("d").unwrap();
        let offsets: Vec<f32> = d.children.iter().map(|b| b.offset).collect();
        let widths: Vec<f32> = d.children.iter().map(|b| b.width).collect();
        assert_eq!(offsets, vec![0.0, 40.0, 140.0]);
        assert_eq!(widths, vec![40.0, 100.0, 60.0]);

        // The row is centred under the decision, so it starts at the canvas edge here.
        let origins: Vec<f32> = d.children.iter().map(|b| b.flow.x).collect();
        assert_eq!(origins, vec![0.0, 40.0, 140.0]);
        assert_eq!(
            d.children.iter().map(|b| b.label.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn test_empty_branch_takes_default_width() {
        let tree = layout(&merging_decision_flow());
        let d = tree.find("d").unwrap();
        assert_eq!(d.children.len(), 2);
        assert_eq!(d.children[0].width, 160.0);
        assert_eq!(d.children[1].width, 160.0);
        assert_eq!(d.children[1].offset, 160.0);
        assert!(d.children[1].flow.nodes.is_empty());

        let branch_anchors: Vec<_> = d
            .connectors
            .iter()
            .filter(|c| c.kind == ConnectorKind::Branch)
            .map(|c| c.add_anchor.clone())
            .collect();
        assert_eq!(
            branch_anchors,
            vec![Some(Anchor::branch("d", 0)), Some(Anchor::branch("d", 1))]
        );

        let a = tree.find("a").unwrap();
        assert!(a.connectors.iter().any(|c| c.kind == ConnectorKind::Merge
            && c.add_anchor == Some(Anchor::after("a"))));
    }

    #[test]
    fn test_fault_path_is_offset_and_takes_no_width() {
        let tree = layout(&fault_flow());
        assert_eq!(tree.flow.width, 160.0);

        let r = tree.find("r").unwrap();
        let fault = r.fault.as_ref().unwrap();
        assert_eq!((fault.x, fault.y), (208.0, 168.0));
        assert_eq!(fault.nodes[0].guid, "f");

        let connector = r
            .connectors
            .iter()
            .find(|c| c.kind == ConnectorKind::Fault)
            .unwrap();
        assert!(connector.path.dashed);
        assert_eq!(connector.target.as_deref(), Some("f"));

        // The fault path ends in an insertion stub.
        let f = tree.find("f").unwrap();
        assert_eq!(f.connectors[0].kind, ConnectorKind::Dangling);
        assert_eq!(f.connectors[0].add_anchor, Some(Anchor::after("f")));

        assert_eq!(tree.bounds.right(), 368.0);
    }

    #[test]
    fn test_loop_body_is_nested_with_lanes() {
        let tree = layout(&loop_flow());
        let l = tree.find("l").unwrap();
        assert_eq!((l.x, l.y), (48.0, 96.0));
        assert_eq!(l.children.len(), 1);
        assert_eq!(l.children[0].offset, 48.0);

        let kinds: Vec<_> = l.connectors.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConnectorKind::ForEach,
                ConnectorKind::AfterLast { lane_x: 232.0 },
                ConnectorKind::Straight,
            ]
        );
        assert_eq!(l.connectors[0].add_anchor, Some(Anchor::branch("l", 0)));
        assert_eq!(l.connectors[1].add_anchor, Some(Anchor::after("l")));
        assert_eq!(l.connectors[2].target.as_deref(), Some("end"));

        let x = tree.find("x").unwrap();
        assert_eq!((x.x, x.y), (48.0, 200.0));
        let back = &x.connectors[0];
        assert_eq!(back.kind, ConnectorKind::LoopBack { lane_x: 24.0 });
        assert_eq!(back.target.as_deref(), Some("l"));

        assert_eq!(tree.find("end").unwrap().y, 392.0);
    }

    #[test]
    fn test_missing_branch_head_is_rendered_as_stub() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("d"),
                ElementDefinition::new("d", ElementType::Decision)
                    .with_branches(&[("Yes", Some("ghost")), ("No", None)])
                    .with_next("end"),
                ElementDefinition::new("end", ElementType::End),
            ],
        });
        let tree = layout(&model);

        let stub = tree.find("ghost").unwrap();
        assert!(stub.stub);
        assert_eq!(stub.element_type, None);
        assert_eq!(
            tree.violations,
            vec![Violation::DanglingReference {
                source: "d".to_string(),
                target: "ghost".to_string(),
                link: LinkKind::Branch(0),
            }]
        );
        assert!(tree.hit_test(stub.x + 1.0, stub.y + 1.0).is_none());
    }

    #[test]
    fn test_cycle_is_a_layout_error() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("a"),
                ElementDefinition::new("a", ElementType::Assignment).with_next("b"),
                ElementDefinition::new("b", ElementType::Assignment).with_next("a"),
            ],
        });
        assert_eq!(
            compute_layout(&model, CanvasMode::Default),
            Err(LayoutError::CycleDetected {
                guid: "a".to_string()
            })
        );
    }

    #[test]
    fn test_selection_mode_hides_add_anchors() {
        let model = linear_flow();
        let tree = compute_layout(&model, CanvasMode::Selection).unwrap();
        assert!(tree.connectors().iter().all(|c| c.add_anchor.is_none()));
        assert!(tree.connectors().iter().all(|c| c.path.add_point.is_none()));

        let selectable: Vec<_> = tree
            .nodes()
            .iter()
            .filter(|n| n.selectable)
            .map(|n| n.guid.as_str())
            .collect();
        assert_eq!(selectable, vec!["a", "b"]);
    }

    #[test]
    fn test_reconnect_mode_marks_ended_branches() {
        let model = ended_decision_flow();
        let tree = compute_layout(&model, CanvasMode::Reconnect).unwrap();
        let reconnectable: Vec<_> = tree
            .nodes()
            .iter()
            .filter(|n| n.reconnectable)
            .map(|n| n.guid.as_str())
            .collect();
        assert_eq!(reconnectable, vec!["end_a", "end_b"]);

        let tree = layout(&model);
        assert!(tree.nodes().iter().all(|n| !n.reconnectable));
    }

    #[test]
    fn test_hit_testing_and_menu_geometry() {
        let tree = layout(&linear_flow());
        assert_eq!(tree.hit_test(80.0, 120.0).map(|n| n.guid.as_str()), Some("a"));
        assert!(tree.hit_test(500.0, 500.0).is_none());

        let marquee = Rect::new(0.0, 90.0, 160.0, 110.0);
        assert_eq!(tree.nodes_in(&marquee), vec!["a".to_string(), "b".to_string()]);

        let style = tree.menu_style("a", &MenuPadding::default()).unwrap();
        assert_eq!((style.left, style.top), (8.0, 152.0));
        assert_eq!(style.to_css(), "left: 8px; top: 152px");
        assert!(tree.menu_style("ghost", &MenuPadding::default()).is_none());
    }

    #[test]
    fn test_render_tree_records_its_source_model() {
        let model = linear_flow();
        let tree = layout(&model);
        assert_eq!(tree.source.root, "start");
        assert_eq!(tree.source.element_count, 4);
        assert!(tree.describes(&model));
        assert!(validate_graph(&model).is_empty());

        let mut definition = FlowDefinition::from_model(&model);
        for element in &mut definition.elements {
            if element.guid == "a" {
                element.label = Some("Renamed".to_string());
            }
        }
        assert!(!tree.describes(&load(definition)));
        assert!(!tree.describes(&loop_flow()));
    }

    #[test]
    fn test_render_tree_serializes_camel_case() {
        let tree = layout(&merging_decision_flow());
        let json = serde_json::to_value(&tree).unwrap();
        let first = &json["flow"]["nodes"][0];
        assert_eq!(first["guid"], "start");
        assert_eq!(first["elementType"], "Start");
        assert!(first.get("menuOpen").is_some());
        assert_eq!(json["mode"], "default");
        assert_eq!(json["source"]["elementCount"], 4);
    }
}
