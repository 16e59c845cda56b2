//! Tests for the flow model, its validation and the interchange conversion.
mod common;
use common::*;
use flowcanvas::error::{ConversionError, ModelError};
use flowcanvas::model::{Connection, EdgeKind};
use flowcanvas::prelude::*;

#[cfg(test)]
mod model_tests {
    use super::*;

    #[test]
    fn test_fixtures_are_valid() {
        for model in [
            linear_flow(),
            ended_decision_flow(),
            merging_decision_flow(),
            loop_flow(),
            fault_flow(),
        ] {
            let violations = validate_graph(&model);
            assert!(violations.is_empty(), "Unexpected violations: {:?}", violations);
        }
    }

    #[test]
    fn test_get_element_not_found() {
        let model = linear_flow();
        assert_eq!(model.get_element("a").unwrap().element_type, ElementType::Assignment);
        assert_eq!(
            model.get_element("ghost").unwrap_err(),
            ModelError::NotFound {
                guid: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_traverse_branch_is_restartable() {
        let model = linear_flow();
        let walk = model.traverse_branch("a");
        let first: Vec<_> = walk.clone().map(|e| e.guid.as_str()).collect();
        let second: Vec<_> = walk.map(|e| e.guid.as_str()).collect();
        assert_eq!(first, vec!["a", "b", "end"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_traverse_branch_stops_at_merge() {
        let model = merging_decision_flow();
        let chain: Vec<_> = model.traverse_branch("a").map(|e| e.guid.clone()).collect();
        assert_eq!(chain, vec!["a"]);
    }

    #[test]
    fn test_traverse_branch_terminates_on_cycle() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("a"),
                ElementDefinition::new("a", ElementType::Assignment).with_next("b"),
                ElementDefinition::new("b", ElementType::Assignment).with_next("a"),
            ],
        });
        assert_eq!(model.traverse_branch("start").count(), 3);
        assert!(
            validate_graph(&model)
                .iter()
                .any(|v| matches!(v, Violation::Cycle { .. }))
        );
    }

    #[test]
    fn test_dangling_reference_reported() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("a"),
                ElementDefinition::new("a", ElementType::Assignment).with_next("ghost"),
            ],
        });
        let violations = validate_graph(&model);
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::DanglingReference { source, target, .. } if source == "a" && target == "ghost"
        )));
    }

    #[test]
    fn test_multiple_predecessors_and_orphans_reported() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("a"),
                ElementDefinition::new("a", ElementType::Assignment).with_next("end"),
                ElementDefinition::new("b", ElementType::Assignment).with_next("end"),
                ElementDefinition::new("end", ElementType::End),
                ElementDefinition::new("loose", ElementType::Screen),
            ],
        });
        let violations = validate_graph(&model);
        assert!(violations.contains(&Violation::MultiplePredecessors {
            guid: "end".to_string(),
            count: 2
        }));
        assert!(violations.contains(&Violation::OrphanedBranchHead {
            guid: "b".to_string()
        }));
        assert!(violations.contains(&Violation::OrphanedBranchHead {
            guid: "loose".to_string()
        }));
    }

    #[test]
    fn test_dead_continuation_reported() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("d"),
                ElementDefinition::new("d", ElementType::Decision)
                    .with_branches(&[("Yes", Some("e1")), ("No", Some("e2"))])
                    .with_next("after"),
                ElementDefinition::new("e1", ElementType::End),
                ElementDefinition::new("e2", ElementType::End),
                ElementDefinition::new("after", ElementType::Assignment),
            ],
        });
        assert!(validate_graph(&model).contains(&Violation::DeadContinuation {
            guid: "d".to_string(),
            next: "after".to_string()
        }));
    }

    #[test]
    fn test_shape_violations_reported() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("d"),
                ElementDefinition::new("d", ElementType::Decision)
                    .with_branches(&[])
                    .with_next("s"),
                ElementDefinition::new("s", ElementType::Screen)
                    .with_fault("f")
                    .with_next("l"),
                ElementDefinition::new("f", ElementType::Assignment),
                ElementDefinition::new("l", ElementType::Loop)
                    .with_branches(&[("For Each", Some("inner_end"))]),
                ElementDefinition::new("inner_end", ElementType::End),
            ],
        });
        let violations = validate_graph(&model);
        assert!(violations.contains(&Violation::EmptyBranchList {
            guid: "d".to_string()
        }));
        assert!(violations.contains(&Violation::FaultNotSupported {
            guid: "s".to_string(),
            element_type: ElementType::Screen
        }));
        assert!(violations.contains(&Violation::EndInsideLoop {
            guid: "inner_end".to_string()
        }));
    }

    #[test]
    fn test_violations_are_sorted_by_guid() {
        let model = load(FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("z"),
                ElementDefinition::new("z", ElementType::Screen)
                    .with_fault("f")
                    .with_next("end"),
                ElementDefinition::new("f", ElementType::Assignment),
                ElementDefinition::new("end", ElementType::End).with_next("a"),
                ElementDefinition::new("a", ElementType::Assignment),
            ],
        });
        let violations = validate_graph(&model);
        let guids: Vec<&str> = violations.iter().map(|v| v.guid().as_str()).collect();
        assert!(guids.contains(&"z"));
        assert!(guids.contains(&"end"));
        let mut sorted = guids.clone();
        sorted.sort();
        assert_eq!(guids, sorted);
    }

    #[test]
    fn test_merge_state_derived_on_load() {
        let model = ended_decision_flow();
        let d = model.get_element("d").unwrap();
        assert!(d.children.iter().all(|b| !b.merging));
        assert!(model.is_chain_ended(Some("d")));

        let model = merging_decision_flow();
        let d = model.get_element("d").unwrap();
        assert!(d.children.iter().all(|b| b.merging));
        assert!(!model.is_chain_ended(Some("a")));
        assert!(!model.is_chain_ended(None));
    }

    #[test]
    fn test_relations() {
        let model = merging_decision_flow();
        let relations = model.relations();
        assert_eq!(
            relations.enclosing_branch("a"),
            Some(("d".to_string(), 0))
        );
        assert_eq!(relations.ancestors("a"), vec!["d".to_string()]);
        assert_eq!(relations.chain_head("end"), "start");
        assert!(!relations.is_inside_loop("a"));

        let model = loop_flow();
        assert!(model.relations().is_inside_loop("x"));

        let model = fault_flow();
        assert!(model.relations().is_inside_fault("f"));
        assert!(!model.relations().is_inside_fault("end"));
    }

    #[test]
    fn test_connections_of_merging_decision() {
        let connections = merging_decision_flow().connections();
        assert!(connections.contains(&Connection::to_element("start", "d", EdgeKind::Regular)));
        assert!(connections.contains(&Connection::to_element("d", "a", EdgeKind::Branch(0))));
        assert!(connections.contains(&Connection::to_stub("d", EdgeKind::Branch(1))));
        assert!(connections.contains(&Connection::to_element("a", "end", EdgeKind::Merge)));
        assert!(connections.contains(&Connection::to_element("d", "end", EdgeKind::Regular)));
        assert!(connections.iter().all(|c| c.source != "end"));
    }

    #[test]
    fn test_connections_of_loop() {
        let connections = loop_flow().connections();
        assert!(connections.contains(&Connection::to_element("l", "x", EdgeKind::LoopNext)));
        assert!(connections.contains(&Connection::to_element("x", "l", EdgeKind::LoopBack)));
        assert!(connections.contains(&Connection::to_element("l", "end", EdgeKind::LoopEnd)));
    }

    #[test]
    fn test_model_from_json() {
        let model = FlowModel::from_json(LINEAR_FLOW_JSON).unwrap();
        assert_eq!(model.root(), "start");
        assert_eq!(model.len(), 6);

        let check = model.get_element("check").unwrap();
        assert_eq!(check.element_type, ElementType::Decision);
        assert_eq!(check.children.len(), 2);
        assert_eq!(check.children[0].head.as_deref(), Some("update"));
        assert!(check.children[1].is_empty());

        let variable = model.get_element("var_count").unwrap();
        assert!(!variable.is_canvas_element);

        assert!(validate_graph(&model).is_empty());
    }

    #[test]
    fn test_definition_roundtrip_preserves_model() {
        let model = FlowModel::from_json(LINEAR_FLOW_JSON).unwrap();
        let json = FlowDefinition::from_model(&model).to_json().unwrap();
        let reloaded = FlowModel::from_json(&json).unwrap();
        assert_eq!(model, reloaded);
    }

    #[test]
    fn test_conversion_errors() {
        let unknown = r#"{ "root": "s", "elements": [ { "guid": "s", "type": "Teleport" } ] }"#;
        assert!(matches!(
            FlowModel::from_json(unknown),
            Err(ConversionError::UnknownElementType { type_name, .. }) if type_name == "Teleport"
        ));

        let empty_type = r#"{ "root": "s", "elements": [ { "guid": "s", "type": "" } ] }"#;
        assert!(matches!(
            FlowModel::from_json(empty_type),
            Err(ConversionError::UnknownElementType { .. })
        ));

        let duplicate = r#"{ "root": "s", "elements": [
            { "guid": "s", "type": "Start" }, { "guid": "s", "type": "End" } ] }"#;
        assert!(matches!(
            FlowModel::from_json(duplicate),
            Err(ConversionError::DuplicateGuid(guid)) if guid == "s"
        ));

        let no_root = r#"{ "root": "missing", "elements": [ { "guid": "s", "type": "Start" } ] }"#;
        assert!(matches!(
            FlowModel::from_json(no_root),
            Err(ConversionError::MissingRoot(_))
        ));

        assert!(matches!(
            FlowModel::from_json("not json"),
            Err(ConversionError::Json(_))
        ));
    }
}
