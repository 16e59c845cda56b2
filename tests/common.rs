//! Common test utilities for building flow definitions and sessions.
use flowcanvas::prelude::*;

/// Converts a definition, panicking on conversion errors.
#[allow(dead_code)]
pub fn load(flow: FlowDefinition) -> FlowModel {
    flow.into_flow_model().expect("Failed to convert flow definition")
}

/// `start -> a (Assignment) -> b (Screen) -> end`
#[allow(dead_code)]
pub fn linear_flow() -> FlowModel {
    load(FlowDefinition {
        root: "start".to_string(),
        elements: vec![
            ElementDefinition::new("start", ElementType::Start).with_next("a"),
            ElementDefinition::new("a", ElementType::Assignment).with_next("b"),
            ElementDefinition::new("b", ElementType::Screen).with_next("end"),
            ElementDefinition::new("end", ElementType::End),
        ],
    })
}

/// `start -> d`, where both branches of `d` are ended:
/// `Yes: a -> end_a`, `No: b -> end_b`.
#[allow(dead_code)]
pub fn ended_decision_flow() -> FlowModel {
    load(FlowDefinition {
        root: "start".to_string(),
        elements: vec![
            ElementDefinition::new("start", ElementType::Start).with_next("d"),
            ElementDefinition::new("d", ElementType::Decision)
                .with_branches(&[("Yes", Some("a")), ("No", Some("b"))]),
            ElementDefinition::new("a", ElementType::Assignment).with_next("end_a"),
            ElementDefinition::new("end_a", ElementType::End),
            ElementDefinition::new("b", ElementType::Screen).with_next("end_b"),
            ElementDefinition::new("end_b", ElementType::End),
        ],
    })
}

/// `start -> d -> end`, where `Yes: a` merges back and `No` is empty.
#[allow(dead_code)]
pub fn merging_decision_flow() -> FlowModel {
    load(FlowDefinition {
        root: "start".to_string(),
        elements: vec![
            ElementDefinition::new("start", ElementType::Start).with_next("d"),
            ElementDefinition::new("d", ElementType::Decision)
                .with_branches(&[("Yes", Some("a")), ("No", None)])
                .with_next("end"),
            ElementDefinition::new("a", ElementType::Assignment),
            ElementDefinition::new("end", ElementType::End),
        ],
    })
}

/// `start -> l -> end`, with the loop body `x`.
#[allow(dead_code)]
pub fn loop_flow() -> FlowModel {
    load(FlowDefinition {
        root: "start".to_string(),
        elements: vec![
            ElementDefinition::new("start", ElementType::Start).with_next("l"),
            ElementDefinition::new("l", ElementType::Loop)
                .with_branches(&[("For Each", Some("x"))])
                .with_next("end"),
            ElementDefinition::new("x", ElementType::Assignment),
            ElementDefinition::new("end", ElementType::End),
        ],
    })
}

/// `start -> r -> end`, where `r` has the fault path `f`.
#[allow(dead_code)]
pub fn fault_flow() -> FlowModel {
    load(FlowDefinition {
        root: "start".to_string(),
        elements: vec![
            ElementDefinition::new("start", ElementType::Start).with_next("r"),
            ElementDefinition::new("r", ElementType::RecordCreate)
                .with_next("end")
                .with_fault("f"),
            ElementDefinition::new("f", ElementType::Assignment),
            ElementDefinition::new("end", ElementType::End),
        ],
    })
}

/// Opens a session with sequential ids and default layout.
#[allow(dead_code)]
pub fn open_session(model: FlowModel) -> EditorSession {
    EditorSession::new(model, SessionConfig::default()).expect("Failed to open session")
}

/// Guids of `model` reachable from its root, sorted.
#[allow(dead_code)]
pub fn reachable(model: &FlowModel) -> Vec<String> {
    let mut guids = model.subgraph(model.root());
    guids.sort();
    guids
}

#[allow(dead_code)]
pub const LINEAR_FLOW_JSON: &str = r#"
{
    "root": "start",
    "elements": [
        { "guid": "start", "type": "Start", "next": "lookup" },
        { "guid": "lookup", "type": "RecordLookup", "label": "Get Account", "next": "check" },
        {
            "guid": "check",
            "type": "decision",
            "label": "Found?",
            "next": "end",
            "branches": [
                { "label": "Yes", "head": "update" },
                { "label": "No" }
            ]
        },
        { "guid": "update", "type": "RecordUpdate", "label": "Update Account" },
        { "guid": "end", "type": "End" },
        { "guid": "var_count", "type": "Variable" }
    ]
}
"#;
