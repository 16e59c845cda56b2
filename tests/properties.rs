//! Structural properties checked over randomly edited flows.
//!
//! Each run starts from `start -> end` and issues seeded random commands through the
//! mutation engine. Every accepted result must validate, lay out deterministically and
//! keep sibling branches apart.
mod common;
use common::*;
use flowcanvas::layout::compute_layout;
use flowcanvas::prelude::*;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng, rngs::StdRng};

const SEEDS: u64 = 64;
const COMMANDS_PER_SEED: usize = 60;

const INSERTABLE: [ElementType; 11] = [
    ElementType::Screen,
    ElementType::Decision,
    ElementType::Wait,
    ElementType::Loop,
    ElementType::Assignment,
    ElementType::RecordCreate,
    ElementType::RecordLookup,
    ElementType::ActionCall,
    ElementType::Subflow,
    ElementType::End,
    ElementType::End,
];

fn start_to_end() -> FlowModel {
    load(FlowDefinition {
        root: "start".to_string(),
        elements: vec![
            ElementDefinition::new("start", ElementType::Start).with_next("end"),
            ElementDefinition::new("end", ElementType::End),
        ],
    })
}

fn random_guid(rng: &mut StdRng, model: &FlowModel) -> String {
    model
        .sorted_guids()
        .choose(rng)
        .map(|guid| guid.to_string())
        .unwrap_or_else(|| model.root().clone())
}

/// Any anchor the element offers, including ones the engine will refuse.
fn random_anchor(rng: &mut StdRng, model: &FlowModel) -> Anchor {
    let guid = random_guid(rng, model);
    let element = model.get_element(&guid).unwrap();
    match rng.random_range(0..3) {
        0 if element.element_type.supports_fault() => Anchor::fault(&guid),
        1 if !element.children.is_empty() => {
            Anchor::branch(&guid, rng.random_range(0..element.children.len()))
        }
        _ => Anchor::after(&guid),
    }
}

fn random_command(rng: &mut StdRng, model: &FlowModel) -> Option<Command> {
    let command = match rng.random_range(0..10) {
        0..=4 => Command::AddElement {
            anchor: random_anchor(rng, model),
            element_type: *INSERTABLE.choose(rng).unwrap(),
            label: None,
        },
        5 | 6 => {
            let guid = random_guid(rng, model);
            let children = model.get_element(&guid).unwrap().children.len();
            let keep_branch = (children > 0 && rng.random_bool(0.5))
                .then(|| rng.random_range(0..children));
            Command::DeleteElement { guid, keep_branch }
        }
        7 => Command::MoveElement {
            guid: random_guid(rng, model),
            anchor: random_anchor(rng, model),
        },
        8 => {
            let parent = random_guid(rng, model);
            let children = model.get_element(&parent).unwrap().children.len();
            Command::MergeBranch {
                parent,
                index: rng.random_range(0..children.max(1)),
            }
        }
        _ => {
            let top = random_guid(rng, model);
            let clipboard = CopiedSubgraph::copy(model, &top, &top).ok()?;
            Command::Paste {
                clipboard,
                anchor: random_anchor(rng, model),
            }
        }
    };
    Some(command)
}

/// Sibling branches of every node occupy disjoint horizontal ranges.
fn assert_branches_disjoint(tree: &RenderTree) {
    for node in tree.nodes() {
        for pair in node.children.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            assert!(
                left.offset + left.width <= right.offset + 1e-3,
                "Branches {} and {} of '{}' overlap",
                left.index,
                right.index,
                node.guid
            );
            assert!(left.flow.x + left.width <= right.flow.x + 1e-3);
        }
    }
}

fn check_accepted(before: &FlowModel, command: &Command, after: &FlowModel) {
    let violations = validate_graph(after);
    assert!(
        violations.is_empty(),
        "Command {} produced violations: {:?}",
        command,
        violations
    );

    let tree = compute_layout(after, CanvasMode::Default).expect("Layout failed");
    assert_eq!(tree, compute_layout(after, CanvasMode::Default).unwrap());
    assert!(tree.describes(after));
    assert!(tree.violations.is_empty(), "Stubs in layout: {:?}", tree.violations);
    assert_branches_disjoint(&tree);

    let mut laid_out: Vec<String> = tree.nodes().iter().map(|n| n.guid.clone()).collect();
    laid_out.sort();
    assert_eq!(laid_out, reachable(after));

    // A plain element is removed alone and everything else stays reachable.
    if let Command::DeleteElement { guid, .. } = command {
        let deleted = before.get_element(guid).unwrap();
        if deleted.children.is_empty() && deleted.fault.is_none() {
            assert_eq!(after.len(), before.len() - 1);
            let expected: Vec<String> = reachable(before)
                .into_iter()
                .filter(|g| g != guid)
                .collect();
            assert_eq!(reachable(after), expected);
        }
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    #[test]
    fn test_random_edits_keep_flow_valid() {
        let mut accepted = 0;
        for seed in 0..SEEDS {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut engine = MutationEngine::default();
            let mut model = start_to_end();

            for _ in 0..COMMANDS_PER_SEED {
                let Some(command) = random_command(&mut rng, &model) else {
                    continue;
                };
                let Ok(mutation) = engine.apply(&model, &command) else {
                    continue;
                };
                check_accepted(&model, &command, &mutation.model);
                model = mutation.model;
                accepted += 1;
            }
        }
        assert!(accepted > 0);
    }

    #[test]
    fn test_layout_is_idempotent_in_every_mode() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut engine = MutationEngine::default();
        let mut model = start_to_end();
        for _ in 0..COMMANDS_PER_SEED {
            if let Some(command) = random_command(&mut rng, &model) {
                if let Ok(mutation) = engine.apply(&model, &command) {
                    model = mutation.model;
                }
            }
        }

        for mode in [CanvasMode::Default, CanvasMode::Selection, CanvasMode::Reconnect] {
            let first = compute_layout(&model, mode).unwrap();
            assert_eq!(first, compute_layout(&model, mode).unwrap());
            assert_eq!(first.mode, mode);
        }
    }
}
