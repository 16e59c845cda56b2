//! Structural validation of a flow model.
//!
//! Validation never repairs anything: it reports every problem it finds (not just the
//! first) so callers can use the list for diagnostics and tests.

use super::element::{ElementType, Guid};
use super::flow::{FlowModel, LinkKind};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::fmt;

/// A structural problem found in a flow model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Violation {
    /// The root guid does not name an element
    MissingRoot { root: Guid },
    /// Something points at the root
    RootHasPredecessor { root: Guid },
    /// The map key and the element's own guid disagree
    GuidMismatch { key: Guid, guid: Guid },
    /// A link names an element that does not exist
    DanglingReference {
        source: Guid,
        target: Guid,
        link: LinkKind,
    },
    MultiplePredecessors { guid: Guid, count: usize },
    /// Unreachable from the root although something points at it
    Orphaned { guid: Guid },
    /// Heads a chain that nothing points at
    OrphanedBranchHead { guid: Guid },
    EmptyBranchList { guid: Guid },
    InvalidLoopBody { guid: Guid, count: usize },
    UnexpectedChildren {
        guid: Guid,
        element_type: ElementType,
    },
    EndHasSuccessor { guid: Guid },
    FaultNotSupported {
        guid: Guid,
        element_type: ElementType,
    },
    EndInsideLoop { guid: Guid },
    StaleMergeState { guid: Guid, index: usize },
    /// Every branch is ended yet a continuation is attached
    DeadContinuation { guid: Guid, next: Guid },
    Cycle { guid: Guid },
    NonCanvasReference { source: Guid, target: Guid },
}

impl Violation {
    /// The element the violation is reported against.
    pub fn guid(&self) -> &Guid {
        match self {
            Self::MissingRoot { root } | Self::RootHasPredecessor { root } => root,
            Self::GuidMismatch { key, .. } => key,
            Self::DanglingReference { source, .. } | Self::NonCanvasReference { source, .. } => {
                source
            }
            Self::MultiplePredecessors { guid, .. }
            | Self::Orphaned { guid }
            | Self::OrphanedBranchHead { guid }
            | Self::EmptyBranchList { guid }
            | Self::InvalidLoopBody { guid, .. }
            | Self::UnexpectedChildren { guid, .. }
            | Self::EndHasSuccessor { guid }
            | Self::FaultNotSupported { guid, .. }
            | Self::EndInsideLoop { guid }
            | Self::StaleMergeState { guid, .. }
            | Self::DeadContinuation { guid, .. }
            | Self::Cycle { guid } => guid,
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Next => write!(f, "next"),
            LinkKind::Branch(i) => write!(f, "branch {}", i),
            LinkKind::Fault => write!(f, "fault"),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot { root } => write!(f, "Root element '{}' is missing", root),
            Self::RootHasPredecessor { root } => {
                write!(f, "Root element '{}' has a predecessor", root)
            }
            Self::GuidMismatch { key, guid } => {
                write!(f, "Element stored under '{}' is named '{}'", key, guid)
            }
            Self::DanglingReference {
                source,
                target,
                link,
            } => write!(
                f,
                "Element '{}' references missing element '{}' through its {} link",
                source, target, link
            ),
            Self::MultiplePredecessors { guid, count } => {
                write!(f, "Element '{}' has {} predecessors", guid, count)
            }
            Self::Orphaned { guid } => {
                write!(f, "Element '{}' is not reachable from the root", guid)
            }
            Self::OrphanedBranchHead { guid } => {
                write!(f, "Element '{}' heads a chain that nothing points at", guid)
            }
            Self::EmptyBranchList { guid } => {
                write!(f, "Branching element '{}' has no branches", guid)
            }
            Self::InvalidLoopBody { guid, count } => {
                write!(f, "Loop '{}' has {} bodies, expected exactly 1", guid, count)
            }
            Self::UnexpectedChildren { guid, element_type } => write!(
                f,
                "Element '{}' of type {} cannot have branches",
                guid, element_type
            ),
            Self::EndHasSuccessor { guid } => {
                write!(f, "End element '{}' has a successor", guid)
            }
            Self::FaultNotSupported { guid, element_type } => write!(
                f,
                "Element '{}' of type {} cannot have a fault path",
                guid, element_type
            ),
            Self::EndInsideLoop { guid } => {
                write!(f, "End element '{}' is inside a loop body", guid)
            }
            Self::StaleMergeState { guid, index } => write!(
                f,
                "Merge state of branch {} of '{}' does not match its structure",
                index, guid
            ),
            Self::DeadContinuation { guid, next } => write!(
                f,
                "All branches of '{}' are ended but it continues to '{}'",
                guid, next
            ),
            Self::Cycle { guid } => write!(f, "Element '{}' is part of a cycle", guid),
            Self::NonCanvasReference { source, target } => write!(
                f,
                "Canvas link from '{}' to non-canvas element '{}'",
                source, target
            ),
        }
    }
}

/// Validates the structure of a flow model.
///
/// Returns all violations found, sorted by the guid they are reported against. Violations
/// of the same element keep the order of the checks. An empty list means the model
/// satisfies every structural invariant.
pub fn validate_graph(model: &FlowModel) -> Vec<Violation> {
    let mut violations = Vec::new();

    let root = model.root();
    if !model.contains(root) {
        violations.push(Violation::MissingRoot { root: root.clone() });
    }

    validate_keys(model, &mut violations);
    validate_references(model, &mut violations);
    validate_predecessors(model, &mut violations);
    validate_reachability(model, &mut violations);
    validate_element_shapes(model, &mut violations);
    detect_cycles(model, &mut violations);

    violations.sort_by(|a, b| a.guid().cmp(b.guid()));
    violations
}

fn validate_keys(model: &FlowModel, violations: &mut Vec<Violation>) {
    for key in model.sorted_guids() {
        if let Some(element) = model.get(key) {
            if &element.guid != key {
                violations.push(Violation::GuidMismatch {
                    key: key.clone(),
                    guid: element.guid.clone(),
                });
            }
        }
    }
}

fn validate_references(model: &FlowModel, violations: &mut Vec<Violation>) {
    for guid in model.sorted_guids() {
        let Some(element) = model.get(guid) else {
            continue;
        };
        let links = element
            .next
            .iter()
            .map(|t| (t, LinkKind::Next))
            .chain(element.branch_heads().map(|(i, t)| (t, LinkKind::Branch(i))))
            .chain(element.fault.iter().map(|t| (t, LinkKind::Fault)));

        for (target, link) in links {
            match model.get(target) {
                None => violations.push(Violation::DanglingReference {
                    source: guid.clone(),
                    target: target.clone(),
                    link,
                }),
                Some(t) if !t.is_canvas_element || !element.is_canvas_element => {
                    violations.push(Violation::NonCanvasReference {
                        source: guid.clone(),
                        target: target.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }
}

fn validate_predecessors(model: &FlowModel, violations: &mut Vec<Violation>) {
    let relations = model.relations();
    let root = model.root();
    for guid in model.sorted_guids() {
        let count = relations.incoming_all(guid).len();
        if guid == root {
            if count > 0 {
                violations.push(Violation::RootHasPredecessor { root: root.clone() });
            }
        } else if count > 1 {
            violations.push(Violation::MultiplePredecessors {
                guid: guid.clone(),
                count,
            });
        }
    }
}

fn validate_reachability(model: &FlowModel, violations: &mut Vec<Violation>) {
    let relations = model.relations();
    let reachable: AHashSet<Guid> = model.subgraph(model.root()).into_iter().collect();

    for guid in model.sorted_guids() {
        let Some(element) = model.get(guid) else {
            continue;
        };
        if !element.is_canvas_element || reachable.contains(guid) {
            continue;
        }
        if relations.incoming_all(guid).is_empty() {
            violations.push(Violation::OrphanedBranchHead { guid: guid.clone() });
        } else {
            violations.push(Violation::Orphaned { guid: guid.clone() });
        }
    }
}

fn validate_element_shapes(model: &FlowModel, violations: &mut Vec<Violation>) {
    let relations = model.relations();

    for guid in model.sorted_guids() {
        let Some(element) = model.get(guid) else {
            continue;
        };
        let element_type = element.element_type;

        if element_type.is_branching() && element.children.is_empty() {
            violations.push(Violation::EmptyBranchList { guid: guid.clone() });
        }
        if element_type.is_loop() && element.children.len() != 1 {
            violations.push(Violation::InvalidLoopBody {
                guid: guid.clone(),
                count: element.children.len(),
            });
        }
        if !element_type.has_children() && !element.children.is_empty() {
            violations.push(Violation::UnexpectedChildren {
                guid: guid.clone(),
                element_type,
            });
        }
        if element_type.is_terminal() && element.next.is_some() {
            violations.push(Violation::EndHasSuccessor { guid: guid.clone() });
        }
        if element.fault.is_some() && !element_type.supports_fault() {
            violations.push(Violation::FaultNotSupported {
                guid: guid.clone(),
                element_type,
            });
        }
        if element_type.is_terminal() && relations.is_inside_loop(guid) {
            violations.push(Violation::EndInsideLoop { guid: guid.clone() });
        }

        for (index, branch) in element.children.iter().enumerate() {
            if branch.merging == model.is_chain_ended(branch.head.as_deref()) {
                violations.push(Violation::StaleMergeState {
                    guid: guid.clone(),
                    index,
                });
            }
        }

        if element_type.is_branching() {
            if let Some(next) = &element.next {
                let all_ended = !element.children.is_empty()
                    && element
                        .children
                        .iter()
                        .all(|b| model.is_chain_ended(b.head.as_deref()));
                if all_ended {
                    violations.push(Violation::DeadContinuation {
                        guid: guid.clone(),
                        next: next.clone(),
                    });
                }
            }
        }
    }
}

/// Three-colour depth-first search over every structural link.
fn detect_cycles(model: &FlowModel, violations: &mut Vec<Violation>) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Active,
        Done,
    }

    let mut marks: AHashMap<&str, Mark> = AHashMap::new();
    let mut reported: AHashSet<&str> = AHashSet::new();

    for start in model.sorted_guids() {
        if marks.contains_key(start.as_str()) {
            continue;
        }
        // (guid, index of the next reference to explore)
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        marks.insert(start.as_str(), Mark::Active);

        while let Some((guid, cursor)) = stack.pop() {
            let Some(element) = model.get(guid) else {
                marks.insert(guid, Mark::Done);
                continue;
            };
            match element.references().nth(cursor) {
                Some(target) => {
                    stack.push((guid, cursor + 1));
                    match marks.get(target.as_str()) {
                        Some(Mark::Active) => {
                            if reported.insert(target.as_str()) {
                                violations.push(Violation::Cycle {
                                    guid: target.clone(),
                                });
                            }
                        }
                        Some(Mark::Done) => {}
                        None if model.contains(target) => {
                            marks.insert(target.as_str(), Mark::Active);
                            stack.push((target.as_str(), 0));
                        }
                        None => {}
                    }
                }
                None => {
                    marks.insert(guid, Mark::Done);
                }
            }
        }
    }
}
