use super::element::Guid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The structural role of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Regular,
    Branch(usize),
    Merge,
    Fault,
    /// Loop icon into the head of its body ("for each").
    LoopNext,
    /// Tagged back-edge from the end of a loop body to the loop. Never a structural successor.
    LoopBack,
    /// Loop icon to the element after the loop ("after last").
    LoopEnd,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Regular => write!(f, "regular"),
            EdgeKind::Branch(i) => write!(f, "branch[{}]", i),
            EdgeKind::Merge => write!(f, "merge"),
            EdgeKind::Fault => write!(f, "fault"),
            EdgeKind::LoopNext => write!(f, "loop-next"),
            EdgeKind::LoopBack => write!(f, "loop-back"),
            EdgeKind::LoopEnd => write!(f, "loop-end"),
        }
    }
}

/// Where a connection ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionTarget {
    Element(Guid),
    /// Placeholder insertion point at the end of a dangling chain or inside an empty branch.
    Stub,
}

/// A directed edge derived from the flow model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source: Guid,
    pub target: ConnectionTarget,
    pub kind: EdgeKind,
}

impl Connection {
    pub fn to_element(source: &str, target: &str, kind: EdgeKind) -> Self {
        Self {
            source: source.to_string(),
            target: ConnectionTarget::Element(target.to_string()),
            kind,
        }
    }

    pub fn to_stub(source: &str, kind: EdgeKind) -> Self {
        Self {
            source: source.to_string(),
            target: ConnectionTarget::Stub,
            kind,
        }
    }

    pub fn target_guid(&self) -> Option<&Guid> {
        match &self.target {
            ConnectionTarget::Element(guid) => Some(guid),
            ConnectionTarget::Stub => None,
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            ConnectionTarget::Element(t) => write!(f, "{} -{}-> {}", self.source, self.kind, t),
            ConnectionTarget::Stub => write!(f, "{} -{}-> (stub)", self.source, self.kind),
        }
    }
}
