use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of an element.
pub type Guid = String;

/// The kind of process element a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Start,
    End,
    Screen,
    Decision,
    Wait,
    Loop,
    Assignment,
    RecordCreate,
    RecordUpdate,
    RecordLookup,
    RecordDelete,
    ActionCall,
    Subflow,
    // Resources, never drawn on the canvas
    Variable,
    Formula,
}

impl ElementType {
    pub const ALL: [ElementType; 15] = [
        ElementType::Start,
        ElementType::End,
        ElementType::Screen,
        ElementType::Decision,
        ElementType::Wait,
        ElementType::Loop,
        ElementType::Assignment,
        ElementType::RecordCreate,
        ElementType::RecordUpdate,
        ElementType::RecordLookup,
        ElementType::RecordDelete,
        ElementType::ActionCall,
        ElementType::Subflow,
        ElementType::Variable,
        ElementType::Formula,
    ];

    /// Decision and Wait fan out into labelled branches that merge again.
    pub fn is_branching(self) -> bool {
        matches!(self, ElementType::Decision | ElementType::Wait)
    }

    pub fn is_loop(self) -> bool {
        matches!(self, ElementType::Loop)
    }

    /// Any element that owns child branches (including a loop body).
    pub fn has_children(self) -> bool {
        self.is_branching() || self.is_loop()
    }

    pub fn supports_fault(self) -> bool {
        matches!(
            self,
            ElementType::RecordCreate
                | ElementType::RecordUpdate
                | ElementType::RecordLookup
                | ElementType::RecordDelete
                | ElementType::ActionCall
                | ElementType::Subflow
                | ElementType::Wait
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ElementType::End)
    }

    pub fn is_canvas_element(self) -> bool {
        !matches!(self, ElementType::Variable | ElementType::Formula)
    }

    /// Labels of the branches a freshly created element starts with.
    pub fn default_branch_labels(self) -> &'static [&'static str] {
        match self {
            ElementType::Decision => &["Outcome 1", "Default Outcome"],
            ElementType::Wait => &["Event 1", "Default Path"],
            ElementType::Loop => &["For Each"],
            _ => &[],
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ElementType::Start => "Start",
            ElementType::End => "End",
            ElementType::Screen => "Screen",
            ElementType::Decision => "Decision",
            ElementType::Wait => "Wait",
            ElementType::Loop => "Loop",
            ElementType::Assignment => "Assignment",
            ElementType::RecordCreate => "Create Records",
            ElementType::RecordUpdate => "Update Records",
            ElementType::RecordLookup => "Get Records",
            ElementType::RecordDelete => "Delete Records",
            ElementType::ActionCall => "Action",
            ElementType::Subflow => "Subflow",
            ElementType::Variable => "Variable",
            ElementType::Formula => "Formula",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

/// An ordered association between a branching parent and the head of a child chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub label: String,
    /// First element of the branch, `None` for an empty branch.
    pub head: Option<Guid>,
    /// True when the branch reconverges at the parent's merge point,
    /// false when it is ended by an `End` element.
    pub merging: bool,
}

impl Branch {
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            head: None,
            merging: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

/// A node in the flow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub guid: Guid,
    pub element_type: ElementType,
    pub label: String,
    /// Structural successor, `None` marks the end of the chain.
    pub next: Option<Guid>,
    pub children: Vec<Branch>,
    pub fault: Option<Guid>,
    pub is_canvas_element: bool,
}

impl Element {
    /// Creates an element with the default branches of its type and no successor.
    pub fn new(guid: impl Into<Guid>, element_type: ElementType, label: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            element_type,
            label: label.into(),
            next: None,
            children: element_type
                .default_branch_labels()
                .iter()
                .map(|label| Branch::empty(*label))
                .collect(),
            fault: None,
            is_canvas_element: element_type.is_canvas_element(),
        }
    }

    pub fn branch_heads(&self) -> impl Iterator<Item = (usize, &Guid)> + '_ {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.head.as_ref().map(|h| (i, h)))
    }

    /// Every guid this element references structurally.
    pub fn references(&self) -> impl Iterator<Item = &Guid> + '_ {
        self.next
            .iter()
            .chain(self.children.iter().filter_map(|b| b.head.as_ref()))
            .chain(self.fault.iter())
    }

    pub fn non_empty_branches(&self) -> Vec<usize> {
        self.branch_heads().map(|(i, _)| i).collect()
    }
}
