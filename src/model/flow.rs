use super::connection::{Connection, EdgeKind};
use super::element::{Element, Guid};
use crate::error::ModelError;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// The canonical flow graph: elements keyed by guid plus a distinguished root.
///
/// A `FlowModel` is only ever replaced, never edited in place, by code outside this crate.
/// Structural edits go through the mutation engine, which produces a new model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowModel {
    root: Guid,
    elements: AHashMap<Guid, Element>,
}

impl FlowModel {
    /// Creates a model holding only its root element.
    pub fn new(root: Element) -> Self {
        let mut elements = AHashMap::new();
        let guid = root.guid.clone();
        elements.insert(guid.clone(), root);
        Self {
            root: guid,
            elements,
        }
    }

    pub(crate) fn from_parts(root: Guid, elements: AHashMap<Guid, Element>) -> Self {
        let mut model = Self { root, elements };
        model.refresh_merge_state();
        model
    }

    pub fn root(&self) -> &Guid {
        &self.root
    }

    pub fn root_element(&self) -> Result<&Element, ModelError> {
        self.get_element(&self.root)
    }

    /// Returns the element with the given guid.
    pub fn get_element(&self, guid: &str) -> Result<&Element, ModelError> {
        self.elements.get(guid).ok_or_else(|| ModelError::NotFound {
            guid: guid.to_string(),
        })
    }

    pub fn get(&self, guid: &str) -> Option<&Element> {
        self.elements.get(guid)
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.elements.contains_key(guid)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.elements.values()
    }

    /// All guids in ascending order, for deterministic iteration.
    pub fn sorted_guids(&self) -> Vec<&Guid> {
        let mut guids: Vec<&Guid> = self.elements.keys().collect();
        guids.sort();
        guids
    }

    pub(crate) fn get_mut(&mut self, guid: &str) -> Result<&mut Element, ModelError> {
        self.elements
            .get_mut(guid)
            .ok_or_else(|| ModelError::NotFound {
                guid: guid.to_string(),
            })
    }

    pub(crate) fn insert(&mut self, element: Element) {
        self.elements.insert(element.guid.clone(), element);
    }

    pub(crate) fn remove(&mut self, guid: &str) -> Option<Element> {
        self.elements.remove(guid)
    }

    /// Lazily walks a chain from `head` along `next` links.
    ///
    /// The walk stops at the chain's null successor, at a missing element, or when an element
    /// would be visited twice, so it is always finite. Call it again to restart.
    pub fn traverse_branch(&self, head: &str) -> BranchIter<'_> {
        BranchIter {
            model: self,
            next: self.get(head),
            seen: AHashSet::new(),
        }
    }

    pub(crate) fn chain(&self, head: Option<&str>) -> BranchIter<'_> {
        BranchIter {
            model: self,
            next: head.and_then(|h| self.get(h)),
            seen: AHashSet::new(),
        }
    }

    pub fn chain_tail(&self, head: &str) -> Option<&Element> {
        self.traverse_branch(head).last()
    }

    /// Every element reachable from `head` through `next`, branch and fault links,
    /// `head` included. Order is depth-first and deterministic.
    pub fn subgraph(&self, head: &str) -> Vec<Guid> {
        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        self.collect_subgraph(head, &mut seen, &mut out);
        out
    }

    /// The element's branches and fault path, excluding the element itself and its `next`.
    pub fn descendants(&self, guid: &str) -> Vec<Guid> {
        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        seen.insert(guid.to_string());
        if let Some(element) = self.get(guid) {
            for head in element.children.iter().filter_map(|b| b.head.as_deref()) {
                self.collect_subgraph(head, &mut seen, &mut out);
            }
            if let Some(fault) = element.fault.as_deref() {
                self.collect_subgraph(fault, &mut seen, &mut out);
            }
        }
        out
    }

    fn collect_subgraph(&self, head: &str, seen: &mut AHashSet<Guid>, out: &mut Vec<Guid>) {
        let mut current = self.get(head);
        while let Some(element) = current {
            if !seen.insert(element.guid.clone()) {
                return;
            }
            out.push(element.guid.clone());
            for branch_head in element.children.iter().filter_map(|b| b.head.as_deref()) {
                self.collect_subgraph(branch_head, seen, out);
            }
            if let Some(fault) = element.fault.as_deref() {
                self.collect_subgraph(fault, seen, out);
            }
            current = element.next.as_deref().and_then(|n| self.get(n));
        }
    }

    /// Builds the predecessor index for this model.
    pub fn relations(&self) -> Relations<'_> {
        Relations::new(self)
    }

    /// True when the chain starting at `head` terminates the flow instead of merging:
    /// its tail is an `End`, or a branching element whose branches are all ended.
    pub fn is_chain_ended(&self, head: Option<&str>) -> bool {
        let mut seen = AHashSet::new();
        self.chain_ended(head, &mut seen)
    }

    fn chain_ended(&self, head: Option<&str>, seen: &mut AHashSet<Guid>) -> bool {
        let Some(tail) = self.chain(head).last() else {
            return false;
        };
        if !seen.insert(tail.guid.clone()) {
            return false;
        }
        if tail.element_type.is_terminal() {
            return true;
        }
        tail.element_type.is_branching()
            && tail.next.is_none()
            && !tail.children.is_empty()
            && tail
                .children
                .iter()
                .all(|b| self.chain_ended(b.head.as_deref(), seen))
    }

    /// Recomputes the `merging` flag of every branch from the structure.
    pub(crate) fn refresh_merge_state(&mut self) {
        let updates: Vec<(Guid, Vec<bool>)> = self
            .elements
            .values()
            .filter(|e| !e.children.is_empty())
            .map(|e| {
                let flags = e
                    .children
                    .iter()
                    .map(|b| !self.is_chain_ended(b.head.as_deref()))
                    .collect();
                (e.guid.clone(), flags)
            })
            .collect();

        for (guid, flags) in updates {
            if let Some(element) = self.elements.get_mut(&guid) {
                for (branch, merging) in element.children.iter_mut().zip(flags) {
                    branch.merging = merging;
                }
            }
        }
    }

    /// Derives every connection of the canvas, sorted by source guid.
    pub fn connections(&self) -> Vec<Connection> {
        let relations = self.relations();
        let mut out = Vec::new();

        for guid in self.sorted_guids() {
            let element = &self.elements[guid];
            if !element.is_canvas_element {
                continue;
            }

            if element.element_type.is_loop() {
                let body = element.children.first().and_then(|b| b.head.as_deref());
                out.push(match body {
                    Some(head) => Connection::to_element(guid, head, EdgeKind::LoopNext),
                    None => Connection::to_stub(guid, EdgeKind::LoopNext),
                });
            } else {
                for (index, branch) in element.children.iter().enumerate() {
                    out.push(match &branch.head {
                        Some(head) => Connection::to_element(guid, head, EdgeKind::Branch(index)),
                        None => Connection::to_stub(guid, EdgeKind::Branch(index)),
                    });
                }
            }

            if let Some(fault) = &element.fault {
                out.push(Connection::to_element(guid, fault, EdgeKind::Fault));
            }

            let exit_kind = if element.element_type.is_loop() {
                EdgeKind::LoopEnd
            } else {
                EdgeKind::Regular
            };
            match &element.next {
                Some(next) => out.push(Connection::to_element(guid, next, exit_kind)),
                None if element.element_type.is_terminal() => {}
                None if element.element_type.is_branching()
                    && self.is_chain_ended(Some(guid.as_str())) => {}
                None => out.push(match relations.continuation(guid) {
                    Continuation::Element(target) => {
                        let kind = if exit_kind == EdgeKind::LoopEnd {
                            exit_kind
                        } else {
                            EdgeKind::Merge
                        };
                        Connection::to_element(guid, &target, kind)
                    }
                    Continuation::LoopBack(target) if exit_kind == EdgeKind::LoopEnd => {
                        Connection::to_element(guid, &target, EdgeKind::LoopEnd)
                    }
                    Continuation::LoopBack(target) => {
                        Connection::to_element(guid, &target, EdgeKind::LoopBack)
                    }
                    Continuation::Dangling => Connection::to_stub(guid, exit_kind),
                }),
            }
        }
        out
    }
}

/// Lazy, finite walk along `next` links. Cloning restarts from the same position.
#[derive(Clone)]
pub struct BranchIter<'a> {
    model: &'a FlowModel,
    next: Option<&'a Element>,
    seen: AHashSet<&'a str>,
}

impl<'a> Iterator for BranchIter<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let current = self.next.take()?;
        if !self.seen.insert(current.guid.as_str()) {
            return None;
        }
        self.next = current.next.as_deref().and_then(|n| self.model.get(n));
        Some(current)
    }
}

/// How an element is referenced by its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Next,
    Branch(usize),
    Fault,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub from: Guid,
    pub kind: LinkKind,
}

/// Where control goes once a chain runs out of `next` links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// The merge point of an enclosing branching element.
    Element(Guid),
    /// The end of a loop body, returning to the loop.
    LoopBack(Guid),
    /// End of the main line or of a fault path.
    Dangling,
}

/// Predecessor index over a `FlowModel`.
pub struct Relations<'a> {
    model: &'a FlowModel,
    incoming: AHashMap<&'a str, Vec<Link>>,
}

impl<'a> Relations<'a> {
    fn new(model: &'a FlowModel) -> Self {
        let mut incoming: AHashMap<&'a str, Vec<Link>> = AHashMap::new();
        for guid in model.sorted_guids() {
            let element = &model.elements[guid];
            if let Some(next) = &element.next {
                incoming.entry(next.as_str()).or_default().push(Link {
                    from: guid.clone(),
                    kind: LinkKind::Next,
                });
            }
            for (index, head) in element.branch_heads() {
                incoming.entry(head.as_str()).or_default().push(Link {
                    from: guid.clone(),
                    kind: LinkKind::Branch(index),
                });
            }
            if let Some(fault) = &element.fault {
                incoming.entry(fault.as_str()).or_default().push(Link {
                    from: guid.clone(),
                    kind: LinkKind::Fault,
                });
            }
        }
        Self { model, incoming }
    }

    /// The single predecessor link of `guid`, if any.
    pub fn incoming(&self, guid: &str) -> Option<&Link> {
        self.incoming.get(guid).and_then(|links| links.first())
    }

    pub fn incoming_all(&self, guid: &str) -> &[Link] {
        self.incoming.get(guid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Walks `next` links backwards to the first element of the chain containing `guid`.
    pub fn chain_head(&self, guid: &str) -> Guid {
        let mut current = guid.to_string();
        for _ in 0..=self.model.len() {
            match self.incoming(&current) {
                Some(Link {
                    from,
                    kind: LinkKind::Next,
                }) => current = from.clone(),
                _ => break,
            }
        }
        current
    }

    /// The branching parent and branch index of the chain containing `guid`.
    pub fn enclosing_branch(&self, guid: &str) -> Option<(Guid, usize)> {
        let head = self.chain_head(guid);
        match self.incoming(&head) {
            Some(Link {
                from,
                kind: LinkKind::Branch(index),
            }) => Some((from.clone(), *index)),
            _ => None,
        }
    }

    /// True when `guid` sits somewhere inside a loop body.
    pub fn is_inside_loop(&self, guid: &str) -> bool {
        self.ancestors(guid).iter().any(|a| {
            self.model
                .get(a)
                .is_some_and(|e| e.element_type.is_loop())
        })
    }

    /// True when `guid` sits somewhere inside a fault path.
    pub fn is_inside_fault(&self, guid: &str) -> bool {
        let mut current = guid.to_string();
        for _ in 0..=self.model.len() {
            let head = self.chain_head(&current);
            match self.incoming(&head) {
                Some(Link {
                    kind: LinkKind::Fault,
                    ..
                }) => return true,
                Some(Link {
                    from,
                    kind: LinkKind::Branch(_),
                }) => current = from.clone(),
                _ => return false,
            }
        }
        false
    }

    /// Owners of the enclosing branches and fault paths, innermost first.
    pub fn ancestors(&self, guid: &str) -> Vec<Guid> {
        let mut out = Vec::new();
        let mut current = guid.to_string();
        for _ in 0..=self.model.len() {
            let head = self.chain_head(&current);
            match self.incoming(&head) {
                Some(Link {
                    from,
                    kind: LinkKind::Branch(_) | LinkKind::Fault,
                }) => {
                    out.push(from.clone());
                    current = from.clone();
                }
                _ => break,
            }
        }
        out
    }

    /// Resolves where control flows after the chain containing `guid` ends.
    pub fn continuation(&self, guid: &str) -> Continuation {
        let mut current = guid.to_string();
        for _ in 0..=self.model.len() {
            let Some((parent_guid, _)) = self.enclosing_branch(&current) else {
                return Continuation::Dangling;
            };
            let Some(parent) = self.model.get(&parent_guid) else {
                return Continuation::Dangling;
            };
            if parent.element_type.is_loop() {
                return Continuation::LoopBack(parent_guid);
            }
            match &parent.next {
                Some(next) => return Continuation::Element(next.clone()),
                None => current = parent_guid,
            }
        }
        Continuation::Dangling
    }
}
