//! Selection, focus and menu state of the canvas, independent of any UI toolkit.

pub mod deferred;
pub mod selection;

pub use deferred::{DeferredAction, DeferredKind, DeferredQueue, Ticket};
pub use selection::SelectionState;

use crate::error::CommandError;
use crate::model::{FlowModel, Guid, LinkKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interaction mode of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanvasMode {
    /// Editing: connectors offer "Add Element" affordances.
    #[default]
    Default,
    /// Marquee and click selection of elements for copy.
    Selection,
    /// Choosing an ended branch to merge back.
    Reconnect,
}

impl fmt::Display for CanvasMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CanvasMode::Default => "default",
            CanvasMode::Selection => "selection",
            CanvasMode::Reconnect => "reconnect",
        };
        f.write_str(name)
    }
}

impl FromStr for CanvasMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(CanvasMode::Default),
            "selection" => Ok(CanvasMode::Selection),
            "reconnect" => Ok(CanvasMode::Reconnect),
            other => Err(format!("Unknown canvas mode '{}'", other)),
        }
    }
}

/// Everything about the canvas that is not part of the flow itself.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    mode: CanvasMode,
    selection: SelectionState,
    focus: Option<Guid>,
    open_menu: Option<Guid>,
    deferred: DeferredQueue,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CanvasMode {
        self.mode
    }

    /// Switches mode. Leaving selection mode drops the selection and any open menu closes.
    pub fn set_mode(&mut self, mode: CanvasMode) {
        if self.mode == CanvasMode::Selection && mode != CanvasMode::Selection {
            self.selection.clear();
        }
        self.mode = mode;
        self.open_menu = None;
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn is_selected(&self, guid: &str) -> bool {
        self.selection.contains(guid)
    }

    pub fn select(&mut self, model: &FlowModel, guid: &str) -> Result<bool, CommandError> {
        self.selection.select(model, guid)
    }

    pub fn deselect(&mut self, guid: &str) -> bool {
        self.selection.deselect(guid)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn open_menu(&self) -> Option<&str> {
        self.open_menu.as_deref()
    }

    /// Opens the menu of `guid`, or closes it if it is already open. A pending hide is
    /// superseded so it cannot close the menu that was just opened.
    pub fn toggle_menu(&mut self, guid: &str) -> bool {
        self.deferred.supersede(DeferredKind::HideMenu);
        if self.open_menu.as_deref() == Some(guid) {
            self.open_menu = None;
            false
        } else {
            self.open_menu = Some(guid.to_string());
            true
        }
    }

    /// Schedules the open menu to close once pending events are handled.
    pub fn close_menu(&mut self) -> Ticket {
        self.deferred.schedule(DeferredAction::HideMenu)
    }

    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn set_focus(&mut self, guid: Option<Guid>) {
        self.focus = guid;
    }

    /// Schedules focus to move to `guid` once pending events are handled.
    pub fn restore_focus(&mut self, guid: &str) -> Ticket {
        self.deferred
            .schedule(DeferredAction::RestoreFocus(guid.to_string()))
    }

    pub fn deferred(&self) -> &DeferredQueue {
        &self.deferred
    }

    /// Runs the deferred actions that were not superseded. Returns how many ran.
    pub fn run_deferred(&mut self, model: &FlowModel) -> usize {
        let actions = self.deferred.drain_current();
        let count = actions.len();
        for action in actions {
            match action {
                DeferredAction::HideMenu => self.open_menu = None,
                DeferredAction::RestoreFocus(guid) => {
                    if model.contains(&guid) {
                        self.focus = Some(guid);
                    }
                }
            }
        }
        count
    }

    /// Moves focus along `next`. With nothing focused, focuses the root.
    pub fn focus_next(&mut self, model: &FlowModel) -> Option<&str> {
        self.move_focus(model, |model, guid| {
            model.get(guid).and_then(|e| e.next.clone())
        })
    }

    pub fn focus_previous(&mut self, model: &FlowModel) -> Option<&str> {
        self.move_focus(model, |model, guid| {
            model
                .relations()
                .incoming(guid)
                .filter(|link| link.kind == LinkKind::Next)
                .map(|link| link.from.clone())
        })
    }

    /// Moves focus into the first non-empty branch, or the fault path.
    pub fn focus_child(&mut self, model: &FlowModel) -> Option<&str> {
        self.move_focus(model, |model, guid| {
            let element = model.get(guid)?;
            element
                .branch_heads()
                .map(|(_, head)| head.clone())
                .next()
                .or_else(|| element.fault.clone())
        })
    }

    /// Moves focus to the element owning the enclosing branch or fault path.
    pub fn focus_parent(&mut self, model: &FlowModel) -> Option<&str> {
        self.move_focus(model, |model, guid| {
            model.relations().ancestors(guid).into_iter().next()
        })
    }

    fn move_focus(
        &mut self,
        model: &FlowModel,
        step: impl Fn(&FlowModel, &str) -> Option<Guid>,
    ) -> Option<&str> {
        let target = match self.focus.as_deref().filter(|g| model.contains(g)) {
            Some(current) => step(model, current).or_else(|| Some(current.to_string())),
            None => Some(model.root().clone()),
        };
        self.focus = target;
        self.focus.as_deref()
    }

    /// Drops selection, focus and menu references to elements that no longer exist.
    pub fn retain_existing(&mut self, model: &FlowModel) {
        self.selection.retain_existing(model);
        if self.focus.as_deref().is_some_and(|g| !model.contains(g)) {
            self.focus = None;
        }
        if self.open_menu.as_deref().is_some_and(|g| !model.contains(g)) {
            self.open_menu = None;
        }
    }
}
