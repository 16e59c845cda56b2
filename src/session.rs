//! An editing session: the single owner of a `FlowModel`.
//!
//! UI components raise `CanvasEvent` payloads. Structural events go through the mutation
//! engine; every accepted mutation is laid out before it is committed, so the model,
//! the history and the render tree always change together or not at all.

use crate::error::{CommandError, SessionError};
use crate::history::UndoStack;
use crate::interaction::{CanvasMode, InteractionState};
use crate::layout::{LayoutConfig, LayoutEngine, RenderTree};
use crate::model::{ElementType, FlowModel, Guid, LinkKind};
use crate::mutation::{
    Anchor, Command, CopiedSubgraph, IdGenerator, MutationEngine, SequentialIds,
    StructuralDiff, UuidIds,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Number of model snapshots kept for undo.
    pub history_limit: usize,
    /// Prefix of sequential guids for new elements. `None` uses random uuids.
    pub id_prefix: Option<String>,
    pub layout: LayoutConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            id_prefix: Some("element_".to_string()),
            layout: LayoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanvasEventType {
    Add,
    Delete,
    Move,
    Copy,
    Paste,
    MergeBranch,
    Reconnect,
    ToggleMenu,
    CloseMenu,
    Select,
    Deselect,
    ClearSelection,
    SetMode,
    FocusNext,
    FocusPrevious,
    FocusChild,
    FocusParent,
    Undo,
    Redo,
}

impl fmt::Display for CanvasEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        f.pad(json.as_str().unwrap_or_default())
    }
}

/// Structured event payload raised by the canvas UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEvent {
    #[serde(rename = "type")]
    pub event_type: CanvasEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<Guid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Last element of a copied range; the range starts at `element_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_id: Option<Guid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CanvasMode>,
}

impl CanvasEvent {
    pub fn new(event_type: CanvasEventType) -> Self {
        Self {
            event_type,
            element_id: None,
            anchor: None,
            element_type: None,
            branch_index: None,
            label: None,
            bottom_id: None,
            mode: None,
        }
    }

    pub fn add(anchor: Anchor, element_type: ElementType) -> Self {
        Self {
            anchor: Some(anchor),
            element_type: Some(element_type),
            ..Self::new(CanvasEventType::Add)
        }
    }

    pub fn on(event_type: CanvasEventType, element_id: &str) -> Self {
        Self {
            element_id: Some(element_id.to_string()),
            ..Self::new(event_type)
        }
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_branch_index(mut self, index: usize) -> Self {
        self.branch_index = Some(index);
        self
    }

    pub fn with_mode(mut self, mode: CanvasMode) -> Self {
        self.mode = Some(mode);
        self
    }

    fn require_element(&self) -> Result<&Guid, CommandError> {
        self.element_id.as_ref().ok_or_else(|| self.missing("elementId"))
    }

    fn require_anchor(&self) -> Result<&Anchor, CommandError> {
        self.anchor.as_ref().ok_or_else(|| self.missing("anchor"))
    }

    fn missing(&self, field: &str) -> CommandError {
        CommandError::MissingField {
            event: self.event_type.to_string(),
            field: field.to_string(),
        }
    }
}

/// What a dispatched event changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The model was replaced by an accepted mutation.
    Mutated {
        diff: StructuralDiff,
        inserted: Vec<Guid>,
    },
    /// The model was restored from history.
    Restored,
    /// Only selection, focus, menus, mode or the clipboard changed.
    Interaction,
    /// Nothing to do, such as undo at the oldest state.
    Unchanged,
}

pub struct EditorSession {
    model: FlowModel,
    layout: LayoutEngine,
    mutations: MutationEngine,
    history: UndoStack,
    interaction: InteractionState,
    clipboard: Option<CopiedSubgraph>,
    tree: RenderTree,
}

impl EditorSession {
    /// Opens a session on `model`, laying it out and recording the initial snapshot.
    pub fn new(model: FlowModel, config: SessionConfig) -> Result<Self, SessionError> {
        let layout = LayoutEngine::builder(config.layout.clone()).build();
        Self::with_layout_engine(model, config, layout)
    }

    pub fn with_layout_engine(
        model: FlowModel,
        config: SessionConfig,
        layout: LayoutEngine,
    ) -> Result<Self, SessionError> {
        let ids: Box<dyn IdGenerator> = match &config.id_prefix {
            Some(prefix) => Box::new(SequentialIds::new(prefix)),
            None => Box::new(UuidIds),
        };
        let interaction = InteractionState::new();
        let tree = layout.compute_layout(&model, interaction.mode())?;
        let mut history = UndoStack::new(config.history_limit);
        history.push(&model)?;

        log::debug!("Opened session on flow '{}' ({} elements)", model.root(), model.len());
        Ok(Self {
            model,
            layout,
            mutations: MutationEngine::new(ids),
            history,
            interaction,
            clipboard: None,
            tree,
        })
    }

    pub fn model(&self) -> &FlowModel {
        &self.model
    }

    pub fn into_model(self) -> FlowModel {
        self.model
    }

    pub fn render_tree(&self) -> &RenderTree {
        &self.tree
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn clipboard(&self) -> Option<&CopiedSubgraph> {
        self.clipboard.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Applies a command. On any failure the model, history and render tree are untouched.
    pub fn apply(&mut self, command: &Command) -> Result<Effect, SessionError> {
        let mutation = self.mutations.apply(&self.model, command)?;
        let tree = self
            .layout
            .compute_layout(&mutation.model, self.interaction.mode())?;
        self.history.push(&mutation.model)?;

        self.model = mutation.model;
        self.commit_tree(tree);
        Ok(Effect::Mutated {
            diff: mutation.diff,
            inserted: mutation.inserted,
        })
    }

    /// Handles one UI event.
    pub fn dispatch(&mut self, event: &CanvasEvent) -> Result<Effect, SessionError> {
        log::debug!("Dispatching '{}' event", event.event_type);
        let result = self.handle(event);
        if let Err(err) = &result {
            log::warn!("Rejected '{}' event: {}", event.event_type, err);
        }
        self.tree.decorate(&self.interaction);
        result
    }

    /// Runs deferred UI actions that were not superseded by later events.
    pub fn run_deferred(&mut self) -> usize {
        let count = self.interaction.run_deferred(&self.model);
        self.tree.decorate(&self.interaction);
        count
    }

    fn handle(&mut self, event: &CanvasEvent) -> Result<Effect, SessionError> {
        match event.event_type {
            CanvasEventType::Add => {
                let element_type = event
                    .element_type
                    .ok_or_else(|| event.missing("elementType"))?;
                let command = Command::AddElement {
                    anchor: event.require_anchor()?.clone(),
                    element_type,
                    label: event.label.clone(),
                };
                let effect = self.apply(&command)?;
                if let Effect::Mutated { inserted, .. } = &effect {
                    if let Some(guid) = inserted.first() {
                        self.interaction.restore_focus(guid);
                    }
                }
                Ok(effect)
            }
            CanvasEventType::Delete => {
                let guid = event.require_element()?.clone();
                let predecessor = self
                    .model
                    .relations()
                    .incoming(&guid)
                    .map(|link| link.from.clone());
                let effect = self.apply(&Command::DeleteElement {
                    guid,
                    keep_branch: event.branch_index,
                })?;
                if let Some(predecessor) = predecessor {
                    self.interaction.restore_focus(&predecessor);
                }
                Ok(effect)
            }
            CanvasEventType::Move => self.apply(&Command::MoveElement {
                guid: event.require_element()?.clone(),
                anchor: event.require_anchor()?.clone(),
            }),
            CanvasEventType::Copy => {
                let (top, bottom) = match &event.element_id {
                    Some(top) => (
                        top.clone(),
                        event.bottom_id.clone().unwrap_or_else(|| top.clone()),
                    ),
                    None => self
                        .interaction
                        .selection()
                        .contiguous_range(&self.model)?,
                };
                let copied = CopiedSubgraph::copy(&self.model, &top, &bottom)?;
                log::debug!("Copied {} elements from '{}' to '{}'", copied.len(), top, bottom);
                self.clipboard = Some(copied);
                Ok(Effect::Interaction)
            }
            CanvasEventType::Paste => {
                let clipboard = self.clipboard.clone().ok_or_else(|| {
                    CommandError::InvalidSelection {
                        reason: "nothing has been copied".to_string(),
                    }
                })?;
                self.apply(&Command::Paste {
                    clipboard,
                    anchor: event.require_anchor()?.clone(),
                })
            }
            CanvasEventType::MergeBranch => {
                let index = event
                    .branch_index
                    .ok_or_else(|| event.missing("branchIndex"))?;
                self.apply(&Command::MergeBranch {
                    parent: event.require_element()?.clone(),
                    index,
                })
            }
            CanvasEventType::Reconnect => {
                let effect = self.apply(&Command::Reconnect {
                    end: event.require_element()?.clone(),
                })?;
                self.change_mode(CanvasMode::Default)?;
                Ok(effect)
            }
            CanvasEventType::ToggleMenu => {
                let guid = event.require_element()?;
                self.model.get_element(guid)?;
                self.interaction.toggle_menu(guid);
                Ok(Effect::Interaction)
            }
            CanvasEventType::CloseMenu => {
                self.interaction.close_menu();
                Ok(Effect::Interaction)
            }
            CanvasEventType::Select => {
                let guid = event.require_element()?;
                self.interaction.select(&self.model, guid)?;
                Ok(Effect::Interaction)
            }
            CanvasEventType::Deselect => {
                self.interaction.deselect(event.require_element()?);
                Ok(Effect::Interaction)
            }
            CanvasEventType::ClearSelection => {
                self.interaction.clear_selection();
                Ok(Effect::Interaction)
            }
            CanvasEventType::SetMode => {
                let mode = event.mode.ok_or_else(|| event.missing("mode"))?;
                self.change_mode(mode)?;
                Ok(Effect::Interaction)
            }
            CanvasEventType::FocusNext => {
                self.interaction.focus_next(&self.model);
                Ok(Effect::Interaction)
            }
            CanvasEventType::FocusPrevious => {
                self.interaction.focus_previous(&self.model);
                Ok(Effect::Interaction)
            }
            CanvasEventType::FocusChild => {
                self.interaction.focus_child(&self.model);
                Ok(Effect::Interaction)
            }
            CanvasEventType::FocusParent => {
                self.interaction.focus_parent(&self.model);
                Ok(Effect::Interaction)
            }
            CanvasEventType::Undo => self.undo(),
            CanvasEventType::Redo => self.redo(),
        }
    }

    pub fn undo(&mut self) -> Result<Effect, SessionError> {
        let Some(restored) = self.history.undo() else {
            return Ok(Effect::Unchanged);
        };
        match restored.map_err(SessionError::from).and_then(|model| self.restore(model)) {
            Ok(effect) => Ok(effect),
            Err(err) => {
                self.history.step_forward();
                Err(err)
            }
        }
    }

    pub fn redo(&mut self) -> Result<Effect, SessionError> {
        let Some(restored) = self.history.redo() else {
            return Ok(Effect::Unchanged);
        };
        match restored.map_err(SessionError::from).and_then(|model| self.restore(model)) {
            Ok(effect) => Ok(effect),
            Err(err) => {
                self.history.step_back();
                Err(err)
            }
        }
    }

    fn restore(&mut self, model: FlowModel) -> Result<Effect, SessionError> {
        let tree = self.layout.compute_layout(&model, self.interaction.mode())?;
        log::debug!("Restored flow with {} elements", model.len());
        self.model = model;
        self.commit_tree(tree);
        Ok(Effect::Restored)
    }

    fn change_mode(&mut self, mode: CanvasMode) -> Result<(), SessionError> {
        if mode == self.interaction.mode() {
            return Ok(());
        }
        let tree = self.layout.compute_layout(&self.model, mode)?;
        self.interaction.set_mode(mode);
        self.tree = tree;
        Ok(())
    }

    fn commit_tree(&mut self, tree: RenderTree) {
        self.tree = tree;
        self.interaction.retain_existing(&self.model);
    }

    /// The predecessor link of an element, as an anchor that would re-insert it.
    pub fn anchor_of(&self, guid: &str) -> Option<Anchor> {
        let link = self.model.relations().incoming(guid)?.clone();
        Some(match link.kind {
            LinkKind::Next => Anchor::After { guid: link.from },
            LinkKind::Branch(index) => Anchor::Branch {
                parent: link.from,
                index,
            },
            LinkKind::Fault => Anchor::Fault { guid: link.from },
        })
    }
}
