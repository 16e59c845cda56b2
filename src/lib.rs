//! # FlowCanvas - Auto-Layout Canvas Engine for Visual Flow Authoring
//!
//! **FlowCanvas** is the engine behind a visual flow builder: it turns a flow model (a graph
//! of process elements linked by successor, branch and fault references) into an
//! absolutely positioned render tree, and it performs structural edits on that model
//! without ever leaving it in an invalid state.
//!
//! ## Core Workflow
//!
//! The engine is format-agnostic. It operates on a canonical `FlowModel`. The primary
//! workflow is:
//!
//! 1.  **Load Your Flow**: Parse your flow metadata into your own structs, then implement
//!     `IntoFlowModel` (or build a `FlowDefinition` directly) to get a `FlowModel`.
//! 2.  **Open a Session**: `EditorSession::new` lays the model out and records the first
//!     undo snapshot.
//! 3.  **Dispatch Events**: Feed `CanvasEvent` payloads from the UI into the session. Each
//!     accepted structural edit produces a new model, a structural diff and a new render
//!     tree in one step; a rejected edit changes nothing.
//! 4.  **Render**: Draw `RenderTree` nodes and connector paths. All geometry is in canvas
//!     coordinates with the root chain centred on the canvas axis.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowcanvas::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let flow = FlowDefinition {
//!         root: "start".to_string(),
//!         elements: vec![
//!             ElementDefinition::new("start", ElementType::Start).with_next("end"),
//!             ElementDefinition::new("end", ElementType::End),
//!         ],
//!     };
//!     let model = flow.into_flow_model()?;
//!
//!     let mut session = EditorSession::new(model, SessionConfig::default())?;
//!
//!     // Insert a decision between start and end.
//!     let event = CanvasEvent::add(Anchor::after("start"), ElementType::Decision);
//!     if let Effect::Mutated { inserted, .. } = session.dispatch(&event)? {
//!         println!("Inserted {:?}", inserted);
//!     }
//!
//!     for node in session.render_tree().nodes() {
//!         println!("{} at ({}, {})", node.guid, node.x, node.y);
//!     }
//!     println!("{}", visualize_model(session.model()));
//!     Ok(())
//! }
//! ```

pub mod definition;
pub mod error;
pub mod geometry;
pub mod history;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod mutation;
pub mod prelude;
pub mod session;
pub mod visualizer;
