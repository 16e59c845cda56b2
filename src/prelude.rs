//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the flowcanvas
//! crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowcanvas::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/flow.json")?;
//! let model = FlowModel::from_json(&json)?;
//!
//! let tree = LayoutEngine::default().compute_layout(&model, CanvasMode::Default)?;
//! println!("Canvas is {}x{}", tree.bounds.width, tree.bounds.height);
//! # Ok(())
//! # }
//! ```

// Model
pub use crate::model::{Element, ElementType, FlowModel, Guid, Violation, validate_graph};

// Loading
pub use crate::definition::{ElementDefinition, FlowDefinition, IntoFlowModel};

// Layout and geometry
pub use crate::geometry::{ConnectorKind, Point, Rect};
pub use crate::layout::{LayoutConfig, LayoutEngine, RenderNode, RenderTree};

// Editing
pub use crate::interaction::{CanvasMode, InteractionState};
pub use crate::mutation::{Anchor, Command, CopiedSubgraph, MutationEngine};
pub use crate::session::{CanvasEvent, CanvasEventType, Effect, EditorSession, SessionConfig};

// Error types
pub use crate::error::{CommandError, ConversionError, LayoutError, SessionError};

// Debug output
pub use crate::visualizer::{visualize_layout, visualize_model};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
