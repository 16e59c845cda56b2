use super::LayoutConfig;
use crate::model::{Element, ElementType};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Size of a single element's slot on the canvas, margins included.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDimensions {
    pub width: f32,
    pub height: f32,
}

impl NodeDimensions {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Computes the slot of one element. Entries are looked up by element type.
pub type SizingFn = fn(&Element, &LayoutConfig) -> NodeDimensions;

/// Master macro to define the default sizing function of every element type,
/// their registration, and their lookup.
macro_rules! define_element_sizers {
    ( $( ($fn_name:ident, $element_type:ident, $width:expr, $height:expr) ),* $(,)? ) => {
        // 1. One sizing function per element type
        $(
            fn $fn_name(_element: &Element, _config: &LayoutConfig) -> NodeDimensions {
                NodeDimensions::new($width, $height)
            }
        )*

        // 2. Register all default sizers into a dispatch table
        pub(super) fn register_default_sizers(registry: &mut AHashMap<ElementType, SizingFn>) {
            $( registry.insert(ElementType::$element_type, $fn_name as SizingFn); )*
        }

        // 3. Look up the default sizer of a type
        pub fn default_sizing(element_type: ElementType) -> SizingFn {
            match element_type {
                $( ElementType::$element_type => $fn_name, )*
            }
        }
    };
}

define_element_sizers! {
    // Terminals
    (size_start, Start, 120.0, 48.0),
    (size_end, End, 120.0, 48.0),

    // Compound nodes; the branch row or loop body widens their footprint
    (size_decision, Decision, 160.0, 56.0),
    (size_wait, Wait, 160.0, 56.0),
    (size_loop, Loop, 160.0, 56.0),

    // Plain steps
    (size_screen, Screen, 160.0, 48.0),
    (size_assignment, Assignment, 160.0, 48.0),
    (size_record_create, RecordCreate, 160.0, 48.0),
    (size_record_update, RecordUpdate, 160.0, 48.0),
    (size_record_lookup, RecordLookup, 160.0, 48.0),
    (size_record_delete, RecordDelete, 160.0, 48.0),
    (size_action_call, ActionCall, 160.0, 48.0),
    (size_subflow, Subflow, 160.0, 48.0),

    // Resources take no room
    (size_variable, Variable, 0.0, 0.0),
    (size_formula, Formula, 0.0, 0.0),
}
