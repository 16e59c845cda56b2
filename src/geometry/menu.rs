use super::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Fixed distance between a node's origin and the contextual menu it opens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuPadding {
    pub left: f32,
    pub top: f32,
}

impl Default for MenuPadding {
    fn default() -> Self {
        Self {
            left: 8.0,
            top: 56.0,
        }
    }
}

/// Absolute position of a contextual menu on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenuStyle {
    pub left: f32,
    pub top: f32,
}

impl MenuStyle {
    /// Inline style string understood by the menu component.
    pub fn to_css(&self) -> String {
        format!("left: {}px; top: {}px", self.left, self.top)
    }
}

/// Menu position for a node: its origin shifted by the fixed padding.
///
/// Only the origin of `geometry` is used, so the result does not depend on the layout pass
/// that produced it.
pub fn menu_style_from_geometry(geometry: &Rect, padding: &MenuPadding) -> MenuStyle {
    menu_style_at(Point::new(geometry.x, geometry.y), padding)
}

/// Menu position for a connector affordance, such as the "Add Element" point.
pub fn menu_style_at(origin: Point, padding: &MenuPadding) -> MenuStyle {
    MenuStyle {
        left: origin.x + padding.left,
        top: origin.y + padding.top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_offsets_from_origin() {
        let padding = MenuPadding { left: 10.0, top: 20.0 };
        let style = menu_style_from_geometry(&Rect::new(100.0, 40.0, 48.0, 48.0), &padding);
        assert_eq!(style, MenuStyle { left: 110.0, top: 60.0 });
        assert_eq!(style.to_css(), "left: 110px; top: 60px");
    }

    #[test]
    fn test_menu_ignores_node_size() {
        let padding = MenuPadding::default();
        let small = menu_style_from_geometry(&Rect::new(5.0, 5.0, 10.0, 10.0), &padding);
        let large = menu_style_from_geometry(&Rect::new(5.0, 5.0, 400.0, 90.0), &padding);
        assert_eq!(small, large);
    }
}
