use super::Point;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Visual shape of a connector.
///
/// Loop lanes are carried by the kind itself so the route stays a function of the two
/// endpoints and the kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConnectorKind {
    /// Plain successor link between two stacked nodes.
    Straight,
    /// End of a chain that continues nowhere; ends in an "Add Element" stub.
    Dangling,
    /// Parent fan-out into a branch column.
    Branch,
    /// Branch tail back into the parent's merge point.
    Merge,
    /// Dashed link from a node's right side into its fault path.
    Fault,
    /// Loop into the head of its body.
    ForEach,
    /// Body tail back to the loop, routed through the left lane.
    LoopBack { lane_x: f32 },
    /// Loop exit towards the element after the loop, routed through the right lane.
    AfterLast { lane_x: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeKind {
    Label,
    ForEach,
    AfterLast,
    Fault,
}

/// Text anchored somewhere along a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub kind: BadgeKind,
    pub text: String,
    pub anchor: Point,
}

/// Fixed offsets used when routing connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorStyle {
    pub corner_radius: f32,
    /// Vertical distance from a parent to the horizontal run of its branch connectors.
    pub branch_drop: f32,
    /// Vertical distance above a merge point where branch tails turn towards it.
    pub merge_rise: f32,
    /// Vertical distance below a loop body before the loop-back turns into its lane.
    pub loop_return_drop: f32,
    pub badge_offset: f32,
}

impl Default for ConnectorStyle {
    fn default() -> Self {
        Self {
            corner_radius: 8.0,
            branch_drop: 24.0,
            merge_rise: 24.0,
            loop_return_drop: 16.0,
            badge_offset: 12.0,
        }
    }
}

/// Path-equivalent description of a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorPath {
    pub kind: ConnectorKind,
    /// Polyline vertices from start to end. Interior vertices are rounded when drawn.
    pub points: Vec<Point>,
    pub corner_radius: f32,
    pub dashed: bool,
    pub badge: Option<Badge>,
    /// Where the "Add Element" affordance sits, when the connector offers one.
    pub add_point: Option<Point>,
}

impl ConnectorPath {
    pub fn start(&self) -> Point {
        self.points.first().copied().unwrap_or_default()
    }

    pub fn end(&self) -> Point {
        self.points.last().copied().unwrap_or_default()
    }

    pub fn length(&self) -> f32 {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| (b.x - a.x).abs() + (b.y - a.y).abs())
            .sum()
    }

    /// Renders the polyline as an SVG path with quadratic curves at every corner.
    pub fn to_svg_path(&self) -> String {
        let mut d = String::new();
        let Some(first) = self.points.first() else {
            return d;
        };
        let _ = write!(d, "M {} {}", first.x, first.y);

        for (prev, corner, next) in self.points.iter().tuple_windows() {
            let before = towards(*corner, *prev, self.corner_radius);
            let after = towards(*corner, *next, self.corner_radius);
            let _ = write!(
                d,
                " L {} {} Q {} {} {} {}",
                before.x, before.y, corner.x, corner.y, after.x, after.y
            );
        }

        if self.points.len() > 1 {
            let last = self.end();
            let _ = write!(d, " L {} {}", last.x, last.y);
        }
        d
    }
}

/// Computes the route of a connector between two points.
///
/// `label` is only used by branch connectors, which carry the branch label as a badge.
pub fn connector_path(
    kind: ConnectorKind,
    start: Point,
    end: Point,
    label: Option<&str>,
    style: &ConnectorStyle,
) -> ConnectorPath {
    let mut points = Vec::new();
    let mut badge = None;
    let mut add_point = None;
    let mut dashed = false;

    match kind {
        ConnectorKind::Straight | ConnectorKind::Dangling => {
            let mid_y = (start.y + end.y) / 2.0;
            push_point(&mut points, start);
            push_point(&mut points, Point::new(start.x, mid_y));
            push_point(&mut points, Point::new(end.x, mid_y));
            push_point(&mut points, end);
            add_point = Some(Point::new(end.x, mid_y));
        }
        ConnectorKind::Branch => {
            let run_y = start.y + style.branch_drop;
            push_point(&mut points, start);
            push_point(&mut points, Point::new(start.x, run_y));
            push_point(&mut points, Point::new(end.x, run_y));
            push_point(&mut points, end);
            badge = label.map(|text| Badge {
                kind: BadgeKind::Label,
                text: text.to_string(),
                anchor: Point::new(end.x, run_y + style.badge_offset),
            });
            add_point = Some(Point::new(end.x, (run_y + end.y) / 2.0 + style.badge_offset));
        }
        ConnectorKind::Merge => {
            let run_y = end.y - style.merge_rise;
            push_point(&mut points, start);
            push_point(&mut points, Point::new(start.x, run_y));
            push_point(&mut points, Point::new(end.x, run_y));
            push_point(&mut points, end);
            add_point = Some(Point::new(start.x, (start.y + run_y) / 2.0));
        }
        ConnectorKind::Fault => {
            push_point(&mut points, start);
            push_point(&mut points, Point::new(end.x, start.y));
            push_point(&mut points, end);
            dashed = true;
            badge = Some(Badge {
                kind: BadgeKind::Fault,
                text: "Fault".to_string(),
                anchor: Point::new((start.x + end.x) / 2.0, start.y - style.badge_offset),
            });
        }
        ConnectorKind::ForEach => {
            push_point(&mut points, start);
            push_point(&mut points, end);
            badge = Some(Badge {
                kind: BadgeKind::ForEach,
                text: "For Each".to_string(),
                anchor: Point::new(start.x, start.y + style.badge_offset),
            });
            add_point = Some(start.midpoint(end).offset(0.0, style.badge_offset / 2.0));
        }
        ConnectorKind::LoopBack { lane_x } => {
            let drop_y = start.y + style.loop_return_drop;
            push_point(&mut points, start);
            push_point(&mut points, Point::new(start.x, drop_y));
            push_point(&mut points, Point::new(lane_x, drop_y));
            push_point(&mut points, Point::new(lane_x, end.y));
            push_point(&mut points, end);
        }
        ConnectorKind::AfterLast { lane_x } => {
            let run_y = end.y - style.merge_rise;
            push_point(&mut points, start);
            push_point(&mut points, Point::new(lane_x, start.y));
            push_point(&mut points, Point::new(lane_x, run_y));
            push_point(&mut points, Point::new(end.x, run_y));
            push_point(&mut points, end);
            badge = Some(Badge {
                kind: BadgeKind::AfterLast,
                text: "After Last".to_string(),
                anchor: Point::new(lane_x, start.y + style.badge_offset),
            });
            add_point = Some(Point::new(end.x, (run_y + end.y) / 2.0));
        }
    }

    ConnectorPath {
        kind,
        points,
        corner_radius: style.corner_radius,
        dashed,
        badge,
        add_point,
    }
}

/// Moves from `from` towards `to` by at most `distance` along an axis aligned segment.
fn towards(from: Point, to: Point, distance: f32) -> Point {
    let dx = (to.x - from.x).clamp(-distance, distance);
    let dy = (to.y - from.y).clamp(-distance, distance);
    Point::new(from.x + dx, from.y + dy)
}

/// Appends a vertex, dropping duplicates and collapsing collinear runs.
fn push_point(points: &mut Vec<Point>, point: Point) {
    if points.last() == Some(&point) {
        return;
    }
    if let [.., a, b] = *points.as_slice() {
        if (a.x == b.x && b.x == point.x) || (a.y == b.y && b.y == point.y) {
            points.pop();
        }
    }
    points.push(point);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_connector_is_a_single_segment() {
        let path = connector_path(
            ConnectorKind::Straight,
            Point::new(80.0, 48.0),
            Point::new(80.0, 96.0),
            None,
            &ConnectorStyle::default(),
        );
        assert_eq!(path.points, vec![Point::new(80.0, 48.0), Point::new(80.0, 96.0)]);
        assert_eq!(path.length(), 48.0);
        assert_eq!(path.add_point, Some(Point::new(80.0, 72.0)));
        assert_eq!(path.to_svg_path(), "M 80 48 L 80 96");
    }

    #[test]
    fn test_branch_connector_turns_twice_and_carries_label() {
        let style = ConnectorStyle::default();
        let path = connector_path(
            ConnectorKind::Branch,
            Point::new(100.0, 0.0),
            Point::new(20.0, 60.0),
            Some("Yes"),
            &style,
        );
        assert_eq!(path.points.len(), 4);
        assert_eq!(path.points[1], Point::new(100.0, style.branch_drop));
        assert_eq!(path.points[2], Point::new(20.0, style.branch_drop));
        let badge = path.badge.expect("branch badge");
        assert_eq!(badge.text, "Yes");
        assert_eq!(badge.anchor.x, 20.0);
    }

    #[test]
    fn test_fault_connector_is_dashed() {
        let path = connector_path(
            ConnectorKind::Fault,
            Point::new(50.0, 24.0),
            Point::new(150.0, 80.0),
            None,
            &ConnectorStyle::default(),
        );
        assert!(path.dashed);
        assert_eq!(path.points[1], Point::new(150.0, 24.0));
        assert_eq!(path.badge.map(|b| b.kind), Some(BadgeKind::Fault));
        assert!(path.add_point.is_none());
    }

    #[test]
    fn test_loop_back_runs_through_lane() {
        let path = connector_path(
            ConnectorKind::LoopBack { lane_x: 10.0 },
            Point::new(100.0, 300.0),
            Point::new(76.0, 24.0),
            None,
            &ConnectorStyle::default(),
        );
        assert!(path.points.iter().any(|p| p.x == 10.0 && p.y == 24.0));
        assert_eq!(path.end(), Point::new(76.0, 24.0));
    }

    #[test]
    fn test_svg_path_rounds_corners() {
        let path = connector_path(
            ConnectorKind::Merge,
            Point::new(0.0, 0.0),
            Point::new(100.0, 100.0),
            None,
            &ConnectorStyle::default(),
        );
        let d = path.to_svg_path();
        assert!(d.starts_with("M 0 0"));
        assert_eq!(d.matches('Q').count(), 2);
        assert!(d.ends_with("L 100 100"));
    }
}
