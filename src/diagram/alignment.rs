//! Alignment and stacking over the current selection.
//!
//! Both engines run in two passes. Measurement covers every selected object,
//! movable or not, so a locked object still anchors the target edge.
//! Application then moves only the movable ones, and only when the computed
//! position differs from the current one. All resulting moves commit as a
//! single history entry.

use crate::geometry::{Point, Rect};
use crate::history::Command;
use crate::object::ObjectId;
use crate::scene::{Proxy, Scene, SceneId};

use super::Diagram;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentRule {
    Top,
    Bottom,
    Left,
    Right,
    /// Centers along the horizontal axis, adjusting y.
    CenterHorizontal,
    /// Centers along the vertical axis, adjusting x.
    CenterVertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackRule {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlannedMove {
    object: ObjectId,
    from: Point,
    to: Point,
}

impl Diagram {
    pub fn align_selected(&mut self, scene_id: SceneId, rule: AlignmentRule) {
        let Some(scene) = self.scene.find_scene(scene_id) else {
            tracing::debug!(scene = scene_id, "align: scene is gone");
            return;
        };
        let moves = plan_alignment(scene, rule);
        tracing::debug!(scene = scene_id, rule = ?rule, moved = moves.len(), "alignment planned");
        self.commit_moves(scene_id, "items aligned", &moves);
    }

    pub fn stack_selected(&mut self, scene_id: SceneId, rule: StackRule) {
        let Some(scene) = self.scene.find_scene(scene_id) else {
            tracing::debug!(scene = scene_id, "stack: scene is gone");
            return;
        };
        let moves = plan_stack(scene, rule);
        tracing::debug!(scene = scene_id, rule = ?rule, moved = moves.len(), "stack planned");
        self.commit_moves(scene_id, "items stacked", &moves);
    }

    /// Applies planned moves and records them atomically. An empty plan
    /// leaves the history untouched.
    fn commit_moves(&mut self, scene_id: SceneId, label: &str, moves: &[PlannedMove]) {
        if moves.is_empty() {
            return;
        }
        let Some(scene) = self.scene.find_scene_mut(scene_id) else {
            return;
        };
        for planned in moves {
            scene.set_position(planned.object, planned.to);
        }
        let commands = moves
            .iter()
            .map(|planned| Command::item_moved(planned.from, scene, planned.object))
            .collect();
        self.push_macro(label, commands);
    }
}

fn plan_alignment(scene: &Scene, rule: AlignmentRule) -> Vec<PlannedMove> {
    let selected: Vec<_> = scene.selected_proxies().collect();
    let Some(bounds) = measure(&selected) else {
        return Vec::new();
    };
    let center = bounds.center();

    let mut moves = Vec::new();
    for proxy in selected {
        if !proxy.is_movable() {
            continue;
        }
        let from = proxy.position();
        let size = proxy.size();
        let to = match rule {
            AlignmentRule::Top => Point::new(from.x, bounds.top),
            AlignmentRule::Bottom => Point::new(from.x, bounds.bottom - size.height),
            AlignmentRule::Left => Point::new(bounds.left, from.y),
            AlignmentRule::Right => Point::new(bounds.right - size.width, from.y),
            AlignmentRule::CenterHorizontal => Point::new(from.x, center.y - size.height / 2),
            AlignmentRule::CenterVertical => Point::new(center.x - size.width / 2, from.y),
        };
        if to != from {
            moves.push(PlannedMove {
                object: proxy.id(),
                from,
                to,
            });
        }
    }
    moves
}

fn plan_stack(scene: &Scene, rule: StackRule) -> Vec<PlannedMove> {
    let mut selected: Vec<_> = scene.selected_proxies().collect();
    if selected.is_empty() {
        return Vec::new();
    }
    // Stable sort; equal coordinates keep ascending id order.
    match rule {
        StackRule::Horizontal => selected.sort_by_key(|proxy| proxy.position().x),
        StackRule::Vertical => selected.sort_by_key(|proxy| proxy.position().y),
    }

    let mut coordinate = match rule {
        StackRule::Horizontal => selected[0].position().x,
        StackRule::Vertical => selected[0].position().y,
    };
    let mut moves = Vec::new();
    for proxy in selected {
        let from = proxy.position();
        if proxy.is_movable() {
            let to = match rule {
                StackRule::Horizontal => Point::new(coordinate, from.y),
                StackRule::Vertical => Point::new(from.x, coordinate),
            };
            if to != from {
                moves.push(PlannedMove {
                    object: proxy.id(),
                    from,
                    to,
                });
            }
        }
        // Immovable objects still occupy their slot.
        coordinate += match rule {
            StackRule::Horizontal => proxy.size().width,
            StackRule::Vertical => proxy.size().height,
        };
    }
    moves
}

/// Bounding box of the whole selection; `None` when nothing is selected.
fn measure(selected: &[&Proxy]) -> Option<Rect> {
    let mut corners: Option<(Point, Point)> = None;
    for proxy in selected {
        let position = proxy.position();
        let size = proxy.size();
        let far = Point::new(position.x + size.width, position.y + size.height);
        corners = Some(match corners {
            None => (position, far),
            Some((top_left, bottom_right)) => (
                Point::new(top_left.x.min(position.x), top_left.y.min(position.y)),
                Point::new(bottom_right.x.max(far.x), bottom_right.y.max(far.y)),
            ),
        });
    }
    corners.map(|(top_left, bottom_right)| Rect::from_corners(top_left, bottom_right))
}
