//! Pointer handling, zoom and viewport math.
//!
//! Device points are relative to the viewport's top-left corner. Logical
//! points are layout coordinates before scaling. Everything here is a pure
//! function of its inputs; the caller owns the [`ViewState`]. One mapping,
//! `device = logical * scale - offset`, serves drawing, hit testing and zoom.

use serde::{Deserialize, Serialize};

use crate::layout::GraphLayout;
use crate::model::{CanvasSize, Point};
use crate::render::{HitKind, HitRegions};

/// Scale plus scroll offset of the visible window into the scaled canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub scale: f32,
    pub offset: Point,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Point::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

impl ViewState {
    pub fn to_logical(&self, device: Point) -> Point {
        Point::new(
            (device.x + self.offset.x) / self.scale,
            (device.y + self.offset.y) / self.scale,
        )
    }

    pub fn to_device(&self, logical: Point) -> Point {
        Point::new(
            logical.x * self.scale - self.offset.x,
            logical.y * self.scale - self.offset.y,
        )
    }

    /// Clamps the scale to the configured bounds and the offset to the
    /// scroll range of the layout's canvas at that scale.
    pub fn clamped(self, layout: &GraphLayout, viewport: Viewport) -> ViewState {
        let scale = layout.config().clamp_scale(self.scale);
        let content = layout.canvas_size(scale);
        let (min_x, max_x) = scroll_range(content.width, viewport.width);
        let (min_y, max_y) = scroll_range(content.height, viewport.height);
        ViewState {
            scale,
            offset: Point::new(
                self.offset.x.clamp(min_x, max_x),
                self.offset.y.clamp(min_y, max_y),
            ),
        }
    }

    /// Rescales by `factor` while keeping the logical point under `anchor`
    /// at the same device position, as far as the scroll range allows.
    pub fn zoom_by(
        self,
        factor: f32,
        anchor: Point,
        layout: &GraphLayout,
        viewport: Viewport,
    ) -> ViewState {
        let new_scale = layout.config().clamp_scale(self.scale * factor);
        if new_scale == self.scale {
            return self;
        }

        let logical = self.to_logical(anchor);
        ViewState {
            scale: new_scale,
            offset: Point::new(
                logical.x * new_scale - anchor.x,
                logical.y * new_scale - anchor.y,
            ),
        }
        .clamped(layout, viewport)
    }

    pub fn zoom_in(self, layout: &GraphLayout, viewport: Viewport) -> ViewState {
        let step = layout.config().zoom_step;
        self.zoom_by(step, viewport.center(), layout, viewport)
    }

    pub fn zoom_out(self, layout: &GraphLayout, viewport: Viewport) -> ViewState {
        let step = layout.config().zoom_step;
        self.zoom_by(1.0 / step, viewport.center(), layout, viewport)
    }

    /// Negative deltas scroll up and zoom in.
    pub fn wheel_zoom(
        self,
        delta: f32,
        anchor: Point,
        layout: &GraphLayout,
        viewport: Viewport,
    ) -> ViewState {
        let config = layout.config();
        let factor = if delta < 0.0 {
            config.wheel_zoom_in
        } else {
            config.wheel_zoom_out
        };
        self.zoom_by(factor, anchor, layout, viewport)
    }

    /// Scrolls by a device delta, clamped to the scrollable range.
    pub fn pan(self, delta: Point, layout: &GraphLayout, viewport: Viewport) -> ViewState {
        ViewState {
            scale: self.scale,
            offset: Point::new(self.offset.x + delta.x, self.offset.y + delta.y),
        }
        .clamped(layout, viewport)
    }
}

/// Offsets allowed along one axis. Content larger than the viewport must
/// cover it; smaller content may sit anywhere inside it, which shows up as
/// a negative offset.
fn scroll_range(content: f32, viewport: f32) -> (f32, f32) {
    let slack = content - viewport;
    (slack.min(0.0), slack.max(0.0))
}

/// Starting view with the content centred on both axes. Content smaller
/// than the viewport gets a negative offset equal to its margin.
pub fn initial_view(content: CanvasSize, viewport: Viewport, scale: f32) -> ViewState {
    ViewState {
        scale,
        offset: Point::new(
            (content.width - viewport.width) / 2.0,
            (content.height - viewport.height) / 2.0,
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PointerKind {
    Click,
    Hover,
    Wheel { delta: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    #[serde(flatten)]
    pub kind: PointerKind,
    pub position: Point,
    #[serde(default)]
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    None,
    #[serde(rename_all = "camelCase")]
    ShowAuthorPopup { commit_id: String, text: String },
    #[serde(rename_all = "camelCase")]
    ShowMessagePopup {
        commit_id: String,
        title: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Tooltip { commit_id: String, text: String },
    Zoom { view: ViewState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub commit: usize,
    pub kind: HitKind,
}

/// Author labels win over message labels, which win over nodes.
pub fn hit_test(layout: &GraphLayout, hits: &HitRegions, logical: Point) -> Option<Hit> {
    if let Some(commit) = hits.author_at(logical) {
        return Some(Hit {
            commit,
            kind: HitKind::Author,
        });
    }
    if let Some(commit) = hits.message_at(logical) {
        return Some(Hit {
            commit,
            kind: HitKind::Message,
        });
    }
    node_at(layout, logical).map(|commit| Hit {
        commit,
        kind: HitKind::Node,
    })
}

pub fn node_at(layout: &GraphLayout, logical: Point) -> Option<usize> {
    let config = layout.config();
    let reach = config.node_radius + config.hit_slop;
    (0..layout.len()).find(|&idx| layout.node_point(idx).distance_squared(logical) <= reach * reach)
}

pub fn handle_pointer_event(
    layout: &GraphLayout,
    hits: &HitRegions,
    view: &ViewState,
    viewport: Viewport,
    event: PointerEvent,
) -> Action {
    match event.kind {
        PointerKind::Wheel { delta } => {
            if !event.modifiers.ctrl {
                return Action::None;
            }
            let next = view.wheel_zoom(delta, event.position, layout, viewport);
            if next == *view {
                Action::None
            } else {
                Action::Zoom { view: next }
            }
        }
        PointerKind::Click => {
            let logical = view.to_logical(event.position);
            match hit_test(layout, hits, logical) {
                Some(Hit {
                    commit,
                    kind: HitKind::Author,
                }) => {
                    let commit = layout.commit(commit);
                    Action::ShowAuthorPopup {
                        commit_id: commit.id.clone(),
                        text: commit.author_identity(),
                    }
                }
                Some(Hit { commit, .. }) => {
                    let commit = layout.commit(commit);
                    Action::ShowMessagePopup {
                        commit_id: commit.id.clone(),
                        title: message_title(layout, commit.id.as_str()),
                        text: commit.full_message().to_string(),
                    }
                }
                None => Action::None,
            }
        }
        PointerKind::Hover => {
            let logical = view.to_logical(event.position);
            match node_at(layout, logical) {
                Some(idx) => Action::Tooltip {
                    commit_id: layout.commit(idx).id.clone(),
                    text: tooltip_text(layout, idx),
                },
                None => Action::None,
            }
        }
    }
}

/// `abc1234 Author: subject`
pub fn tooltip_text(layout: &GraphLayout, index: usize) -> String {
    let commit = layout.commit(index);
    format!("{} {}: {}", commit.short_id(), commit.author, commit.summary)
}

fn message_title(layout: &GraphLayout, id: &str) -> String {
    match layout.index_of(id) {
        Some(idx) => {
            let commit = layout.commit(idx);
            format!("{} \u{b7} {}", commit.short_id(), commit.author)
        }
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LayoutConfig;
    use crate::model::{Commit, RefsByCommit};
    use crate::render::render;
    use crate::text::ApproxMetrics;
    use crate::theme::Theme;
    use proptest::prelude::*;

    fn sample_layout() -> GraphLayout {
        let commits = vec![
            Commit::new("1111111aaaa", &[])
                .with_author("Ada", "ada@example.com")
                .with_message("initial import\n\nlong body"),
            Commit::new("2222222bbbb", &["1111111aaaa"])
                .with_author("Grace", "")
                .with_message("second"),
        ];
        GraphLayout::build(commits, RefsByCommit::new(), LayoutConfig::default())
    }

    fn hits_for(layout: &GraphLayout) -> HitRegions {
        render(layout, &ViewState::default(), Theme::Light, &ApproxMetrics::default()).hits
    }

    fn small_viewport() -> Viewport {
        Viewport::new(100.0, 100.0)
    }

    fn click(position: Point) -> PointerEvent {
        PointerEvent {
            kind: PointerKind::Click,
            position,
            modifiers: Modifiers::default(),
        }
    }

    #[test]
    fn clicking_author_label_shows_identity() {
        let layout = sample_layout();
        let hits = hits_for(&layout);
        let rect = hits.author_rect(0).unwrap();
        let target = Point::new((rect.min_x + rect.max_x) / 2.0, (rect.min_y + rect.max_y) / 2.0);

        let action = handle_pointer_event(
            &layout,
            &hits,
            &ViewState::default(),
            small_viewport(),
            click(target),
        );
        assert_eq!(
            action,
            Action::ShowAuthorPopup {
                commit_id: "1111111aaaa".into(),
                text: "Ada <ada@example.com>".into(),
            }
        );
    }

    #[test]
    fn clicking_node_shows_full_message() {
        let layout = sample_layout();
        let hits = hits_for(&layout);
        let node = layout.node_point(0);

        let action = handle_pointer_event(
            &layout,
            &hits,
            &ViewState::default(),
            small_viewport(),
            click(node),
        );
        assert_eq!(
            action,
            Action::ShowMessagePopup {
                commit_id: "1111111aaaa".into(),
                title: "1111111 \u{b7} Ada".into(),
                text: "initial import\n\nlong body".into(),
            }
        );
    }

    #[test]
    fn clicks_respect_scale_and_offset() {
        let layout = sample_layout();
        let hits = hits_for(&layout);
        let view = ViewState {
            scale: 2.0,
            offset: Point::new(100.0, 50.0),
        };
        let node = layout.node_point(1);
        let device = view.to_device(node);

        let action = handle_pointer_event(&layout, &hits, &view, small_viewport(), click(device));
        assert!(matches!(
            action,
            Action::ShowMessagePopup { ref commit_id, .. } if commit_id == "2222222bbbb"
        ));
    }

    #[test]
    fn author_label_beats_node_when_overlapping() {
        let layout = sample_layout();
        let hits = hits_for(&layout);
        let node = layout.node_point(1);
        // Just above the node: inside the title rect and within node reach.
        let probe = Point::new(node.x, node.y - 8.0);
        assert_eq!(node_at(&layout, probe), Some(1));
        assert_eq!(
            hit_test(&layout, &hits, probe),
            Some(Hit {
                commit: 1,
                kind: HitKind::Author
            })
        );
        assert_eq!(
            hit_test(&layout, &hits, node),
            Some(Hit {
                commit: 1,
                kind: HitKind::Node
            })
        );
    }

    #[test]
    fn clicking_empty_space_does_nothing() {
        let layout = sample_layout();
        let hits = hits_for(&layout);
        let action = handle_pointer_event(
            &layout,
            &hits,
            &ViewState::default(),
            small_viewport(),
            click(Point::new(1.0, 1.0)),
        );
        assert_eq!(action, Action::None);
    }

    #[test]
    fn node_hit_includes_slop() {
        let layout = sample_layout();
        let node = layout.node_point(0);
        assert_eq!(node_at(&layout, Point::new(node.x + 11.0, node.y)), Some(0));
        assert_eq!(node_at(&layout, Point::new(node.x + 11.5, node.y)), None);
    }

    #[test]
    fn hover_reports_tooltip() {
        let layout = sample_layout();
        let hits = hits_for(&layout);
        let event = PointerEvent {
            kind: PointerKind::Hover,
            position: layout.node_point(1),
            modifiers: Modifiers::default(),
        };
        let action =
            handle_pointer_event(&layout, &hits, &ViewState::default(), small_viewport(), event);
        assert_eq!(
            action,
            Action::Tooltip {
                commit_id: "2222222bbbb".into(),
                text: "2222222 Grace: second".into(),
            }
        );
    }

    #[test]
    fn wheel_zooms_only_with_ctrl() {
        let layout = sample_layout();
        let hits = hits_for(&layout);
        let mut event = PointerEvent {
            kind: PointerKind::Wheel { delta: -1.0 },
            position: Point::new(10.0, 10.0),
            modifiers: Modifiers::default(),
        };
        let view = ViewState::default();
        assert_eq!(
            handle_pointer_event(&layout, &hits, &view, small_viewport(), event),
            Action::None
        );

        event.modifiers.ctrl = true;
        match handle_pointer_event(&layout, &hits, &view, small_viewport(), event) {
            Action::Zoom { view } => assert!((view.scale - 1.1).abs() < 1e-6),
            other => panic!("expected zoom, got {other:?}"),
        }
    }

    #[test]
    fn scale_is_clamped() {
        let layout = sample_layout();
        let viewport = Viewport::new(800.0, 600.0);
        let mut view = ViewState::default();
        for _ in 0..40 {
            view = view.zoom_in(&layout, viewport);
        }
        assert_eq!(view.scale, 3.0);
        for _ in 0..80 {
            view = view.zoom_out(&layout, viewport);
        }
        assert_eq!(view.scale, 0.5);
    }

    #[test]
    fn zoom_keeps_anchor_under_pointer() {
        let layout = sample_layout();
        let view = ViewState {
            scale: 1.0,
            offset: Point::new(100.0, 50.0),
        };
        let anchor = Point::new(50.0, 50.0);
        let logical = view.to_logical(anchor);

        let zoomed = view.zoom_by(1.1, anchor, &layout, small_viewport());
        let device = zoomed.to_device(logical);
        assert!((device.x - anchor.x).abs() < 1e-3);
        assert!((device.y - anchor.y).abs() < 1e-3);
    }

    #[test]
    fn zoom_out_keeps_large_content_covering_viewport() {
        let layout = sample_layout();
        let view = ViewState::default().zoom_by(0.5, Point::new(90.0, 90.0), &layout, small_viewport());
        assert_eq!(view.scale, 0.5);
        assert_eq!(view.offset, Point::new(0.0, 0.0));
    }

    #[test]
    fn initial_view_centres_content() {
        let content = CanvasSize {
            width: 2000.0,
            height: 300.0,
        };
        let view = initial_view(content, Viewport::new(800.0, 600.0), 1.0);
        assert_eq!(view.offset, Point::new(600.0, -150.0));
        assert_eq!(view.to_device(Point::new(0.0, 0.0)).y, 150.0);
    }

    #[test]
    fn pan_is_clamped_to_content() {
        let layout = sample_layout();
        let viewport = Viewport::new(400.0, 400.0);

        let view = ViewState::default().pan(Point::new(5000.0, -20.0), &layout, viewport);
        assert_eq!(view.offset, Point::new(88.0, -20.0));

        let view = view.pan(Point::new(-5000.0, -5000.0), &layout, viewport);
        assert_eq!(view.offset, Point::new(0.0, -156.0));
    }

    #[test]
    fn pointer_events_deserialize_from_json() {
        let event: PointerEvent = serde_json::from_str(
            r#"{"kind":"wheel","delta":-120.0,"position":{"x":1.0,"y":2.0},"modifiers":{"ctrl":true}}"#,
        )
        .unwrap();
        assert_eq!(event.kind, PointerKind::Wheel { delta: -120.0 });
        assert!(event.modifiers.ctrl);
    }

    fn assert_same_point(before: Point, after: Point) -> Result<(), TestCaseError> {
        prop_assert!((before.x - after.x).abs() < 1e-2, "x moved: {before:?} -> {after:?}");
        prop_assert!((before.y - after.y).abs() < 1e-2, "y moved: {before:?} -> {after:?}");
        Ok(())
    }

    proptest! {
        #[test]
        fn zoom_keeps_anchor_on_centred_content(
            scale in 0.5f32..1.0,
            width in 1200.0f32..2400.0,
            height in 700.0f32..1400.0,
            fx in 0.0f32..1.0,
            fy in 0.0f32..1.0,
        ) {
            let layout = sample_layout();
            let viewport = Viewport::new(width, height);
            let view = initial_view(layout.canvas_size(scale), viewport, scale);
            let canvas = layout.canvas_size(1.0);
            let anchor = view.to_device(Point::new(canvas.width * fx, canvas.height * fy));
            let centre = viewport.center();

            let zoomed = view.zoom_in(&layout, viewport);
            assert_same_point(view.to_logical(centre), zoomed.to_logical(centre))?;

            let restored = zoomed.zoom_out(&layout, viewport);
            prop_assert!((restored.scale - view.scale).abs() < 1e-4);
            assert_same_point(view.to_logical(centre), restored.to_logical(centre))?;

            for delta in [-1.0f32, 1.0] {
                let wheeled = view.wheel_zoom(delta, anchor, &layout, viewport);
                assert_same_point(view.to_logical(anchor), wheeled.to_logical(anchor))?;
            }
        }
    }
}
