//! Stateful controller the host chrome talks to.
//!
//! Owns the current immutable layout and the view state around it. A reload
//! swaps in a whole new [`GraphLayout`]; readers holding the previous
//! `Arc` keep a consistent snapshot.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::geometry::LayoutConfig;
use crate::git::{GitError, History, error_status};
use crate::interaction::{self, Action, PointerEvent, ViewState, Viewport, initial_view};
use crate::layout::GraphLayout;
use crate::model::{Commit, Point, RefsByCommit};
use crate::render::{HitRegions, RenderOutput, render};
use crate::text::{ApproxMetrics, TextMeasure};
use crate::theme::Theme;

/// Identifies one load request; only the latest one may install its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

pub struct GraphView {
    layout: Arc<GraphLayout>,
    hits: HitRegions,
    view: ViewState,
    viewport: Viewport,
    theme: Theme,
    measure: Arc<dyn TextMeasure + Send + Sync>,
    config: LayoutConfig,
    status: String,
    generation: u64,
}

impl GraphView {
    pub fn new(config: LayoutConfig, theme: Theme) -> Self {
        Self {
            layout: Arc::new(GraphLayout::empty(config)),
            hits: HitRegions::default(),
            view: ViewState::default(),
            viewport: Viewport::default(),
            theme,
            measure: Arc::new(ApproxMetrics::default()),
            config,
            status: String::new(),
            generation: 0,
        }
    }

    pub fn with_measure(mut self, measure: Arc<dyn TextMeasure + Send + Sync>) -> Self {
        self.measure = measure;
        self.paint();
        self
    }

    pub fn layout(&self) -> Arc<GraphLayout> {
        Arc::clone(&self.layout)
    }

    pub fn view_state(&self) -> ViewState {
        self.view
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn hits(&self) -> &HitRegions {
        &self.hits
    }

    /// Resizes the viewport, pulling the view back into the scroll range.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.view = self.view.clamped(&self.layout, viewport);
    }

    /// Replaces the layout and recentres the view at the current scale.
    pub fn rebuild_layout(&mut self, commits: Vec<Commit>, refs: RefsByCommit) {
        self.layout = Arc::new(GraphLayout::build(commits, refs, self.config));
        self.center();
        self.paint();
    }

    pub fn zoom_in(&mut self) {
        self.view = self.view.zoom_in(&self.layout, self.viewport);
    }

    pub fn zoom_out(&mut self) {
        self.view = self.view.zoom_out(&self.layout, self.viewport);
    }

    /// Installs a host-supplied view, clamped to the scale bounds and the
    /// scroll range.
    pub fn set_view(&mut self, view: ViewState) {
        self.view = view.clamped(&self.layout, self.viewport);
    }

    /// Scrolls by a device delta.
    pub fn pan(&mut self, delta: Point) {
        self.view = self.view.pan(delta, &self.layout, self.viewport);
    }

    /// Scrolls so the content is centred in the viewport.
    pub fn center(&mut self) {
        let content = self.layout.canvas_size(self.view.scale);
        self.view = initial_view(content, self.viewport, self.view.scale);
    }

    /// Runs one render pass. Its hit regions replace the ones pointer events
    /// are resolved against.
    pub fn paint(&mut self) -> RenderOutput {
        let output = render(&self.layout, &self.view, self.theme, self.measure.as_ref());
        self.hits = output.hits.clone();
        output
    }

    pub fn render_svg(&self, background: Option<&str>) -> Result<String> {
        crate::svg::render_svg(
            &self.layout,
            &self.view,
            self.theme,
            background,
            self.measure.as_ref(),
        )
    }

    /// Resolves a pointer event; zoom actions are applied before returning.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> Action {
        let action = interaction::handle_pointer_event(
            &self.layout,
            &self.hits,
            &self.view,
            self.viewport,
            event,
        );
        if let Action::Zoom { view } = &action {
            self.view = *view;
        }
        action
    }

    /// Tooltip for the node under a viewport-relative device point.
    pub fn tooltip(&self, device: Point) -> Option<String> {
        let logical = self.view.to_logical(device);
        interaction::node_at(&self.layout, logical)
            .map(|index| interaction::tooltip_text(&self.layout, index))
    }

    /// Starts a load; every earlier ticket becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Installs the result of `ticket` if no newer load has started.
    ///
    /// Failures keep the previous layout and only replace the status line.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<History, GitError>) -> bool {
        if !self.is_current(ticket) {
            debug!(
                ticket = ticket.0,
                latest = self.generation,
                "discarding stale history load"
            );
            return false;
        }

        match result {
            Ok(history) => {
                self.status = history.status;
                self.rebuild_layout(history.commits, history.refs);
            }
            Err(err) => {
                warn!(error = %err, "history load failed");
                self.status = error_status(&err);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Modifiers, PointerKind};
    use crate::model::RefLabel;
    use proptest::prelude::*;

    fn history(ids: &[&str]) -> History {
        let mut commits = Vec::new();
        for (idx, id) in ids.iter().enumerate() {
            let parents: Vec<&str> = if idx == 0 { vec![] } else { vec![ids[idx - 1]] };
            commits.push(
                Commit::new(*id, &parents)
                    .with_author("Ada", "ada@example.com")
                    .with_message(&format!("commit {id}")),
            );
        }
        let refs = RefsByCommit::from([(
            ids[ids.len() - 1].to_string(),
            vec![RefLabel::Branch("main".into())],
        )]);
        History {
            commits,
            refs,
            branch_names: vec!["main".into()],
            status: format!("Showing {} commits", ids.len()),
        }
    }

    fn view() -> GraphView {
        let mut view = GraphView::new(LayoutConfig::default(), Theme::Light);
        view.set_viewport(Viewport::new(300.0, 200.0));
        view
    }

    #[test]
    fn stale_loads_are_discarded() {
        let mut view = view();
        let first = view.begin_load();
        let second = view.begin_load();

        assert!(!view.finish_load(first, Ok(history(&["a1", "a2", "a3"]))));
        assert!(view.layout().is_empty());

        assert!(view.finish_load(second, Ok(history(&["b1", "b2"]))));
        assert_eq!(view.layout().len(), 2);
        assert_eq!(view.status(), "Showing 2 commits");
    }

    #[test]
    fn failed_load_keeps_layout_and_reports_status() {
        let mut view = view();
        let ticket = view.begin_load();
        view.finish_load(ticket, Ok(history(&["a1", "a2"])));
        let before = view.layout();

        let ticket = view.begin_load();
        let err = GitError::NotARepo {
            path: "/tmp/nowhere".into(),
        };
        assert!(view.finish_load(ticket, Err(err)));

        assert!(Arc::ptr_eq(&before, &view.layout()));
        assert!(view.status().starts_with("Git repo not found or error: not a git repository"));
    }

    #[test]
    fn held_layout_survives_rebuild() {
        let mut view = view();
        view.rebuild_layout(history(&["a1"]).commits, RefsByCommit::new());
        let snapshot = view.layout();
        view.rebuild_layout(history(&["b1", "b2"]).commits, RefsByCommit::new());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(view.layout().len(), 2);
    }

    #[test]
    fn zoom_buttons_change_scale_within_bounds() {
        let mut view = view();
        view.zoom_in();
        assert!((view.view_state().scale - 1.1).abs() < 1e-6);
        view.zoom_out();
        assert!((view.view_state().scale - 1.0).abs() < 1e-5);

        view.set_view(ViewState {
            scale: 10.0,
            offset: Point::new(-5.0, 3.0),
        });
        assert_eq!(view.view_state().scale, 3.0);
        assert_eq!(view.view_state().offset, Point::new(0.0, 3.0));
    }

    #[test]
    fn rebuild_centres_wide_content() {
        let mut view = view();
        view.rebuild_layout(
            history(&["a1", "a2", "a3", "a4", "a5"]).commits,
            RefsByCommit::new(),
        );
        let content = view.layout().canvas_size(1.0);
        let offset = view.view_state().offset;
        assert_eq!(offset.x, (content.width - 300.0) / 2.0);
    }

    #[test]
    fn pointer_events_use_current_hits() {
        let mut view = view();
        view.set_viewport(Viewport::new(2000.0, 2000.0));
        view.rebuild_layout(history(&["a1", "a2"]).commits, RefsByCommit::new());

        let layout = view.layout();
        let device = view.view_state().to_device(layout.node_point(1));

        assert_eq!(view.tooltip(device).as_deref(), Some("a2 Ada: commit a2"));
        let action = view.handle_pointer_event(PointerEvent {
            kind: PointerKind::Click,
            position: device,
            modifiers: Modifiers::default(),
        });
        assert!(matches!(action, Action::ShowMessagePopup { ref commit_id, .. } if commit_id == "a2"));
    }

    #[test]
    fn ctrl_wheel_updates_view() {
        let mut view = view();
        let action = view.handle_pointer_event(PointerEvent {
            kind: PointerKind::Wheel { delta: 1.0 },
            position: Point::new(10.0, 10.0),
            modifiers: Modifiers { ctrl: true },
        });
        assert!(matches!(action, Action::Zoom { .. }));
        assert!((view.view_state().scale - 0.9).abs() < 1e-6);
    }

    fn wheel(position: Point, delta: f32) -> PointerEvent {
        PointerEvent {
            kind: PointerKind::Wheel { delta },
            position,
            modifiers: Modifiers { ctrl: true },
        }
    }

    #[test]
    fn zoom_on_centred_content_keeps_point_under_anchor() {
        let mut view = view();
        view.set_viewport(Viewport::new(1200.0, 800.0));
        view.rebuild_layout(history(&["a1", "a2"]).commits, RefsByCommit::new());

        let pointer = Point::new(700.0, 400.0);
        let before = view.view_state().to_logical(pointer);
        assert_eq!(before, Point::new(344.0, 122.0));

        view.handle_pointer_event(wheel(pointer, -1.0));
        let after = view.view_state().to_logical(pointer);
        assert!((after.x - before.x).abs() < 1e-3 && (after.y - before.y).abs() < 1e-3);

        let centre = view.viewport().center();
        let before = view.view_state().to_logical(centre);
        view.zoom_in();
        let after = view.view_state().to_logical(centre);
        assert!((after.x - before.x).abs() < 1e-3 && (after.y - before.y).abs() < 1e-3);
    }

    #[test]
    fn pan_and_set_view_stay_within_content() {
        let mut view = view();
        view.rebuild_layout(
            history(&["a1", "a2", "a3", "a4", "a5"]).commits,
            RefsByCommit::new(),
        );
        let content = view.layout().canvas_size(1.0);
        let max_x = content.width - 300.0;
        let max_y = content.height - 200.0;

        view.pan(Point::new(10_000.0, 10_000.0));
        assert_eq!(view.view_state().offset, Point::new(max_x, max_y));
        view.pan(Point::new(-10_000.0, -10_000.0));
        assert_eq!(view.view_state().offset, Point::new(0.0, 0.0));

        view.set_view(ViewState {
            scale: 1.0,
            offset: Point::new(max_x + 500.0, -40.0),
        });
        assert_eq!(view.view_state().offset, Point::new(max_x, 0.0));
    }

    #[test]
    fn paint_refreshes_hits_used_by_pointer_events() {
        let mut view = view();
        view.rebuild_layout(history(&["a1", "a2"]).commits, RefsByCommit::new());
        let output = view.paint();
        assert_eq!(&output.hits, view.hits());

        let narrow = Arc::new(ApproxMetrics::for_font_size(4.0));
        let mut view = view.with_measure(narrow);
        let output = view.paint();
        assert_eq!(&output.hits, view.hits());
    }

    proptest! {
        #[test]
        fn controller_zoom_keeps_anchor_on_small_content(
            width in 1200.0f32..2400.0,
            height in 700.0f32..1400.0,
            fx in 0.0f32..1.0,
            fy in 0.0f32..1.0,
        ) {
            let mut view = view();
            view.set_viewport(Viewport::new(width, height));
            view.rebuild_layout(history(&["a1", "a2"]).commits, RefsByCommit::new());
            let centre = view.viewport().center();

            let before = view.view_state().to_logical(centre);
            view.zoom_in();
            let after = view.view_state().to_logical(centre);
            prop_assert!((after.x - before.x).abs() < 1e-2 && (after.y - before.y).abs() < 1e-2);

            view.zoom_out();
            let after = view.view_state().to_logical(centre);
            prop_assert!((after.x - before.x).abs() < 1e-2 && (after.y - before.y).abs() < 1e-2);

            let canvas = view.layout().canvas_size(1.0);
            let target = Point::new(canvas.width * fx, canvas.height * fy);
            let pointer = view.view_state().to_device(target);
            view.handle_pointer_event(wheel(pointer, -1.0));
            let after = view.view_state().to_logical(pointer);
            prop_assert!((after.x - target.x).abs() < 1e-2 && (after.y - target.y).abs() < 1e-2);
        }
    }
}
