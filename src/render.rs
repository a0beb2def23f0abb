//! Paint pass over a [`GraphLayout`].
//!
//! Produces backend-neutral draw commands in logical coordinates together
//! with the hit regions the interaction layer needs. Hit regions depend on
//! font metrics and truncation, so they are part of every paint rather than
//! of the layout.

use serde::Serialize;

use crate::geometry::LayoutConfig;
use crate::interaction::ViewState;
use crate::layout::{GraphEdge, GraphLayout};
use crate::model::{CanvasSize, Point, Rect};
use crate::text::{TextMeasure, fit_text};
use crate::theme::Theme;

const EDGE_WIDTH: f32 = 2.0;
const TITLE_GAP: f32 = 6.0;
const MESSAGE_GAP: f32 = 2.0;
const BADGE_GAP: f32 = 6.0;
const BADGE_PADDING_H: f32 = 6.0;
const BADGE_PADDING_V: f32 = 2.0;
const BADGE_RADIUS: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextRole {
    Title,
    Message,
    Badge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DrawCommand {
    /// Cubic curve from the parent anchor to the child anchor.
    Curve {
        from: Point,
        ctrl1: Point,
        ctrl2: Point,
        to: Point,
        color: &'static str,
        width: f32,
    },
    Node {
        commit: usize,
        center: Point,
        radius: f32,
        fill: &'static str,
        stroke: &'static str,
    },
    Badge {
        rect: Rect,
        corner_radius: f32,
        fill: &'static str,
        stroke: &'static str,
    },
    /// `origin` is the left end of the baseline.
    Text {
        origin: Point,
        text: String,
        color: &'static str,
        role: TextRole,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Author,
    Message,
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitRegion {
    pub commit: usize,
    pub kind: HitKind,
    pub rect: Rect,
}

/// Label rectangles per commit index, in logical coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitRegions {
    author: Vec<Rect>,
    message: Vec<Rect>,
}

impl HitRegions {
    fn with_len(len: usize) -> Self {
        Self {
            author: vec![Rect::default(); len],
            message: vec![Rect::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.author.len()
    }

    pub fn is_empty(&self) -> bool {
        self.author.is_empty()
    }

    pub fn author_rect(&self, commit: usize) -> Option<Rect> {
        self.author.get(commit).copied()
    }

    pub fn message_rect(&self, commit: usize) -> Option<Rect> {
        self.message.get(commit).copied()
    }

    pub fn author_at(&self, point: Point) -> Option<usize> {
        self.author.iter().position(|rect| rect.contains(point))
    }

    pub fn message_at(&self, point: Point) -> Option<usize> {
        self.message.iter().position(|rect| rect.contains(point))
    }

    pub fn regions(&self) -> impl Iterator<Item = HitRegion> + '_ {
        let authors = self.author.iter().enumerate().map(|(commit, rect)| HitRegion {
            commit,
            kind: HitKind::Author,
            rect: *rect,
        });
        let messages = self.message.iter().enumerate().map(|(commit, rect)| HitRegion {
            commit,
            kind: HitKind::Message,
            rect: *rect,
        });
        authors.chain(messages)
    }
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub commands: Vec<DrawCommand>,
    pub hits: HitRegions,
    /// Canvas size before scaling.
    pub canvas: CanvasSize,
    pub scale: f32,
    pub font_size: f32,
}

impl RenderOutput {
    pub fn device_size(&self) -> CanvasSize {
        CanvasSize {
            width: self.canvas.width * self.scale,
            height: self.canvas.height * self.scale,
        }
    }
}

/// Paints edges, then nodes, then title labels, message labels and badges.
pub fn render<M: TextMeasure + ?Sized>(
    layout: &GraphLayout,
    view: &ViewState,
    theme: Theme,
    measure: &M,
) -> RenderOutput {
    let config = layout.config();
    let mut commands = Vec::new();
    let mut hits = HitRegions::with_len(layout.len());

    for edge in layout.edges() {
        commands.push(edge_command(layout, &edge, theme));
    }

    for node in layout.nodes() {
        commands.push(DrawCommand::Node {
            commit: node.index,
            center: node.position,
            radius: config.node_radius,
            fill: theme.lane_color(node.lane),
            stroke: theme.node_outline(),
        });
    }

    let max_width = config.max_label_width();
    let ascent = measure.ascent();
    let line_height = measure.line_height();
    let mut title_baselines = Vec::with_capacity(layout.len());

    for node in layout.nodes() {
        let commit = layout.commit(node.index);
        let label = title_label(commit.short_id(), &commit.author);
        let fitted = fit_text(&label, max_width, measure);
        let width = measure.width(&fitted);
        let baseline = node.position.y - config.node_radius - TITLE_GAP;
        let left = node.position.x - width / 2.0;

        hits.author[node.index] = Rect::from_origin(left, baseline - ascent, width, line_height);
        title_baselines.push(baseline);
        commands.push(DrawCommand::Text {
            origin: Point::new(left, baseline),
            text: fitted,
            color: theme.title_color(),
            role: TextRole::Title,
        });
    }

    for node in layout.nodes() {
        let commit = layout.commit(node.index);
        let fitted = fit_text(&commit.summary, max_width, measure);
        let width = measure.width(&fitted);
        let baseline = node.position.y + config.node_radius + ascent + MESSAGE_GAP;
        let left = node.position.x - width / 2.0;

        hits.message[node.index] =
            Rect::from_origin(left, baseline - ascent, width, line_height);
        commands.push(DrawCommand::Text {
            origin: Point::new(left, baseline),
            text: fitted,
            color: theme.message_color(),
            role: TextRole::Message,
        });
    }

    for node in layout.nodes() {
        let commit = layout.commit(node.index);
        let mut baseline = title_baselines[node.index] - ascent - BADGE_GAP;
        for label in layout.refs_for(&commit.id).iter().take(config.max_badges) {
            push_badge(
                &mut commands,
                &label.to_string(),
                node.position.x,
                baseline,
                config,
                theme,
                measure,
            );
            baseline -= line_height + BADGE_GAP;
        }
    }

    RenderOutput {
        commands,
        hits,
        canvas: layout.canvas_size(1.0),
        scale: view.scale,
        font_size: measure.font_size(),
    }
}

pub fn title_label(short_id: &str, author: &str) -> String {
    if author.trim().is_empty() {
        short_id.to_string()
    } else {
        format!("{short_id}  \u{b7}  {author}")
    }
}

/// Vertical offset of a parent edge at the child end, fanning out merges.
pub fn edge_offset(ordinal: usize, parent_count: usize, step: f32) -> f32 {
    if parent_count <= 1 {
        return 0.0;
    }
    (ordinal as f32 - (parent_count as f32 - 1.0) / 2.0) * step
}

/// The first-parent edge takes the child's lane colour, merged-in parents
/// keep their own lane colour.
pub fn edge_color(layout: &GraphLayout, edge: &GraphEdge, theme: Theme) -> &'static str {
    let lane = if edge.is_first_parent() {
        layout.lane_at(edge.child)
    } else {
        layout.lane_at(edge.parent)
    };
    theme.lane_color(lane)
}

/// Control points sit half the horizontal distance in from each end.
pub fn edge_curve(from: Point, to: Point, min_dx: f32) -> (Point, Point) {
    let dx = (to.x - from.x).max(min_dx);
    (
        Point::new(from.x + dx / 2.0, from.y),
        Point::new(to.x - dx / 2.0, to.y),
    )
}

fn edge_command(layout: &GraphLayout, edge: &GraphEdge, theme: Theme) -> DrawCommand {
    let config = layout.config();
    let parent = layout.node_point(edge.parent);
    let mut child = layout.node_point(edge.child);
    child.y += edge_offset(edge.ordinal, edge.parent_count, config.fan_out_step);

    let (ctrl1, ctrl2) = edge_curve(parent, child, config.min_control_dx);
    DrawCommand::Curve {
        from: parent,
        ctrl1,
        ctrl2,
        to: child,
        color: edge_color(layout, edge, theme),
        width: EDGE_WIDTH,
    }
}

fn push_badge<M: TextMeasure + ?Sized>(
    commands: &mut Vec<DrawCommand>,
    text: &str,
    center_x: f32,
    baseline: f32,
    config: &LayoutConfig,
    theme: Theme,
    measure: &M,
) {
    let display = fit_text(text, config.max_label_width(), measure);
    let width = measure.width(&display) + BADGE_PADDING_H * 2.0;
    let height = measure.ascent() + BADGE_PADDING_V * 2.0;
    let left = center_x - width / 2.0;

    commands.push(DrawCommand::Badge {
        rect: Rect::from_origin(left, baseline - height + BADGE_PADDING_V, width, height),
        corner_radius: BADGE_RADIUS,
        fill: theme.badge_fill(),
        stroke: theme.badge_stroke(),
    });
    commands.push(DrawCommand::Text {
        origin: Point::new(left + BADGE_PADDING_H, baseline),
        text: display,
        color: theme.badge_text(),
        role: TextRole::Badge,
    });
}
