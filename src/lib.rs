//! Horizontal, lane-based commit graphs.
//!
//! Commits flow left (oldest) to right (newest). Every branch gets a
//! persistent lane, parent links are drawn as curves and refs as badges.
//! The [`layout::GraphLayout`] is rebuilt once per loaded commit set and the
//! [`render`] and [`interaction`] modules consume it read-only.

pub mod attribution;
pub mod config;
pub mod geometry;
pub mod git;
pub mod interaction;
pub mod lanes;
pub mod layout;
pub mod model;
pub mod render;
#[cfg(feature = "server")]
pub mod serve;
pub mod svg;
pub mod text;
pub mod theme;
pub mod view;

pub use attribution::{FALLBACK_BRANCH, attribute_branches};
pub use config::{AppConfig, ConfigError, FilterConfig};
pub use geometry::{CoordinateMapper, LayoutConfig, Padding};
pub use git::{GitError, GitHistory, History};
pub use interaction::{
    Action, Hit, Modifiers, PointerEvent, PointerKind, ViewState, Viewport, handle_pointer_event,
    hit_test,
};
pub use lanes::LaneAssignment;
pub use layout::{GraphEdge, GraphLayout, Node};
pub use model::{CanvasSize, Commit, Point, Rect, RefLabel, RefsByCommit};
pub use render::{DrawCommand, HitKind, HitRegion, HitRegions, RenderOutput, render};
pub use text::{ApproxMetrics, ELLIPSIS, TextMeasure, fit_text};
pub use theme::Theme;
pub use view::{GraphView, LoadTicket};
