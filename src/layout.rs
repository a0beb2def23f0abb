use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::attribution::attribute_branches;
use crate::geometry::{CoordinateMapper, LayoutConfig};
use crate::lanes::LaneAssignment;
use crate::model::{CanvasSize, Commit, Point, RefLabel, RefsByCommit};

/// The full derived layout for one commit window.
///
/// Built once per `(commits, refs)` pair and never patched afterwards; a
/// reload produces a fresh instance.
#[derive(Debug, Clone)]
pub struct GraphLayout {
    commits: Vec<Commit>,
    refs: RefsByCommit,
    index: HashMap<String, usize>,
    branches: Vec<String>,
    lanes: LaneAssignment,
    mapper: CoordinateMapper,
    config: LayoutConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub index: usize,
    pub lane: usize,
    pub position: Point,
}

/// A child-to-parent link where both ends are inside the loaded window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub child: usize,
    pub parent: usize,
    pub ordinal: usize,
    pub parent_count: usize,
}

impl GraphEdge {
    pub fn is_first_parent(&self) -> bool {
        self.ordinal == 0
    }
}

impl GraphLayout {
    /// `commits` must be ordered oldest to newest.
    pub fn build(commits: Vec<Commit>, refs: RefsByCommit, config: LayoutConfig) -> Self {
        let index = commits
            .iter()
            .enumerate()
            .map(|(idx, commit)| (commit.id.clone(), idx))
            .collect();
        let branches = attribute_branches(&commits, &refs);
        let lanes = LaneAssignment::assign(&branches);
        let mapper = CoordinateMapper::new(config, lanes.special_lane);

        debug!(
            commits = commits.len(),
            lanes = lanes.lane_count(),
            special_lane = lanes.special_lane,
            "built commit graph layout"
        );

        Self {
            commits,
            refs,
            index,
            branches,
            lanes,
            mapper,
            config,
        }
    }

    pub fn empty(config: LayoutConfig) -> Self {
        Self::build(Vec::new(), RefsByCommit::new(), config)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn commit(&self, index: usize) -> &Commit {
        &self.commits[index]
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn lanes(&self) -> &LaneAssignment {
        &self.lanes
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.lane_count()
    }

    pub fn special_lane(&self) -> usize {
        self.lanes.special_lane
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn lane(&self, id: &str) -> Option<usize> {
        self.index_of(id).map(|idx| self.lanes.lane_of(idx))
    }

    pub fn lane_at(&self, index: usize) -> usize {
        self.lanes.lane_of(index)
    }

    pub fn branch_of(&self, id: &str) -> Option<&str> {
        self.index_of(id).map(|idx| self.branches[idx].as_str())
    }

    pub fn branch_at(&self, index: usize) -> &str {
        &self.branches[index]
    }

    pub fn refs_for(&self, id: &str) -> &[RefLabel] {
        self.refs.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Logical position of the commit at `index`.
    pub fn node_point(&self, index: usize) -> Point {
        self.mapper.point(index, self.lanes.lane_of(index))
    }

    /// Device position of a commit at the given scale.
    pub fn position(&self, id: &str, scale: f32) -> Option<Point> {
        self.index_of(id)
            .map(|idx| self.node_point(idx).scaled(scale))
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        (0..self.commits.len()).map(|index| Node {
            index,
            lane: self.lanes.lane_of(index),
            position: self.node_point(index),
        })
    }

    /// Parent links in paint order; parents outside the window are skipped.
    pub fn edges(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        self.commits
            .iter()
            .enumerate()
            .flat_map(move |(child, commit)| {
                let parent_count = commit.parents.len();
                commit
                    .parents
                    .iter()
                    .enumerate()
                    .filter_map(move |(ordinal, parent)| {
                        self.index_of(parent).map(|parent| GraphEdge {
                            child,
                            parent,
                            ordinal,
                            parent_count,
                        })
                    })
            })
    }

    pub fn canvas_size(&self, scale: f32) -> CanvasSize {
        self.mapper
            .canvas_size(self.commits.len(), self.lane_count(), scale)
    }
}
