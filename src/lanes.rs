//! Lane assignment: one horizontal track per branch label.
//!
//! Lanes are numbered in the order their label first appears, oldest commit
//! first. The lane holding the newest commit is the special lane that the
//! coordinate mapper sets apart with an extra gap.

use std::collections::HashMap;

use serde::Serialize;

/// Integer lanes derived from branch labels, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneAssignment {
    /// Lane per commit index.
    pub lanes: Vec<usize>,
    /// Branch label per lane index.
    pub labels: Vec<String>,
    /// Lane of the newest loaded commit (0 for an empty window).
    pub special_lane: usize,
}

impl LaneAssignment {
    /// `branch_labels` must be ordered oldest to newest.
    pub fn assign(branch_labels: &[String]) -> Self {
        let mut lane_of_label: HashMap<&str, usize> = HashMap::new();
        let mut labels = Vec::new();
        let mut lanes = Vec::with_capacity(branch_labels.len());

        for label in branch_labels {
            let lane = *lane_of_label.entry(label.as_str()).or_insert_with(|| {
                labels.push(label.clone());
                labels.len() - 1
            });
            lanes.push(lane);
        }

        let special_lane = lanes.last().copied().unwrap_or(0);

        Self {
            lanes,
            labels,
            special_lane,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.labels.len()
    }

    pub fn lane_of(&self, index: usize) -> usize {
        self.lanes[index]
    }

    pub fn label_of_lane(&self, lane: usize) -> Option<&str> {
        self.labels.get(lane).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lanes_follow_first_appearance() {
        let assignment = LaneAssignment::assign(&labels(&["root", "main", "feature", "main"]));

        assert_eq!(assignment.lanes, vec![0, 1, 2, 1]);
        assert_eq!(assignment.labels, labels(&["root", "main", "feature"]));
        assert_eq!(assignment.lane_count(), 3);
        assert_eq!(assignment.special_lane, 1);
    }

    #[test]
    fn empty_window_has_no_lanes() {
        let assignment = LaneAssignment::assign(&[]);

        assert_eq!(assignment.lane_count(), 0);
        assert_eq!(assignment.special_lane, 0);
        assert!(assignment.lanes.is_empty());
    }

    #[test]
    fn label_lookup_by_lane() {
        let assignment = LaneAssignment::assign(&labels(&["main", "dev"]));
        assert_eq!(assignment.label_of_lane(1), Some("dev"));
        assert_eq!(assignment.label_of_lane(2), None);
    }
}
