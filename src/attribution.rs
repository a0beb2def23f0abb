//! Branch attribution: decides which branch every loaded commit belongs to.
//!
//! Labels are seeded from branch refs at tips, pushed back along first-parent
//! chains, inherited from first-parent children where still missing, and
//! finally defaulted to [`FALLBACK_BRANCH`]. All scans run in index order so
//! the result never depends on hash-map iteration.

use std::collections::HashMap;

use crate::model::{Commit, RefLabel, RefsByCommit};

pub const FALLBACK_BRANCH: &str = "root";

/// Returns one branch label per commit, in the same order as `commits`.
pub fn attribute_branches(commits: &[Commit], refs: &RefsByCommit) -> Vec<String> {
    let index: HashMap<&str, usize> = commits
        .iter()
        .enumerate()
        .map(|(idx, commit)| (commit.id.as_str(), idx))
        .collect();
    let first_parents: Vec<Option<usize>> = commits
        .iter()
        .map(|commit| {
            commit
                .first_parent()
                .and_then(|parent| index.get(parent).copied())
        })
        .collect();

    let mut labels: Vec<Option<String>> = commits
        .iter()
        .map(|commit| seed_label(refs.get(&commit.id).map(Vec::as_slice).unwrap_or(&[])))
        .collect();

    propagate_to_ancestors(&mut labels, &first_parents);
    inherit_from_children(&mut labels, &first_parents);

    labels
        .into_iter()
        .map(|label| label.unwrap_or_else(|| FALLBACK_BRANCH.to_string()))
        .collect()
}

/// Lexicographically smallest branch name among the commit's refs.
fn seed_label(labels: &[RefLabel]) -> Option<String> {
    labels
        .iter()
        .filter_map(RefLabel::branch_name)
        .min()
        .map(str::to_string)
}

fn propagate_to_ancestors(labels: &mut [Option<String>], first_parents: &[Option<usize>]) {
    for idx in (0..labels.len()).rev() {
        let Some(label) = labels[idx].clone() else {
            continue;
        };

        let mut cursor = first_parents[idx];
        while let Some(parent) = cursor {
            // An ancestor that is already labelled keeps its own branch.
            if labels[parent].is_some() {
                break;
            }
            labels[parent] = Some(label.clone());
            cursor = first_parents[parent];
        }
    }
}

fn inherit_from_children(labels: &mut [Option<String>], first_parents: &[Option<usize>]) {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); labels.len()];
    for (child, parent) in first_parents.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(child);
        }
    }

    for idx in (0..labels.len()).rev() {
        if labels[idx].is_some() {
            continue;
        }
        let inherited = children[idx]
            .iter()
            .find_map(|&child| labels[child].clone());
        labels[idx] = inherited;
    }
}
