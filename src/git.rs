//! Commit history provider backed by `git2`.
//!
//! Produces the oldest-to-newest commit window and the ref map that
//! [`GraphLayout::build`](crate::layout::GraphLayout::build) consumes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{TimeZone, Utc};
use git2::{BranchType, ErrorCode, Oid, Repository, Sort};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::FilterConfig;
use crate::model::{Commit, RefLabel, RefsByCommit};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    #[error("git error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            ErrorCode::NotFound => GitError::RefNotFound {
                refname: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

/// One loaded commit window plus what the host needs to describe it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Oldest first.
    pub commits: Vec<Commit>,
    pub refs: RefsByCommit,
    /// Local branches whose labels were allowed into `refs`.
    pub branch_names: Vec<String>,
    pub status: String,
}

impl History {
    fn empty(filters: &FilterConfig) -> Self {
        Self {
            status: status_line(0, 0, filters),
            ..Self::default()
        }
    }
}

/// `Showing N commits • M branches` plus the active filters.
pub fn status_line(commits: usize, branches: usize, filters: &FilterConfig) -> String {
    format!(
        "Showing {commits} commits \u{2022} {branches} branches{}",
        filters.describe()
    )
}

pub fn error_status(err: &GitError) -> String {
    format!("Git repo not found or error: {err}")
}

#[derive(Debug, Clone)]
struct BranchTip {
    name: String,
    oid: Oid,
    time: i64,
}

pub struct GitHistory {
    repo: Repository,
}

impl GitHistory {
    /// Opens the repository containing `path`; any subdirectory works.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        fs::metadata(path)?;
        let repo = Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        debug!(path = %path.display(), "opened repository");
        Ok(Self { repo })
    }

    pub fn load_commits(&self, filters: &FilterConfig) -> Result<History, GitError> {
        let started = Instant::now();
        let heads = self.sorted_heads()?;
        let newest: Vec<&BranchTip> = heads.iter().take(filters.max_branches).collect();

        let matching = filters.branch.as_deref().and_then(|wanted| {
            let wanted = wanted.to_lowercase();
            heads.iter().find(|tip| tip.name.to_lowercase() == wanted)
        });

        let mut start_points: Vec<Oid> = match matching {
            Some(tip) => vec![tip.oid],
            None => newest.iter().map(|tip| tip.oid).collect(),
        };
        dedup_in_order(&mut start_points);

        if start_points.is_empty() {
            if let Some(wanted) = filters.branch.as_deref() {
                if let Some(oid) = self.peel_reference(&format!("refs/heads/{wanted}"))? {
                    start_points.push(oid);
                }
            }
        }
        if start_points.is_empty() {
            match self.head_commit()? {
                Some(oid) => start_points.push(oid),
                None => {
                    info!("repository has no commits yet");
                    return Ok(History::empty(filters));
                }
            }
        }

        let tags = self.tags_by_commit()?;
        let commits = self.walk(&start_points, filters, &tags)?;

        let branch_names: Vec<String> = match matching {
            Some(tip) => vec![tip.name.clone()],
            None => newest.iter().map(|tip| tip.name.clone()).collect(),
        };
        let refs = build_refs(&commits, &heads, &branch_names, &tags);
        let status = status_line(commits.len(), branch_names.len(), filters);

        info!(
            commits = commits.len(),
            branches = branch_names.len(),
            start_points = start_points.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded commit history"
        );

        Ok(History {
            commits,
            refs,
            branch_names,
            status,
        })
    }

    /// Local branch names, most recently committed first.
    pub fn list_branches(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .sorted_heads()?
            .into_iter()
            .map(|tip| tip.name)
            .collect())
    }

    pub fn list_tags(&self) -> Result<Vec<String>, GitError> {
        let mut names: Vec<String> = self
            .repo
            .tag_names(None)?
            .iter()
            .flatten()
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Distinct author names among the newest `scan_limit` commits reachable
    /// from any local branch, sorted case-insensitively.
    pub fn list_authors(&self, scan_limit: usize) -> Result<Vec<String>, GitError> {
        let mut start_points: Vec<Oid> = self.sorted_heads()?.iter().map(|tip| tip.oid).collect();
        dedup_in_order(&mut start_points);
        if start_points.is_empty() {
            match self.head_commit()? {
                Some(oid) => start_points.push(oid),
                None => return Ok(Vec::new()),
            }
        }

        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        for oid in &start_points {
            walk.push(*oid)?;
        }

        let mut authors: BTreeMap<String, String> = BTreeMap::new();
        for oid in walk.take(scan_limit) {
            let commit = self.repo.find_commit(oid?)?;
            let author = commit.author();
            if let Some(name) = author.name().map(str::trim).filter(|name| !name.is_empty()) {
                authors
                    .entry(name.to_lowercase())
                    .or_insert_with(|| name.to_string());
            }
        }
        Ok(authors.into_values().collect())
    }

    fn walk(
        &self,
        start_points: &[Oid],
        filters: &FilterConfig,
        tags: &HashMap<Oid, Vec<String>>,
    ) -> Result<Vec<Commit>, GitError> {
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        for oid in start_points {
            walk.push(*oid)?;
        }

        let author_filter = filters.author.as_deref().map(str::to_lowercase);
        let tag_filter = filters.tag.as_deref().map(str::to_lowercase);
        let message_filter = filters.message.as_deref().map(str::to_lowercase);

        let mut kept = Vec::new();
        for oid in walk {
            if kept.len() >= filters.max_commits {
                break;
            }
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;

            if let Some(wanted) = &author_filter {
                let name = commit.author().name().unwrap_or_default().to_lowercase();
                if name != *wanted {
                    continue;
                }
            }
            if let Some(wanted) = &tag_filter {
                let tagged = tags
                    .get(&oid)
                    .is_some_and(|names| names.iter().any(|name| name.to_lowercase() == *wanted));
                if !tagged {
                    continue;
                }
            }
            if let Some(wanted) = &message_filter {
                let message = commit.message().unwrap_or_default().to_lowercase();
                if !message.contains(wanted.as_str()) {
                    continue;
                }
            }

            kept.push(to_commit(&commit));
        }

        kept.reverse();
        Ok(kept)
    }

    fn sorted_heads(&self) -> Result<Vec<BranchTip>, GitError> {
        let mut tips = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            let Some(name) = branch.name().ok().flatten().map(str::to_string) else {
                continue;
            };
            match branch.get().peel_to_commit() {
                Ok(commit) => tips.push(BranchTip {
                    name,
                    oid: commit.id(),
                    time: commit.time().seconds(),
                }),
                Err(err) => warn!(branch = %name, error = %err, "skipping branch without a commit"),
            }
        }
        tips.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(tips)
    }

    fn tags_by_commit(&self) -> Result<HashMap<Oid, Vec<String>>, GitError> {
        let mut tags: HashMap<Oid, Vec<String>> = HashMap::new();
        for reference in self.repo.references_glob("refs/tags/*")? {
            let reference = reference?;
            let Some(name) = reference
                .name()
                .and_then(|name| name.strip_prefix("refs/tags/"))
                .map(str::to_string)
            else {
                continue;
            };
            if let Ok(commit) = reference.peel_to_commit() {
                tags.entry(commit.id()).or_default().push(name);
            }
        }
        for names in tags.values_mut() {
            names.sort();
        }
        Ok(tags)
    }

    fn peel_reference(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => Ok(reference.peel_to_commit().ok().map(|commit| commit.id())),
            Err(err) if err.code() == ErrorCode::NotFound || err.code() == ErrorCode::InvalidSpec => {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn head_commit(&self) -> Result<Option<Oid>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(err) if err.code() == ErrorCode::UnbornBranch || err.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn to_commit(commit: &git2::Commit<'_>) -> Commit {
    let author = commit.author();
    Commit {
        id: commit.id().to_string(),
        parents: commit.parent_ids().map(|oid| oid.to_string()).collect(),
        author: author.name().unwrap_or_default().to_string(),
        email: author.email().unwrap_or_default().to_string(),
        time: Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_default(),
        summary: commit.summary().unwrap_or_default().to_string(),
        message: commit.message().unwrap_or_default().trim_end().to_string(),
    }
}

/// Branch labels for the allowed heads, then every tag, limited to commits
/// inside the window.
fn build_refs(
    commits: &[Commit],
    heads: &[BranchTip],
    allowed: &[String],
    tags: &HashMap<Oid, Vec<String>>,
) -> RefsByCommit {
    let in_window: HashSet<&str> = commits.iter().map(|commit| commit.id.as_str()).collect();
    let mut refs = RefsByCommit::new();

    for tip in heads.iter().filter(|tip| allowed.contains(&tip.name)) {
        let id = tip.oid.to_string();
        if in_window.contains(id.as_str()) {
            refs.entry(id).or_default().push(RefLabel::Branch(tip.name.clone()));
        }
    }
    for (oid, names) in tags {
        let id = oid.to_string();
        if in_window.contains(id.as_str()) {
            let labels = refs.entry(id).or_default();
            labels.extend(names.iter().cloned().map(RefLabel::Tag));
        }
    }
    for labels in refs.values_mut() {
        labels.sort_by(|a, b| match (a, b) {
            (RefLabel::Branch(_), RefLabel::Tag(_)) => std::cmp::Ordering::Less,
            (RefLabel::Tag(_), RefLabel::Branch(_)) => std::cmp::Ordering::Greater,
            _ => a.name().cmp(b.name()),
        });
    }
    refs
}

fn dedup_in_order(oids: &mut Vec<Oid>) {
    let mut seen = HashSet::new();
    oids.retain(|oid| seen.insert(*oid));
}
