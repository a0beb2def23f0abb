//! Throwaway repositories built directly with `git2`.

#![allow(dead_code)]

use std::path::Path;

use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

pub struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let repo = Repository::init(dir.path()).expect("failed to init repository");
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Commits an empty tree with fixed author and commit time.
    pub fn commit(&self, message: &str, author: &str, time: i64, parents: &[Oid]) -> Oid {
        let email = format!("{}@example.com", author.to_lowercase());
        let signature = Signature::new(author, &email, &Time::new(time, 0)).unwrap();
        let tree_id = self.repo.treebuilder(None).unwrap().write().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let parents: Vec<git2::Commit<'_>> = parents
            .iter()
            .map(|oid| self.repo.find_commit(*oid).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        self.repo
            .commit(None, &signature, &signature, message, &tree, &parent_refs)
            .unwrap()
    }

    pub fn branch(&self, name: &str, target: Oid) {
        self.repo
            .reference(&format!("refs/heads/{name}"), target, true, "test branch")
            .unwrap();
    }

    pub fn checkout(&self, name: &str) {
        self.repo.set_head(&format!("refs/heads/{name}")).unwrap();
    }

    pub fn lightweight_tag(&self, name: &str, target: Oid) {
        self.repo
            .reference(&format!("refs/tags/{name}"), target, true, "test tag")
            .unwrap();
    }

    pub fn annotated_tag(&self, name: &str, target: Oid) {
        let object = self.repo.find_object(target, None).unwrap();
        let tagger = Signature::new("Tagger", "tagger@example.com", &Time::new(5000, 0)).unwrap();
        self.repo
            .tag(name, &object, &tagger, &format!("release {name}"), true)
            .unwrap();
    }
}

/// Ids of the commits in [`merge_history`].
pub struct MergeHistory {
    pub repo: TestRepo,
    pub initial: Oid,
    pub main_work: Oid,
    pub feature_work: Oid,
    pub merge: Oid,
}

/// `initial <- main work <- merge` on `main`, with `feature work` branching
/// off `initial` and merged back. `v1.0` (annotated) marks the merge and
/// `old` (lightweight) the initial commit.
pub fn merge_history() -> MergeHistory {
    let repo = TestRepo::new();
    let initial = repo.commit("initial import", "Ada", 1_000, &[]);
    let main_work = repo.commit("main work\n\nmore detail", "Ada", 2_000, &[initial]);
    let feature_work = repo.commit("feature work", "Grace", 3_000, &[initial]);
    let merge = repo.commit("Merge feature", "Ada", 4_000, &[main_work, feature_work]);

    repo.branch("main", merge);
    repo.branch("feature", feature_work);
    repo.checkout("main");
    repo.annotated_tag("v1.0", merge);
    repo.lightweight_tag("old", initial);

    MergeHistory {
        repo,
        initial,
        main_work,
        feature_work,
        merge,
    }
}
