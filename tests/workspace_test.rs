// tests/workspace_test.rs
use git2::{BranchType, Repository, Signature};
use std::fs;
use std::path::{Path, PathBuf};
use tag_promote::config::RepositoryConfig;
use tag_promote::domain::{Author, ImageVersion, TagScheme};
use tag_promote::publisher::TagPublisher;
use tag_promote::workspace::Workspace;
use tag_promote::PromoteError;
use tempfile::TempDir;

const IMAGE: &str = "registry.example.com/app";
const PROD: &str = "overlays/prod/kustomization.yaml";
const README: &str = "overlays/README.yaml";
const README_TEXT: &str = "# hand-written, never touched\ntitle:   deploy\n";

fn manifest(tag: &str) -> String {
    format!(
        "resources:\n- ../../base\nimageTags:\n- name: {}\n  newTag: {}\n- name: registry.example.com/sidecar\n  newTag: v0.1.0\n",
        IMAGE, tag
    )
}

/// Create a bare remote whose `branches` all point at one commit of `files`
fn seed_remote(dir: &Path, branches: &[&str], files: &[(&str, String)]) -> PathBuf {
    let seed_dir = dir.join("seed");
    let remote_dir = dir.join("remote.git");

    let seed = Repository::init(&seed_dir).unwrap();
    for (path, content) in files {
        let full_path = seed_dir.join(path);
        fs::create_dir_all(full_path.parent().unwrap()).unwrap();
        fs::write(full_path, content).unwrap();
    }

    let mut index = seed.index().unwrap();
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = seed.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now("seed", "seed@example.com").unwrap();
    let oid = seed
        .commit(None, &signature, &signature, "seed manifests", &tree, &[])
        .unwrap();
    let commit = seed.find_commit(oid).unwrap();

    let remote = Repository::init_bare(&remote_dir).unwrap();
    let mut origin = seed.remote("origin", remote_dir.to_str().unwrap()).unwrap();
    for branch in branches {
        seed.branch(branch, &commit, false).unwrap();
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        origin.push(&[refspec.as_str()], None).unwrap();
    }
    remote.set_head(&format!("refs/heads/{}", branches[0])).unwrap();

    remote_dir
}

fn repository_config(remote: &Path, promotion: Option<&str>) -> RepositoryConfig {
    RepositoryConfig {
        url: remote.to_str().unwrap().to_string(),
        base_branch: "main".to_string(),
        promotion_branch: promotion.map(str::to_string),
        paths: vec![PROD.to_string(), README.to_string()],
    }
}

fn publisher() -> TagPublisher {
    TagPublisher::new(
        IMAGE,
        vec![PROD.to_string(), README.to_string()],
        Author::new("deploy-bot", "deploy-bot@example.com"),
    )
}

fn semantic(tags: &[&str]) -> Vec<ImageVersion> {
    tags.iter()
        .map(|t| ImageVersion::parse(*t, TagScheme::Semantic).unwrap())
        .collect()
}

/// Contents of `path` at the tip of `branch` in the bare remote
fn file_on_branch(remote: &Path, branch: &str, path: &str) -> Option<String> {
    let repo = Repository::open_bare(remote).unwrap();
    let commit = repo
        .find_branch(branch, BranchType::Local)
        .ok()?
        .get()
        .peel_to_commit()
        .unwrap();
    let entry = commit.tree().unwrap().get_path(Path::new(path)).ok()?;
    let blob = entry.to_object(&repo).unwrap().peel_to_blob().unwrap();
    Some(String::from_utf8(blob.content().to_vec()).unwrap())
}

fn branch_tip(remote: &Path, branch: &str) -> Option<String> {
    let repo = Repository::open_bare(remote).unwrap();
    let branch = repo.find_branch(branch, BranchType::Local).ok()?;
    let id = branch.get().peel_to_commit().unwrap().id().to_string();
    Some(id)
}

fn seed_files(tag: &str) -> Vec<(&'static str, String)> {
    vec![(PROD, manifest(tag)), (README, README_TEXT.to_string())]
}

#[test]
fn test_publish_to_base_branch() {
    let dir = TempDir::new().unwrap();
    let remote = seed_remote(dir.path(), &["main"], &seed_files("v1.0.0"));

    let mut workspace = Workspace::open(&repository_config(&remote, None), None).unwrap();
    let report = publisher()
        .publish(&mut workspace, Some("v1.0.0"), &semantic(&["v1.1.0"]))
        .unwrap();

    assert_eq!(report.baseline.as_deref(), Some("v1.1.0"));
    assert_eq!(report.commits.len(), 1);
    assert_eq!(branch_tip(&remote, "main").as_deref(), Some(report.commits[0].hash.as_str()));

    let prod = file_on_branch(&remote, "main", PROD).unwrap();
    assert!(prod.contains("newTag: v1.1.0"));
    assert!(prod.contains("newTag: v0.1.0"));
    assert!(prod.contains("../../base"));
    assert_eq!(file_on_branch(&remote, "main", README).unwrap(), README_TEXT);
}

#[test]
fn test_commit_metadata() {
    let dir = TempDir::new().unwrap();
    let remote = seed_remote(dir.path(), &["main"], &seed_files("v1.0.0"));

    let mut workspace = Workspace::open(&repository_config(&remote, None), None).unwrap();
    publisher()
        .publish(&mut workspace, None, &semantic(&["v1.1.0"]))
        .unwrap();

    let repo = Repository::open_bare(&remote).unwrap();
    let commit = repo
        .find_branch("main", BranchType::Local)
        .unwrap()
        .get()
        .peel_to_commit()
        .unwrap();
    assert_eq!(
        commit.message(),
        Some("update imageTags to v1.1.0 for registry.example.com/app by tag-promote")
    );
    assert_eq!(commit.author().name(), Some("deploy-bot"));
    assert_eq!(commit.author().email(), Some("deploy-bot@example.com"));
    assert_eq!(commit.parent_count(), 1);
}

#[test]
fn test_missing_promotion_branch_starts_from_base() {
    let dir = TempDir::new().unwrap();
    let remote = seed_remote(dir.path(), &["main"], &seed_files("v1.0.0"));
    let base_tip = branch_tip(&remote, "main");

    let mut workspace =
        Workspace::open(&repository_config(&remote, Some("release")), None).unwrap();
    let report = publisher()
        .publish(&mut workspace, None, &semantic(&["v1.2.0"]))
        .unwrap();

    let hash = report.commits[0].hash.clone();
    assert_eq!(branch_tip(&remote, "release"), Some(hash.clone()));
    assert_eq!(branch_tip(&remote, "release-v1.2.0"), Some(hash));
    assert_eq!(branch_tip(&remote, "main"), base_tip);
    assert!(file_on_branch(&remote, "release", PROD).unwrap().contains("newTag: v1.2.0"));
}

#[test]
fn test_existing_promotion_branch_is_checked_out() {
    let dir = TempDir::new().unwrap();
    let remote = seed_remote(dir.path(), &["main", "release"], &seed_files("v1.0.0"));

    // Move release ahead of main through a first run
    let mut workspace =
        Workspace::open(&repository_config(&remote, Some("release")), None).unwrap();
    publisher()
        .publish(&mut workspace, None, &semantic(&["v1.1.0"]))
        .unwrap();
    drop(workspace);

    let mut workspace =
        Workspace::open(&repository_config(&remote, Some("release")), None).unwrap();
    let prod = String::from_utf8(workspace.read(PROD).unwrap()).unwrap();
    assert!(prod.contains("newTag: v1.1.0"));

    // Reapplying the same tag on the advanced branch is a no-op
    let report = publisher()
        .publish(&mut workspace, Some("v1.0.0"), &semantic(&["v1.1.0"]))
        .unwrap();
    assert!(report.commits.is_empty());
}

#[test]
fn test_missing_base_branch_fails() {
    let dir = TempDir::new().unwrap();
    let remote = seed_remote(dir.path(), &["develop"], &seed_files("v1.0.0"));

    let result = Workspace::open(&repository_config(&remote, None), None);
    assert!(matches!(result, Err(PromoteError::Repo(_))));
}

#[test]
fn test_unreachable_remote_fails() {
    let dir = TempDir::new().unwrap();
    let config = repository_config(&dir.path().join("does-not-exist.git"), None);

    let result = Workspace::open(&config, None);
    assert!(matches!(result, Err(PromoteError::Repo(_))));
}

#[test]
fn test_stale_clone_push_is_rejected() {
    let dir = TempDir::new().unwrap();
    let remote = seed_remote(dir.path(), &["main"], &seed_files("v1.0.0"));

    // Both clones start from the same tip; the first one to push wins
    let mut first = Workspace::open(&repository_config(&remote, None), None).unwrap();
    let mut stale = Workspace::open(&repository_config(&remote, None), None).unwrap();

    let report = publisher()
        .publish(&mut first, None, &semantic(&["v1.1.0"]))
        .unwrap();
    let winner = report.commits[0].hash.clone();

    let failure = publisher()
        .publish(&mut stale, Some("v1.0.0"), &semantic(&["v1.2.0"]))
        .unwrap_err();

    assert!(matches!(failure.source, PromoteError::Repo(_)));
    assert_eq!(failure.baseline.as_deref(), Some("v1.0.0"));
    assert_eq!(branch_tip(&remote, "main"), Some(winner));
    assert!(file_on_branch(&remote, "main", PROD).unwrap().contains("newTag: v1.1.0"));
}
