//! Publishing files to a GitHub branch through the Git data API.
//!
//! A publish resolves the branch head, uploads a blob per file, builds a
//! tree from them, and fast-forwards the branch onto a new commit. When the
//! tree is unchanged no commit is made.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use ureq::RequestBuilder;

use super::HttpClient;
use crate::error::{Error, Result};

const SERVICE: &str = "GitHub";
const TIMEOUT: Duration = Duration::from_secs(10);
const API_VERSION: &str = "2022-11-28";

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Commit and tree at the tip of a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchHead {
    pub commit_sha: String,
    pub tree_sha: String,
}

/// One entry of a Git tree
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: String,
}

impl TreeEntry {
    /// Regular, non-executable file
    pub fn file(path: &str, sha: String) -> Self {
        TreeEntry {
            path: path.to_string(),
            mode: "100644",
            kind: "blob",
            sha,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Unchanged { commit_sha: String },
    Committed { commit_sha: String },
}

#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaResponse,
}

pub struct GitHubClient {
    client: HttpClient,
    api_url: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    /// `repo` must look like `owner/name`
    pub fn new(api_url: &str, repo: &str, token: &str) -> Result<Self> {
        validate_repo(repo)?;
        if token.trim().is_empty() {
            return Err(Error::auth(SERVICE, "empty token"));
        }

        Ok(GitHubClient {
            client: HttpClient::new(SERVICE, TIMEOUT),
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
        })
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}{}", self.api_url, self.repo, path)
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        request
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", self.client.user_agent())
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {url}");
        let response = self.authorize(self.client.agent().get(&url)).call();
        self.client.read_json(response)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        let url = self.url(path);
        debug!("POST {url}");
        let response = self
            .authorize(self.client.agent().post(&url))
            .send_json(body);
        self.client.read_json(response)
    }

    fn patch<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        let url = self.url(path);
        debug!("PATCH {url}");
        let response = self
            .authorize(self.client.agent().patch(&url))
            .send_json(body);
        self.client.read_json(response)
    }

    /// Resolve the commit and tree a branch points at
    pub fn branch_head(&self, branch: &str) -> Result<BranchHead> {
        let reference: RefResponse = self.get(&format!("/git/ref/heads/{branch}"))?;
        if reference.object.kind != "commit" {
            return Err(Error::decode(
                SERVICE,
                format!("heads/{branch} points at a {}", reference.object.kind),
            ));
        }
        let commit_sha = check_sha(reference.object.sha)?;

        let commit: CommitResponse = self.get(&format!("/git/commits/{commit_sha}"))?;
        let tree_sha = check_sha(commit.tree.sha)?;

        Ok(BranchHead {
            commit_sha,
            tree_sha,
        })
    }

    pub fn create_blob(&self, content: &str) -> Result<String> {
        let body = json!({ "content": content, "encoding": "utf-8" });
        let blob: ShaResponse = self.post("/git/blobs", &body)?;
        check_sha(blob.sha)
    }

    pub fn create_tree(&self, entries: &[TreeEntry]) -> Result<String> {
        let body = json!({ "tree": entries });
        let tree: ShaResponse = self.post("/git/trees", &body)?;
        check_sha(tree.sha)
    }

    pub fn create_commit(&self, message: &str, tree_sha: &str, parent_sha: &str) -> Result<String> {
        let body = json!({
            "message": message,
            "parents": [parent_sha],
            "tree": tree_sha,
        });
        let commit: ShaResponse = self.post("/git/commits", &body)?;
        check_sha(commit.sha)
    }

    /// Fast-forward a branch; GitHub rejects non-fast-forward updates
    pub fn update_branch(&self, branch: &str, commit_sha: &str) -> Result<()> {
        let body = json!({ "sha": commit_sha, "force": false });
        let reference: RefResponse = self.patch(&format!("/git/refs/heads/{branch}"), &body)?;

        if reference.object.kind != "commit" || reference.object.sha != commit_sha {
            return Err(Error::decode(
                SERVICE,
                format!("heads/{branch} did not move to {commit_sha}"),
            ));
        }
        info!("Updated '{}/{}' to {}", self.repo, branch, commit_sha);
        Ok(())
    }

    /// Replace the branch contents with `files` (path, content), committing only on change
    pub fn commit_files(
        &self,
        head: &BranchHead,
        branch: &str,
        message: &str,
        files: &[(&str, &str)],
    ) -> Result<PublishOutcome> {
        let mut entries = Vec::with_capacity(files.len());
        for (path, content) in files {
            entries.push(TreeEntry::file(path, self.create_blob(content)?));
        }

        let tree_sha = self.create_tree(&entries)?;
        if tree_sha == head.tree_sha {
            info!("'{}/{}' already at tree {}", self.repo, branch, tree_sha);
            return Ok(PublishOutcome::Unchanged {
                commit_sha: head.commit_sha.clone(),
            });
        }

        let commit_sha = self.create_commit(message, &tree_sha, &head.commit_sha)?;
        self.update_branch(branch, &commit_sha)?;
        Ok(PublishOutcome::Committed { commit_sha })
    }
}

fn validate_repo(repo: &str) -> Result<()> {
    let mut parts = repo.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(Error::InvalidConfig(format!(
            "repository must be OWNER/NAME, got '{repo}'"
        ))),
    }
}

/// Git object ids are 40 hex characters
fn check_sha(sha: String) -> Result<String> {
    if sha.len() == 40 && sha.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(sha)
    } else {
        Err(Error::decode(SERVICE, format!("invalid object id '{sha}'")))
    }
}
