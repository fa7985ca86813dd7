//! HTTP integrations: the remote game API, Wikidata, and GitHub publishing.

mod api;
mod client;
mod github;
mod wikidata;

#[cfg(test)]
pub(crate) mod stub_server;

pub use api::ApiSource;
pub use client::HttpClient;
pub use github::{BranchHead, GitHubClient, PublishOutcome, DEFAULT_API_URL};
pub use wikidata::WikidataClient;
