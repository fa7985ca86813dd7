//! Remote game library served over HTTP.
//!
//! `GET <url>?offset=N&limit=M` with a bearer token, answering with a JSON
//! array of game objects keyed by the CSV column names.

use std::time::Duration;

use tracing::debug;

use super::HttpClient;
use crate::data::{Game, GameSource};
use crate::error::{Error, Result};

const SERVICE: &str = "game API";
const TIMEOUT: Duration = Duration::from_secs(30);

pub struct ApiSource {
    client: HttpClient,
    url: String,
    token: String,
}

impl ApiSource {
    /// Fails with an auth error before any request when the token is missing
    pub fn new(url: String, token: Option<String>) -> Result<Self> {
        let token = token.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
            Error::auth(
                SERVICE,
                "no API token; pass --api-token or set GAMETRACK_API_TOKEN",
            )
        })?;

        Ok(ApiSource {
            client: HttpClient::new(SERVICE, TIMEOUT),
            url,
            token,
        })
    }
}

impl GameSource for ApiSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Game>> {
        debug!(offset, limit, "GET {}", self.url);
        let response = self
            .client
            .agent()
            .get(&self.url)
            .query("offset", offset.to_string())
            .query("limit", limit.to_string())
            .header("Accept", "application/json")
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("User-Agent", self.client.user_agent())
            .call();

        let mut games: Vec<Game> = self.client.read_json(response)?;
        for game in &mut games {
            game.backfill_release_year();
        }
        Ok(games)
    }
}
