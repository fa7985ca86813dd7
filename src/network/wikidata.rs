//! Wikidata lookup of item ids by IGDB game id.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use super::HttpClient;
use crate::data::Game;
use crate::error::{Error, Result};

const SERVICE: &str = "Wikidata";
const SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
const TIMEOUT: Duration = Duration::from_secs(60);

/// Items whose best-ranked "IGDB game ID" (P5794) carries the given numeric id (P9043)
const SPARQL_QUERY: &str = "
SELECT ?item ?igdb_id WHERE {
  VALUES ?igdb_id { ?IGDB_IDS }
  ?item p:P5794 [ pq:P9043 ?igdb_id; rdf:type wikibase:BestRank ].
}
";

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<SparqlBinding>,
}

#[derive(Debug, Deserialize)]
struct SparqlBinding {
    item: SparqlValue,
    igdb_id: SparqlValue,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

pub struct WikidataClient {
    client: HttpClient,
    endpoint: String,
}

impl WikidataClient {
    pub fn new() -> Self {
        WikidataClient {
            client: HttpClient::new(SERVICE, TIMEOUT),
            endpoint: SPARQL_ENDPOINT.to_string(),
        }
    }

    /// Map each IGDB id to its Wikidata QID; ids without an item are absent
    pub fn lookup(&self, igdb_ids: &[i64]) -> Result<HashMap<i64, String>> {
        if igdb_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = build_query(igdb_ids);
        let response = self
            .client
            .agent()
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .header("User-Agent", self.client.user_agent())
            .send_form([("query", query.as_str())]);

        let response: SparqlResponse = self.client.read_json(response)?;
        parse_bindings(response)
    }

    /// Fill `wikidata_qid` on every game that has a matching item
    pub fn enrich(&self, games: &mut [Game]) -> Result<()> {
        let mut ids: Vec<i64> = games.iter().map(|g| g.igdb_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let items = self.lookup(&ids)?;
        info!("Matched {} of {} games to Wikidata items", items.len(), ids.len());

        for game in games.iter_mut() {
            if let Some(qid) = items.get(&game.igdb_id) {
                game.wikidata_qid = qid.clone();
            }
        }
        Ok(())
    }
}

fn build_query(igdb_ids: &[i64]) -> String {
    let values = igdb_ids
        .iter()
        .map(|id| format!("\"{id}\""))
        .collect::<Vec<_>>()
        .join(" ");
    SPARQL_QUERY.replace("?IGDB_IDS", &values)
}

fn parse_bindings(response: SparqlResponse) -> Result<HashMap<i64, String>> {
    let mut items = HashMap::new();

    for binding in response.results.bindings {
        let qid = binding
            .item
            .value
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if !qid.starts_with('Q') {
            return Err(Error::decode(SERVICE, format!("not an item id: {}", binding.item.value)));
        }

        let igdb_id: i64 = binding.igdb_id.value.parse().map_err(|_| {
            Error::decode(SERVICE, format!("not an IGDB id: {}", binding.igdb_id.value))
        })?;
        items.insert(igdb_id, qid);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::stub_server::StubServer;

    fn client_for(server: &StubServer) -> WikidataClient {
        WikidataClient {
            client: HttpClient::new(SERVICE, TIMEOUT),
            endpoint: format!("{}/sparql", server.url),
        }
    }

    #[test]
    fn test_build_query_lists_quoted_ids() {
        let query = build_query(&[1942, 7346]);
        assert!(query.contains(r#"VALUES ?igdb_id { "1942" "7346" }"#));
        assert!(!query.contains("?IGDB_IDS"));
    }

    #[test]
    fn test_parse_bindings() {
        let response: SparqlResponse = serde_json::from_str(
            r#"{"head": {"vars": ["item", "igdb_id"]},
                "results": {"bindings": [
                    {"item": {"type": "uri", "value": "http://www.wikidata.org/entity/Q18346290"},
                     "igdb_id": {"type": "literal", "value": "1942"}},
                    {"item": {"type": "uri", "value": "http://www.wikidata.org/entity/Q21086035"},
                     "igdb_id": {"type": "literal", "value": "7346"}}
                ]}}"#,
        )
        .unwrap();

        let items = parse_bindings(response).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[&1942], "Q18346290");
        assert_eq!(items[&7346], "Q21086035");
    }

    #[test]
    fn test_parse_bindings_rejects_non_items() {
        let response: SparqlResponse = serde_json::from_str(
            r#"{"results": {"bindings": [
                {"item": {"value": "http://www.wikidata.org/entity/P5794"},
                 "igdb_id": {"value": "1942"}}
            ]}}"#,
        )
        .unwrap();

        assert!(matches!(parse_bindings(response), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_lookup_without_ids_skips_request() {
        let client = WikidataClient::new();
        assert!(client.lookup(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_enrich_fills_matching_games() {
        let server = StubServer::start(vec![(
            200,
            r#"{"results": {"bindings": [
                {"item": {"value": "http://www.wikidata.org/entity/Q18346290"},
                 "igdb_id": {"value": "1942"}}
            ]}}"#,
        )]);
        let mut games = vec![
            Game {
                igdb_id: 1942,
                ..Game::default()
            },
            Game {
                igdb_id: 99,
                ..Game::default()
            },
            Game {
                igdb_id: 1942,
                ..Game::default()
            },
        ];

        client_for(&server).enrich(&mut games).unwrap();
        assert_eq!(games[0].wikidata_qid, "Q18346290");
        assert_eq!(games[1].wikidata_qid, "");
        assert_eq!(games[2].wikidata_qid, "Q18346290");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/sparql");
        assert!(requests[0]
            .header("content-type")
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded")));
        assert!(requests[0].body.starts_with("query="));
        assert!(requests[0].body.contains("1942"));
        assert!(requests[0].body.contains("99"));
    }

    #[test]
    fn test_enrich_propagates_server_errors() {
        let server = StubServer::start(vec![(500, "query timeout")]);
        let mut games = vec![Game {
            igdb_id: 1942,
            ..Game::default()
        }];
        let err = client_for(&server).enrich(&mut games).unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert_eq!(games[0].wikidata_qid, "");
    }
}
