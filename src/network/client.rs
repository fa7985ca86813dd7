use std::time::Duration;

use serde::de::DeserializeOwned;
use ureq::http::Response;
use ureq::{Agent, Body};

use crate::error::{Error, Result};

/// Blocking HTTP agent bound to one remote service.
///
/// Non-2xx statuses are returned as responses rather than transport errors so
/// that 401/403 can be told apart from other failures.
#[derive(Clone)]
pub struct HttpClient {
    agent: Agent,
    service: &'static str,
    user_agent: String,
}

impl HttpClient {
    pub fn new(service: &'static str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        HttpClient {
            agent: config.into(),
            service,
            user_agent: format!(
                "gametrack-data/{} (https://github.com/josh/gametrack-data)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Check the status of a finished request and decode its JSON body
    pub fn read_json<T: DeserializeOwned>(
        &self,
        response: std::result::Result<Response<Body>, ureq::Error>,
    ) -> Result<T> {
        let mut response = response.map_err(|e| Error::network(self.service, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(Error::from_status(self.service, status.as_u16(), &body));
        }

        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| Error::decode(self.service, e.to_string()))
    }
}
