use crate::domain::ports::LedgerApi;
use crate::utils::error::{HoloFuelError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

pub const DEFAULT_BASE: [&str; 3] = ["http://localhost:3141", "fn", "transaction"];

/// A Holochain dApp's REST API: every call is a POST to the base URL
/// terms joined with the endpoint's terms.
#[derive(Debug, Clone)]
pub struct RestClient {
    base: Vec<String>,
    client: Client,
}

impl RestClient {
    /// An empty base means the default local dApp endpoint.
    pub fn new<I, S>(base: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut base: Vec<String> = base.into_iter().map(Into::into).collect();
        if base.is_empty() {
            base = DEFAULT_BASE.iter().map(|s| s.to_string()).collect();
        }
        Self {
            base,
            client: Client::new(),
        }
    }

    /// Join the base and `parts`, eg. `url(&["v1", "some", "endpoint"])`.
    pub fn url(&self, parts: &[&str]) -> String {
        self.base
            .iter()
            .map(String::as_str)
            .chain(parts.iter().copied())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// POST to the endpoint, with an optional JSON body. Anything but a
    /// 200 response is an error.
    pub async fn post(&self, parts: &[&str], json: Option<&Value>) -> Result<reqwest::Response> {
        let url = self.url(parts);
        tracing::debug!("POST {}", url);
        let mut request = self.client.post(&url);
        if let Some(json) = json {
            request = request.json(json);
        }
        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());
        if response.status() != reqwest::StatusCode::OK {
            return Err(HoloFuelError::HttpStatusError {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response)
    }
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE)
    }
}

/// The Holo Fuel ledger over REST.
#[derive(Debug, Clone, Default)]
pub struct HolofuelClient {
    rest: RestClient,
}

impl HolofuelClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }
}

#[async_trait]
impl LedgerApi for HolofuelClient {
    async fn set_limits(&self, limits: &Value) -> Result<Value> {
        let response = self.rest.post(&["setLimits"], Some(limits)).await?;
        Ok(response.json().await?)
    }

    async fn get_ledger_state(&self) -> Result<Value> {
        let response = self.rest.post(&["getLedgerState"], None).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let rest = RestClient::default();
        assert_eq!(
            rest.url(&["setLimits"]),
            "http://localhost:3141/fn/transaction/setLimits"
        );
        let rest = RestClient::new(["https://fuel.example", "v1"]);
        assert_eq!(rest.url(&[]), "https://fuel.example/v1");
        assert_eq!(
            RestClient::new(Vec::<String>::new()).url(&["x"]),
            "http://localhost:3141/fn/transaction/x"
        );
    }
}
