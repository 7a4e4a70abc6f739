//! HTTP scenarios against the Diet API.
//!
//! Each [`Scenario`] names one endpoint shape of the system under test and
//! produces a fresh request path per invocation (random page, category or
//! template id, like the hand-written load scripts did). [`HttpOperation`]
//! turns a scenario into a collector [`Operation`].

use crate::collector::{Operation, RequestError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Benchmarked endpoints
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Scenario {
    /// GET /api/categories
    #[clap(name = "categories")]
    Categories,

    /// GET /api/foods with a random page
    #[clap(name = "foods-paginated")]
    FoodsPaginated,

    /// GET /api/foods filtered by a random category
    #[clap(name = "foods-filtered")]
    FoodsFiltered,

    /// GET /api/templates/{id}/full, the multi-join endpoint
    #[clap(name = "template-full")]
    TemplateFull,

    /// All scenarios, in the order above
    #[clap(name = "all")]
    All,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scenario::Categories => write!(f, "GET /api/categories"),
            Scenario::FoodsPaginated => write!(f, "GET /api/foods (paginated)"),
            Scenario::FoodsFiltered => write!(f, "GET /api/foods (filtered)"),
            Scenario::TemplateFull => write!(f, "GET /api/templates/{{id}}/full"),
            Scenario::All => write!(f, "All Scenarios"),
        }
    }
}

impl Scenario {
    /// Expand the "All" variant to every concrete scenario
    pub fn expand_all(scenarios: Vec<Scenario>) -> Vec<Scenario> {
        if scenarios.contains(&Scenario::All) {
            vec![
                Scenario::Categories,
                Scenario::FoodsPaginated,
                Scenario::FoodsFiltered,
                Scenario::TemplateFull,
            ]
        } else {
            scenarios
        }
    }

    /// Stable short name, used as the operation name and the run log file stem.
    pub fn slug(&self) -> &'static str {
        match self {
            Scenario::Categories => "categories",
            Scenario::FoodsPaginated => "foods-paginated",
            Scenario::FoodsFiltered => "foods-filtered",
            Scenario::TemplateFull => "template-full",
            Scenario::All => "all",
        }
    }

    /// Request path (with query) for one invocation.
    pub fn path<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match self {
            Scenario::Categories | Scenario::All => "/api/categories".to_string(),
            Scenario::FoodsPaginated => {
                format!("/api/foods?page={}&limit=20", rng.gen_range(1..=10))
            }
            Scenario::FoodsFiltered => format!(
                "/api/foods?category_id={}&page=1&limit=20",
                rng.gen_range(1..=5)
            ),
            Scenario::TemplateFull => format!("/api/templates/{}/full", rng.gen_range(1..=3)),
        }
    }
}

/// One GET request per invocation against `base_url`.
///
/// The `reqwest::Client` is shared by every task of a collection, so
/// connections are pooled across invocations.
pub struct HttpOperation {
    client: reqwest::Client,
    base_url: String,
    scenario: Scenario,
}

impl HttpOperation {
    pub fn new(client: reqwest::Client, base_url: &str, scenario: Scenario) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            scenario,
        }
    }
}

/// Build the shared HTTP client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

#[async_trait]
impl Operation for HttpOperation {
    async fn execute(&self) -> std::result::Result<(), RequestError> {
        let url = {
            let mut rng = rand::thread_rng();
            format!("{}{}", self.base_url, self.scenario.path(&mut rng))
        };

        let response = self.client.get(&url).send().await.map_err(classify)?;
        let status = response.status();
        // Drain the body so the timing covers the full transfer.
        response.bytes().await.map_err(classify)?;

        if status.as_u16() >= 400 {
            return Err(RequestError::Status(status.as_u16()));
        }
        Ok(())
    }
}

fn classify(err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        RequestError::Timeout
    } else {
        RequestError::Transport(err.to_string())
    }
}
