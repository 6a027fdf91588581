//! Gateway client: GraphQL tag queries and network height.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{HeightSource, LedgerError, ReportIndex, ReportQuery, Result};

/// HTTP client for an Arweave gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct NetworkInfo {
    height: u64,
}

impl GatewayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_graphql(&self, query: String) -> Result<Value> {
        let url = format!("{}/graphql", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "query": query }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ReportIndex for GatewayClient {
    async fn first_report_tx_id(&self, query: &ReportQuery) -> Result<Option<String>> {
        let body = self.post_graphql(report_query_graphql(query)).await?;
        let id = first_edge_id(&body);
        debug!(
            epoch_start_height = query.epoch_start_height,
            found = id.is_some(),
            "report lookup complete"
        );
        Ok(id)
    }
}

#[async_trait]
impl HeightSource for GatewayClient {
    async fn current_height(&self) -> Result<u64> {
        let url = format!("{}/info", self.base_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let info: NetworkInfo = response.json().await?;
        Ok(info.height)
    }
}

/// GraphQL query for the earliest report of an epoch by one owner.
pub fn report_query_graphql(query: &ReportQuery) -> String {
    // JSON string literals are valid GraphQL string literals.
    let owner = Value::from(query.owner.as_str());
    let height = Value::from(query.epoch_start_height.to_string());
    let app_name = Value::from(query.app_name.as_str());
    format!(
        r#"{{
  transactions(
    sort: HEIGHT_ASC,
    first: 1,
    owners: [{owner}],
    tags: [
      {{ name: "AR-IO-Epoch-Start-Height", values: [{height}] }},
      {{ name: "App-Name", values: [{app_name}] }}
    ]
  ) {{
    edges {{
      node {{
        id
      }}
    }}
  }}
}}"#
    )
}

/// Id of the first edge in a `transactions` response.
///
/// Edges are taken in the order the gateway returned them. Anything other
/// than a list of edges with string ids is treated as "no record".
pub fn first_edge_id(body: &Value) -> Option<String> {
    body.pointer("/data/transactions/edges")?
        .as_array()?
        .first()?
        .pointer("/node/id")?
        .as_str()
        .map(str::to_string)
}
