//! Read-only canvas data client.
//!
//! Two upstreams: a JSON-RPC `eth_call` against the art contract for the
//! current epoch, and the indexer's GraphQL API for canvas statistics.
//! Endpoints resolve override → environment → default at construction time.

use alloy::primitives::U256;
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result, anyhow, bail};
use pd_api_types::{CanvasSnapshot, Contribution};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The art contract; its `today()` view returns the current epoch.
pub const ART_CONTRACT: &str = "0xba5e05cb26b78eda3a2f8e3b3814726305dcac83";

const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";
const DEFAULT_GRAPHQL_URL: &str = "https://graphql.basepaint.xyz/";
const DEFAULT_ART_URL: &str = "https://basepaint.xyz/api/art/image";

sol! {
    function today() external view returns (uint256);
}

const CANVAS_QUERY: &str = r#"
query GetCanvasData($id: Int!) {
  canvas(id: $id) {
    id
    totalMints
    totalEarned
    pixelsCount
    contributions(orderBy: "pixelsCount", orderDirection: "desc", limit: 1000) {
      items {
        account {
          id
        }
        pixelsCount
      }
    }
  }
}
"#;

pub struct CanvasClient {
    http: reqwest::Client,
    rpc_url: String,
    graphql_url: String,
    art_url: String,
}

impl Default for CanvasClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasClient {
    pub fn new() -> Self {
        Self::with_endpoints(
            env_or("CANVAS_RPC_URL", DEFAULT_RPC_URL),
            env_or("CANVAS_GRAPHQL_URL", DEFAULT_GRAPHQL_URL),
            env_or("CANVAS_ART_URL", DEFAULT_ART_URL),
        )
    }

    pub fn with_endpoints(
        rpc_url: impl Into<String>,
        graphql_url: impl Into<String>,
        art_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            graphql_url: graphql_url.into(),
            art_url: art_url.into(),
        }
    }

    /// Canonical current canvas id: the contract's epoch minus one (the
    /// latest finalized canvas).
    pub async fn current_canvas_id(&self) -> Result<u64> {
        let call_data = format!("0x{}", alloy::hex::encode(todayCall {}.abi_encode()));
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": ART_CONTRACT, "data": call_data }, "latest"],
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .context("epoch read transport")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("epoch read HTTP {status}: {text}");
        }

        let body: RpcResponse = response.json().await.context("epoch read parse")?;
        if let Some(error) = body.error {
            bail!("epoch read RPC error {}: {}", error.code, error.message);
        }
        let result = body.result.context("epoch read returned no result")?;
        let epoch = decode_epoch(&result)?;
        debug!("art contract reports epoch {epoch}");
        epoch
            .checked_sub(1)
            .context("epoch has not advanced past the first canvas")
    }

    pub async fn canvas_snapshot(&self, id: u64) -> Result<CanvasSnapshot> {
        let body = GraphQlRequest {
            query: CANVAS_QUERY,
            variables: CanvasVariables { id },
        };

        let response = self
            .http
            .post(&self.graphql_url)
            .json(&body)
            .send()
            .await
            .context("canvas data transport")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("canvas data HTTP {status}: {text}");
        }

        let body: GraphQlResponse = response.json().await.context("canvas data parse")?;
        if let Some(errors) = body.errors {
            let joined: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            bail!("canvas data query failed: {}", joined.join("; "));
        }

        let canvas = body
            .data
            .and_then(|data| data.canvas)
            .with_context(|| format!("canvas {id} not found"))?;
        Ok(canvas.into())
    }

    /// Raw PNG bytes of a canvas artwork, fetched from the upstream art host.
    pub async fn fetch_artwork(&self, id: u64) -> Result<Vec<u8>> {
        let url = format!("{}?day={id}", self.art_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("artwork transport")?;

        let status = response.status();
        if !status.is_success() {
            bail!("artwork upstream HTTP {status}");
        }

        Ok(response.bytes().await.context("artwork body")?.to_vec())
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

fn decode_epoch(result: &str) -> Result<u64> {
    let hex = result.trim_start_matches("0x");
    if hex.is_empty() {
        bail!("empty eth_call result");
    }
    let value = U256::from_str_radix(hex, 16).context("non-hex eth_call result")?;
    u64::try_from(value).map_err(|_| anyhow!("epoch out of range: {value}"))
}

/// App-relative artwork URL, proxied through the image endpoint.
pub fn artwork_url(base_url: &str, id: u64) -> String {
    format!("{}/api/art/image?day={id}", base_url.trim_end_matches('/'))
}

/// Wei (decimal string) rendered as ETH with four decimals.
pub fn format_eth(wei: &str) -> String {
    let Ok(wei) = wei.parse::<u128>() else {
        return "0.0000".to_owned();
    };
    let whole = wei / 1_000_000_000_000_000_000;
    let frac = (wei % 1_000_000_000_000_000_000) / 100_000_000_000_000;
    format!("{whole}.{frac:04}")
}

/// 0x1234...abcd shortening for display.
pub fn format_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_owned();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

// ── Wire types ──

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: CanvasVariables,
}

#[derive(Debug, Serialize)]
struct CanvasVariables {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<CanvasDataWire>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CanvasDataWire {
    canvas: Option<CanvasWire>,
}

#[derive(Debug, Deserialize)]
struct CanvasWire {
    id: u64,
    #[serde(rename = "totalMints")]
    total_mints: u64,
    #[serde(rename = "totalEarned")]
    total_earned: String,
    #[serde(rename = "pixelsCount")]
    pixels_count: u64,
    contributions: ContributionsWire,
}

#[derive(Debug, Deserialize)]
struct ContributionsWire {
    items: Vec<ContributionWire>,
}

#[derive(Debug, Deserialize)]
struct ContributionWire {
    account: AccountWire,
    #[serde(rename = "pixelsCount")]
    pixels_count: u64,
}

#[derive(Debug, Deserialize)]
struct AccountWire {
    id: String,
}

impl From<CanvasWire> for CanvasSnapshot {
    fn from(wire: CanvasWire) -> Self {
        CanvasSnapshot {
            id: wire.id,
            total_mints: wire.total_mints,
            total_earned_wei: wire.total_earned,
            pixels_count: wire.pixels_count,
            contributions: wire
                .contributions
                .items
                .into_iter()
                .map(|item| Contribution {
                    account: item.account.id,
                    pixels_count: item.pixels_count,
                })
                .collect(),
        }
    }
}
