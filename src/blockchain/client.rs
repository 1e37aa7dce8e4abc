//! Ledger JSON-RPC client with timeout and failover handling.
//!
//! # Responsibilities
//! - POST JSON-RPC requests to an ordered list of nodes
//! - Query chain state (dynamic global properties for TaPoS)
//! - Broadcast signed transactions synchronously
//! - Handle timeouts and network errors gracefully
//!
//! # Design Decisions
//! - Reads are idempotent: every node is tried, then the whole list is
//!   retried with backoff
//! - A broadcast moves to the next node only on a connect error; a timeout
//!   may mean the node accepted it, so it is surfaced instead
//! - A node-level RPC error is final: another node would reject it the same way

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::blockchain::transaction::SignedTransaction;
use crate::blockchain::types::{
    BroadcastReceipt, DynamicGlobalProperties, LedgerConfig, LedgerError, LedgerResult,
};
use crate::observability::metrics;
use crate::resilience::{retry_idempotent, BackoffPolicy, RetryPolicy};

const GET_DYNAMIC_GLOBAL_PROPERTIES: &str = "condenser_api.get_dynamic_global_properties";
const BROADCAST_TRANSACTION: &str = "condenser_api.broadcast_transaction_synchronous";

/// Ledger RPC client with failover support.
#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    /// Nodes in failover order.
    nodes: Vec<Url>,
    config: LedgerConfig,
    timeout_duration: Duration,
}

impl LedgerClient {
    /// Create a new ledger client.
    ///
    /// Invalid node URLs are skipped with a warning; at least one must parse.
    /// No request is made here.
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        let timeout = Duration::from_secs(config.rpc_timeout_secs);
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_http(http, config)
    }

    /// Client over a shared HTTP pool. Each call is still bounded by
    /// `rpc_timeout_secs`.
    pub fn with_http(http: reqwest::Client, config: LedgerConfig) -> LedgerResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);

        let mut nodes = Vec::with_capacity(config.nodes.len());
        for raw in &config.nodes {
            match Url::parse(raw) {
                Ok(url) => nodes.push(url),
                Err(e) => tracing::warn!(url = %raw, error = %e, "Ignoring invalid node URL"),
            }
        }
        if nodes.is_empty() {
            return Err(LedgerError::InvalidUrl {
                url: config.nodes.join(","),
                reason: "no usable node URL".to_string(),
            });
        }

        tracing::debug!(nodes = nodes.len(), "Ledger client initialized");

        Ok(Self {
            http,
            nodes,
            config,
            timeout_duration,
        })
    }

    /// Head block data used to reference the chain in a new transaction.
    pub async fn get_dynamic_global_properties(&self) -> LedgerResult<DynamicGlobalProperties> {
        self.read(GET_DYNAMIC_GLOBAL_PROPERTIES, json!([])).await
    }

    /// Broadcast and wait for block inclusion.
    pub async fn broadcast_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> LedgerResult<BroadcastReceipt> {
        let params = json!([tx]);
        let mut last_error = String::new();

        for (i, node) in self.nodes.iter().enumerate() {
            match self.call_node(node, BROADCAST_TRANSACTION, &params).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) if e.is_connect() => {
                    tracing::warn!(node_idx = i, error = %e, "Node unreachable, trying next node");
                    last_error = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::AllNodesFailed(last_error))
    }

    /// Check if any node answers.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_dynamic_global_properties().await.is_ok();
        metrics::record_node_health(healthy);
        healthy
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn read<T: DeserializeOwned>(&self, method: &str, params: Value) -> LedgerResult<T> {
        let policy = RetryPolicy {
            max_retries: self.config.read_retries,
            backoff: BackoffPolicy::new(
                self.config.retry_base_delay_ms,
                self.config.retry_max_delay_ms,
            ),
        };
        let params = &params;
        retry_idempotent(
            policy,
            |_| self.read_any_node(method, params),
            |e| matches!(e, LedgerError::AllNodesFailed(_)),
        )
        .await
    }

    async fn read_any_node<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &Value,
    ) -> LedgerResult<T> {
        let mut last_error = String::new();
        for (i, node) in self.nodes.iter().enumerate() {
            match self.call_node(node, method, params).await {
                Ok(result) => return Ok(result),
                Err(e @ LedgerError::Rpc(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(node_idx = i, method, error = %e, "RPC error, trying next node");
                    last_error = e.to_string();
                }
            }
        }
        Err(LedgerError::AllNodesFailed(last_error))
    }

    async fn call_node<T: DeserializeOwned>(
        &self,
        node: &Url,
        method: &str,
        params: &Value,
    ) -> LedgerResult<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let envelope = match timeout(self.timeout_duration, self.post(node, &body)).await {
            Ok(result) => result?,
            Err(_) => return Err(LedgerError::Timeout(self.config.rpc_timeout_secs)),
        };

        parse_envelope(envelope)
    }

    async fn post(&self, node: &Url, body: &Value) -> LedgerResult<Value> {
        let response = self.http.post(node.clone()).json(body).send().await?;
        let status = response.status();
        match response.json::<Value>().await {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => {
                Err(LedgerError::Malformed(format!("HTTP status {status}")))
            }
            Err(e) => Err(LedgerError::Http(e)),
        }
    }
}

/// Split a JSON-RPC envelope into its result or error.
fn parse_envelope<T: DeserializeOwned>(mut envelope: Value) -> LedgerResult<T> {
    if let Some(error) = envelope.get_mut("error").map(Value::take) {
        if !error.is_null() {
            return Err(LedgerError::Rpc(error));
        }
    }
    match envelope.get_mut("result").map(Value::take) {
        Some(result) => serde_json::from_value(result)
            .map_err(|e| LedgerError::Malformed(format!("unexpected result shape: {e}"))),
        None => Err(LedgerError::Malformed("envelope has neither result nor error".into())),
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("nodes", &self.config.nodes)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
