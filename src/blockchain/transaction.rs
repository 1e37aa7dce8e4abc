//! Transaction building, signing and broadcast.
//!
//! # Responsibilities
//! - Reference the head block (TaPoS) and set the expiration window
//! - Serialize the transaction in ledger binary form and sign it
//! - Broadcast through the ledger client and produce a confirmation

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::blockchain::client::LedgerClient;
use crate::blockchain::serializer::{Writer, TIME_FORMAT};
use crate::blockchain::types::{
    Confirmation, DynamicGlobalProperties, LedgerError, LedgerResult,
};
use crate::blockchain::wallet::Wallet;
use crate::operations::{Operation, OperationSet};

/// Unsigned transaction. JSON form is what nodes receive; signatures cover
/// the binary form from [`Transaction::canonical_bytes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: String,
    pub operations: Vec<Operation>,
    pub extensions: Vec<serde_json::Value>,
}

impl Transaction {
    /// Ledger binary serialization covered by signatures.
    pub fn canonical_bytes(&self) -> LedgerResult<Vec<u8>> {
        if !self.extensions.is_empty() {
            return Err(LedgerError::Malformed("transaction extensions are not supported".into()));
        }
        let mut w = Writer::default();
        w.header(self.ref_block_num, self.ref_block_prefix);
        w.time(&self.expiration)?;
        w.operations(&self.operations)?;
        w.no_extensions();
        Ok(w.into_bytes())
    }

    /// Transaction id: first 20 bytes of sha256 over the canonical bytes, hex.
    pub fn id(&self) -> LedgerResult<String> {
        let digest = Sha256::digest(self.canonical_bytes()?);
        Ok(alloy::primitives::hex::encode(&digest[..20]))
    }
}

/// A transaction with its signatures attached.
#[derive(Debug, Clone, Serialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub signatures: Vec<String>,
}

/// Reference block number and prefix for the current head.
pub fn tapos(props: &DynamicGlobalProperties) -> LedgerResult<(u16, u32)> {
    let ref_block_num = (props.head_block_number & 0xFFFF) as u16;

    let id = alloy::primitives::hex::decode(&props.head_block_id)
        .map_err(|e| LedgerError::Malformed(format!("head_block_id: {e}")))?;
    let prefix_bytes: [u8; 4] = id
        .get(4..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| LedgerError::Malformed("head_block_id shorter than 8 bytes".into()))?;

    Ok((ref_block_num, u32::from_le_bytes(prefix_bytes)))
}

/// Head block time plus `window_secs`, in ledger format.
pub fn expiration_after(head_time: &str, window_secs: u64) -> LedgerResult<String> {
    let head = NaiveDateTime::parse_from_str(head_time, TIME_FORMAT)
        .map_err(|e| LedgerError::Malformed(format!("head block time '{head_time}': {e}")))?;
    let window = i64::try_from(window_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| LedgerError::Malformed("expiration window out of range".into()))?;
    let expiration = head
        .checked_add_signed(window)
        .ok_or_else(|| LedgerError::Malformed("expiration out of range".into()))?;
    Ok(expiration.format(TIME_FORMAT).to_string())
}

/// Builds, signs and broadcasts transactions for a local key.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    client: LedgerClient,
}

impl TxBuilder {
    /// Create a new transaction builder.
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// Unsigned transaction for `operations` anchored at the current head.
    pub async fn prepare(&self, operations: &OperationSet) -> LedgerResult<Transaction> {
        let props = self.client.get_dynamic_global_properties().await?;
        let (ref_block_num, ref_block_prefix) = tapos(&props)?;
        let expiration = expiration_after(&props.time, self.client.config().expiration_secs)?;

        Ok(Transaction {
            ref_block_num,
            ref_block_prefix,
            expiration,
            operations: operations.operations().to_vec(),
            extensions: Vec::new(),
        })
    }

    /// Attach a signature from `wallet`.
    pub fn sign(
        &self,
        transaction: Transaction,
        wallet: &Wallet,
    ) -> LedgerResult<SignedTransaction> {
        let signature = wallet.sign(&transaction.canonical_bytes()?)?;
        Ok(SignedTransaction {
            transaction,
            signatures: vec![alloy::primitives::hex::encode(signature)],
        })
    }

    /// Prepare, sign and broadcast; waits for block inclusion.
    pub async fn sign_and_broadcast(
        &self,
        operations: &OperationSet,
        wallet: &Wallet,
    ) -> LedgerResult<Confirmation> {
        let transaction = self.prepare(operations).await?;
        let local_id = transaction.id()?;
        let signed = self.sign(transaction, wallet)?;

        let receipt = self.client.broadcast_transaction(&signed).await?;
        if receipt.expired {
            return Err(LedgerError::Rpc(serde_json::json!({
                "message": "expired transaction",
                "id": receipt.id,
            })));
        }

        let transaction_id = if receipt.id.is_empty() { local_id } else { receipt.id.clone() };
        tracing::info!(
            transaction_id = %transaction_id,
            block = receipt.block_num,
            "Transaction included"
        );

        let raw = serde_json::to_value(&receipt).ok();
        let mut confirmation = Confirmation::confirmed(transaction_id, receipt.block_num);
        confirmation.raw = raw;
        Ok(confirmation)
    }
}
