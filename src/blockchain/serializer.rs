//! Ledger binary serialization of transactions.
//!
//! Signatures and transaction ids cover these bytes, not the JSON a node
//! receives. Layout:
//!
//! ```text
//! ref_block_num      u16 LE
//! ref_block_prefix   u32 LE
//! expiration         u32 LE (unix seconds)
//! operations         varint count, then per op: varint id + fields
//! extensions         varint count (always 0)
//! ```
//!
//! Strings are a varint byte length followed by UTF-8. Assets are an i64
//! amount, a precision byte and a 7-byte zero-padded symbol.

use chrono::NaiveDateTime;

use crate::blockchain::types::{LedgerError, LedgerResult};
use crate::operations::types::{Asset, AssetSymbol, BeneficiariesExtension, Operation};

/// Ledger timestamp format (UTC, no zone suffix).
pub(crate) const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Numeric operation ids in the ledger's operation variant.
fn operation_id(op: &Operation) -> u32 {
    match op {
        Operation::Vote(_) => 0,
        Operation::Comment(_) => 1,
        Operation::Transfer(_) => 2,
        Operation::TransferToVesting(_) => 3,
        Operation::WithdrawVesting(_) => 4,
        Operation::AccountWitnessVote(_) => 12,
        Operation::CustomJson(_) => 18,
        Operation::CommentOptions(_) => 19,
        Operation::TransferToSavings(_) => 32,
        Operation::TransferFromSavings(_) => 33,
        Operation::CancelTransferFromSavings(_) => 34,
        Operation::ClaimRewardBalance(_) => 39,
        Operation::DelegateVestingShares(_) => 40,
        Operation::UpdateProposalVotes(_) => 45,
    }
}

/// Symbol bytes on the wire. Mainnet kept the pre-rename names.
fn wire_symbol(symbol: AssetSymbol) -> &'static [u8] {
    match symbol {
        AssetSymbol::Hive => b"STEEM",
        AssetSymbol::Hbd => b"SBD",
        AssetSymbol::Vests => b"VESTS",
    }
}

#[derive(Debug, Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn bool(&mut self, v: bool) {
        self.u8(u8::from(v));
    }

    /// Unsigned LEB128.
    fn varint(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.u8(byte);
                return;
            }
            self.u8(byte | 0x80);
        }
    }

    fn len(&mut self, n: usize) {
        self.varint(n as u64);
    }

    fn string(&mut self, s: &str) {
        self.len(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn strings(&mut self, items: &[String]) {
        self.len(items.len());
        for item in items {
            self.string(item);
        }
    }

    fn asset(&mut self, asset: &Asset) -> LedgerResult<()> {
        let amount = i64::try_from(asset.units())
            .map_err(|_| LedgerError::Malformed(format!("amount {asset} out of range")))?;
        self.buf.extend_from_slice(&amount.to_le_bytes());
        self.u8(asset.symbol().precision() as u8);
        let mut symbol = [0u8; 7];
        let name = wire_symbol(asset.symbol());
        symbol[..name.len()].copy_from_slice(name);
        self.buf.extend_from_slice(&symbol);
        Ok(())
    }

    /// Unix seconds of a ledger timestamp.
    pub(crate) fn time(&mut self, timestamp: &str) -> LedgerResult<()> {
        let parsed = NaiveDateTime::parse_from_str(timestamp, TIME_FORMAT)
            .map_err(|e| LedgerError::Malformed(format!("timestamp '{timestamp}': {e}")))?;
        let secs = u32::try_from(parsed.and_utc().timestamp())
            .map_err(|_| LedgerError::Malformed(format!("timestamp '{timestamp}' out of range")))?;
        self.u32(secs);
        Ok(())
    }

    pub(crate) fn header(&mut self, ref_block_num: u16, ref_block_prefix: u32) {
        self.u16(ref_block_num);
        self.u32(ref_block_prefix);
    }

    pub(crate) fn operations(&mut self, operations: &[Operation]) -> LedgerResult<()> {
        self.len(operations.len());
        for op in operations {
            self.operation(op)?;
        }
        Ok(())
    }

    /// Empty extension list.
    pub(crate) fn no_extensions(&mut self) {
        self.len(0);
    }

    fn beneficiaries(&mut self, tag: u8, ext: &BeneficiariesExtension) {
        self.varint(u64::from(tag));
        self.len(ext.beneficiaries.len());
        for b in &ext.beneficiaries {
            self.string(&b.account);
            self.u16(b.weight);
        }
    }

    fn operation(&mut self, op: &Operation) -> LedgerResult<()> {
        self.varint(u64::from(operation_id(op)));
        match op {
            Operation::Vote(op) => {
                self.string(&op.voter);
                self.string(&op.author);
                self.string(&op.permlink);
                self.i16(op.weight);
            }
            Operation::Comment(op) => {
                self.string(&op.parent_author);
                self.string(&op.parent_permlink);
                self.string(&op.author);
                self.string(&op.permlink);
                self.string(&op.title);
                self.string(&op.body);
                self.string(&op.json_metadata);
            }
            Operation::CommentOptions(op) => {
                self.string(&op.author);
                self.string(&op.permlink);
                self.asset(&op.max_accepted_payout)?;
                self.u16(op.percent_hbd);
                self.bool(op.allow_votes);
                self.bool(op.allow_curation_rewards);
                self.len(op.extensions.len());
                for (tag, ext) in &op.extensions {
                    self.beneficiaries(*tag, ext);
                }
            }
            Operation::Transfer(op) => {
                self.string(&op.from);
                self.string(&op.to);
                self.asset(&op.amount)?;
                self.string(&op.memo);
            }
            Operation::TransferToSavings(op) => {
                self.string(&op.from);
                self.string(&op.to);
                self.asset(&op.amount)?;
                self.string(&op.memo);
            }
            Operation::TransferFromSavings(op) => {
                self.string(&op.from);
                self.u32(op.request_id);
                self.string(&op.to);
                self.asset(&op.amount)?;
                self.string(&op.memo);
            }
            Operation::CancelTransferFromSavings(op) => {
                self.string(&op.from);
                self.u32(op.request_id);
            }
            Operation::TransferToVesting(op) => {
                self.string(&op.from);
                self.string(&op.to);
                self.asset(&op.amount)?;
            }
            Operation::WithdrawVesting(op) => {
                self.string(&op.account);
                self.asset(&op.vesting_shares)?;
            }
            Operation::DelegateVestingShares(op) => {
                self.string(&op.delegator);
                self.string(&op.delegatee);
                self.asset(&op.vesting_shares)?;
            }
            Operation::ClaimRewardBalance(op) => {
                self.string(&op.account);
                self.asset(&op.reward_hive)?;
                self.asset(&op.reward_hbd)?;
                self.asset(&op.reward_vests)?;
            }
            Operation::CustomJson(op) => {
                self.strings(&op.required_auths);
                self.strings(&op.required_posting_auths);
                self.string(&op.id);
                self.string(&op.json);
            }
            Operation::AccountWitnessVote(op) => {
                self.string(&op.account);
                self.string(&op.witness);
                self.bool(op.approve);
            }
            Operation::UpdateProposalVotes(op) => {
                if !op.extensions.is_empty() {
                    return Err(LedgerError::Malformed(
                        "update_proposal_votes extensions are not supported".into(),
                    ));
                }
                self.string(&op.voter);
                self.len(op.proposal_ids.len());
                for id in &op.proposal_ids {
                    self.u64(*id);
                }
                self.bool(op.approve);
                self.no_extensions();
            }
        }
        Ok(())
    }
}
