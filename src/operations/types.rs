//! Operation payloads, assets and authority levels.
//!
//! Payload structs declare their fields in ledger order. Field order is part
//! of the contract: the canonical string handed to signers and extensions is
//! the compact JSON of these structs, and two builds from identical inputs
//! must produce byte-identical output.

use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building operations from domain parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Vote weight outside the ledger's accepted range.
    #[error("Vote weight {0} outside -10000..=10000")]
    WeightOutOfRange(i32),

    /// Account name does not follow ledger naming rules.
    #[error("Invalid account name '{0}'")]
    InvalidAccount(String),

    /// Permlink empty, too long or malformed.
    #[error("Invalid permlink: {0}")]
    InvalidPermlink(String),

    /// Asset string could not be parsed or is out of range.
    #[error("Invalid amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: &'static str },

    /// custom_json id longer than the ledger allows.
    #[error("custom_json id '{0}' exceeds 32 characters")]
    CustomJsonIdTooLong(String),

    /// custom_json payload is not valid JSON.
    #[error("custom_json payload is not valid JSON: {0}")]
    InvalidJson(String),

    /// Memo longer than the ledger allows.
    #[error("Memo exceeds {max} bytes")]
    MemoTooLong { max: usize },

    /// Beneficiary list rejected.
    #[error("Invalid beneficiaries: {0}")]
    InvalidBeneficiaries(String),

    /// Percentage field outside 0..=10000.
    #[error("Percent {0} outside 0..=10000")]
    PercentOutOfRange(u32),

    /// An action produced no operations.
    #[error("Operation set is empty")]
    Empty,

    /// Any other shape violation.
    #[error("{0}")]
    Invalid(String),
}

/// Result type for operation building.
pub type BuildResult<T> = Result<T, BuildError>;

/// Credential tier required to sign an operation set.
///
/// Ordered: `Posting < Active`, so the authority of a set is the max over
/// its operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityLevel {
    /// Social and content actions.
    Posting,
    /// Funds-moving and governance actions.
    Active,
}

impl AuthorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorityLevel::Posting => "posting",
            AuthorityLevel::Active => "active",
        }
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset symbols understood by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetSymbol {
    Hive,
    Hbd,
    Vests,
}

impl AssetSymbol {
    /// Number of decimal places the ledger expects.
    pub fn precision(&self) -> u32 {
        match self {
            AssetSymbol::Hive | AssetSymbol::Hbd => 3,
            AssetSymbol::Vests => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetSymbol::Hive => "HIVE",
            AssetSymbol::Hbd => "HBD",
            AssetSymbol::Vests => "VESTS",
        }
    }
}

/// A fixed-precision ledger amount, stored in the symbol's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Asset {
    units: u64,
    symbol: AssetSymbol,
}

impl Asset {
    pub fn new(units: u64, symbol: AssetSymbol) -> Self {
        Self { units, symbol }
    }

    /// Zero amount of the given symbol.
    pub fn zero(symbol: AssetSymbol) -> Self {
        Self::new(0, symbol)
    }

    pub fn units(&self) -> u64 {
        self.units
    }

    pub fn symbol(&self) -> AssetSymbol {
        self.symbol
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10u64.pow(self.symbol.precision());
        write!(
            f,
            "{}.{:0width$} {}",
            self.units / scale,
            self.units % scale,
            self.symbol.as_str(),
            width = self.symbol.precision() as usize
        )
    }
}

impl FromStr for Asset {
    type Err = BuildError;

    /// Parse `"1.000 HIVE"`, `"0.5 HBD"` or `"12 VESTS"`.
    ///
    /// Fewer decimals than the symbol's precision are padded; more are
    /// rejected rather than rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| BuildError::InvalidAmount {
            amount: s.to_string(),
            reason,
        };

        let mut parts = s.split_whitespace();
        let (number, symbol) = match (parts.next(), parts.next(), parts.next()) {
            (Some(n), Some(sym), None) => (n, sym),
            _ => return Err(invalid("expected '<amount> <SYMBOL>'")),
        };

        let symbol = match symbol {
            "HIVE" => AssetSymbol::Hive,
            "HBD" => AssetSymbol::Hbd,
            "VESTS" => AssetSymbol::Vests,
            _ => return Err(invalid("unknown symbol")),
        };

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("amount must be a non-negative decimal"));
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("amount must be a non-negative decimal"));
        }

        let precision = symbol.precision() as usize;
        if frac.len() > precision {
            return Err(invalid("too many decimal places"));
        }

        let whole: u64 = whole.parse().map_err(|_| invalid("amount too large"))?;
        let frac_units: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<precision$}")
                .parse()
                .map_err(|_| invalid("amount must be a non-negative decimal"))?
        };

        let units = whole
            .checked_mul(10u64.pow(precision as u32))
            .and_then(|w| w.checked_add(frac_units))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Self { units, symbol })
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteOp {
    pub voter: String,
    pub author: String,
    pub permlink: String,
    pub weight: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentOp {
    pub parent_author: String,
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
}

/// Reward routing entry of a comment_options operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub account: String,
    pub weight: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeneficiariesExtension {
    pub beneficiaries: Vec<Beneficiary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentOptionsOp {
    pub author: String,
    pub permlink: String,
    pub max_accepted_payout: Asset,
    pub percent_hbd: u16,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    /// Static-variant extensions; tag 0 is the beneficiary list.
    pub extensions: Vec<(u8, BeneficiariesExtension)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOp {
    pub from: String,
    pub to: String,
    pub amount: Asset,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferToSavingsOp {
    pub from: String,
    pub to: String,
    pub amount: Asset,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFromSavingsOp {
    pub from: String,
    pub request_id: u32,
    pub to: String,
    pub amount: Asset,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelTransferFromSavingsOp {
    pub from: String,
    pub request_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferToVestingOp {
    pub from: String,
    pub to: String,
    pub amount: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawVestingOp {
    pub account: String,
    pub vesting_shares: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateVestingSharesOp {
    pub delegator: String,
    pub delegatee: String,
    pub vesting_shares: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimRewardBalanceOp {
    pub account: String,
    pub reward_hive: Asset,
    pub reward_hbd: Asset,
    pub reward_vests: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomJsonOp {
    pub required_auths: Vec<String>,
    pub required_posting_auths: Vec<String>,
    pub id: String,
    pub json: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountWitnessVoteOp {
    pub account: String,
    pub witness: String,
    pub approve: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateProposalVotesOp {
    pub voter: String,
    pub proposal_ids: Vec<u64>,
    pub approve: bool,
    pub extensions: Vec<serde_json::Value>,
}

/// One atomic ledger action: a `(kind, payload)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Vote(VoteOp),
    Comment(CommentOp),
    CommentOptions(CommentOptionsOp),
    Transfer(TransferOp),
    TransferToSavings(TransferToSavingsOp),
    TransferFromSavings(TransferFromSavingsOp),
    CancelTransferFromSavings(CancelTransferFromSavingsOp),
    TransferToVesting(TransferToVestingOp),
    WithdrawVesting(WithdrawVestingOp),
    DelegateVestingShares(DelegateVestingSharesOp),
    ClaimRewardBalance(ClaimRewardBalanceOp),
    CustomJson(CustomJsonOp),
    AccountWitnessVote(AccountWitnessVoteOp),
    UpdateProposalVotes(UpdateProposalVotesOp),
}

impl Operation {
    /// Ledger name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Vote(_) => "vote",
            Operation::Comment(_) => "comment",
            Operation::CommentOptions(_) => "comment_options",
            Operation::Transfer(_) => "transfer",
            Operation::TransferToSavings(_) => "transfer_to_savings",
            Operation::TransferFromSavings(_) => "transfer_from_savings",
            Operation::CancelTransferFromSavings(_) => "cancel_transfer_from_savings",
            Operation::TransferToVesting(_) => "transfer_to_vesting",
            Operation::WithdrawVesting(_) => "withdraw_vesting",
            Operation::DelegateVestingShares(_) => "delegate_vesting_shares",
            Operation::ClaimRewardBalance(_) => "claim_reward_balance",
            Operation::CustomJson(_) => "custom_json",
            Operation::AccountWitnessVote(_) => "account_witness_vote",
            Operation::UpdateProposalVotes(_) => "update_proposal_votes",
        }
    }

    /// Credential tier needed to sign this operation.
    pub fn required_authority(&self) -> AuthorityLevel {
        match self {
            Operation::Vote(_)
            | Operation::Comment(_)
            | Operation::CommentOptions(_)
            | Operation::ClaimRewardBalance(_) => AuthorityLevel::Posting,
            Operation::CustomJson(op) if op.required_auths.is_empty() => AuthorityLevel::Posting,
            _ => AuthorityLevel::Active,
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.kind())?;
        match self {
            Operation::Vote(op) => tuple.serialize_element(op)?,
            Operation::Comment(op) => tuple.serialize_element(op)?,
            Operation::CommentOptions(op) => tuple.serialize_element(op)?,
            Operation::Transfer(op) => tuple.serialize_element(op)?,
            Operation::TransferToSavings(op) => tuple.serialize_element(op)?,
            Operation::TransferFromSavings(op) => tuple.serialize_element(op)?,
            Operation::CancelTransferFromSavings(op) => tuple.serialize_element(op)?,
            Operation::TransferToVesting(op) => tuple.serialize_element(op)?,
            Operation::WithdrawVesting(op) => tuple.serialize_element(op)?,
            Operation::DelegateVestingShares(op) => tuple.serialize_element(op)?,
            Operation::ClaimRewardBalance(op) => tuple.serialize_element(op)?,
            Operation::CustomJson(op) => tuple.serialize_element(op)?,
            Operation::AccountWitnessVote(op) => tuple.serialize_element(op)?,
            Operation::UpdateProposalVotes(op) => tuple.serialize_element(op)?,
        }
        tuple.end()
    }
}

/// Operations that must be broadcast together in one transaction.
///
/// Built fresh per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSet {
    operations: Vec<Operation>,
    authority: AuthorityLevel,
}

impl OperationSet {
    /// Wrap a non-empty list of operations.
    ///
    /// The set's authority is the highest authority any member requires.
    pub fn new(operations: Vec<Operation>) -> BuildResult<Self> {
        let authority = operations
            .iter()
            .map(Operation::required_authority)
            .max()
            .ok_or(BuildError::Empty)?;
        Ok(Self {
            operations,
            authority,
        })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn authority(&self) -> AuthorityLevel {
        self.authority
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations as a JSON array of `[kind, payload]` pairs.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.operations).unwrap_or(serde_json::Value::Null)
    }

    /// Compact canonical string used for signing and display.
    pub fn canonical_string(&self) -> String {
        serde_json::to_string(&self.operations).unwrap_or_default()
    }
}
