//! Pure constructors for ledger operations.
//!
//! Every function validates its inputs and returns a `BuildError` for
//! out-of-range values instead of clamping. Nothing here touches the network
//! or credentials.

use crate::operations::types::{
    AccountWitnessVoteOp, Asset, AssetSymbol, BeneficiariesExtension, Beneficiary, BuildError,
    BuildResult, CancelTransferFromSavingsOp, ClaimRewardBalanceOp, CommentOp, CommentOptionsOp,
    CustomJsonOp, DelegateVestingSharesOp, Operation, TransferFromSavingsOp, TransferOp,
    TransferToSavingsOp, TransferToVestingOp, UpdateProposalVotesOp, VoteOp, WithdrawVestingOp,
};

/// Full vote weight in basis points.
pub const MAX_VOTE_WEIGHT: i32 = 10_000;

/// Largest memo the ledger accepts, in bytes.
pub const MAX_MEMO_BYTES: usize = 2048;

/// Largest custom_json id, in characters.
pub const MAX_CUSTOM_JSON_ID: usize = 32;

/// Largest permlink, in characters.
pub const MAX_PERMLINK: usize = 256;

/// Check an account name against ledger naming rules.
pub fn validate_account(name: &str) -> BuildResult<()> {
    let valid_len = (3..=16).contains(&name.len());
    let valid_chars = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-');
    let valid_edges = name
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_lowercase())
        && !name.ends_with('.')
        && !name.ends_with('-');

    if valid_len && valid_chars && valid_edges {
        Ok(())
    } else {
        Err(BuildError::InvalidAccount(name.to_string()))
    }
}

fn validate_permlink(permlink: &str) -> BuildResult<()> {
    if permlink.is_empty() {
        return Err(BuildError::InvalidPermlink("empty".into()));
    }
    if permlink.len() > MAX_PERMLINK {
        return Err(BuildError::InvalidPermlink(format!(
            "longer than {MAX_PERMLINK} characters"
        )));
    }
    if !permlink
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(BuildError::InvalidPermlink(permlink.to_string()));
    }
    Ok(())
}

fn validate_memo(memo: &str) -> BuildResult<()> {
    if memo.len() > MAX_MEMO_BYTES {
        return Err(BuildError::MemoTooLong {
            max: MAX_MEMO_BYTES,
        });
    }
    Ok(())
}

fn validate_percent(value: u32) -> BuildResult<u16> {
    if value > 10_000 {
        return Err(BuildError::PercentOutOfRange(value));
    }
    Ok(value as u16)
}

fn require_symbol(amount: &Asset, allowed: &[AssetSymbol]) -> BuildResult<()> {
    if allowed.contains(&amount.symbol()) {
        Ok(())
    } else {
        Err(BuildError::InvalidAmount {
            amount: amount.to_string(),
            reason: "symbol not allowed for this operation",
        })
    }
}

fn require_positive(amount: &Asset) -> BuildResult<()> {
    if amount.is_zero() {
        return Err(BuildError::InvalidAmount {
            amount: amount.to_string(),
            reason: "amount must be greater than zero",
        });
    }
    Ok(())
}

/// Build a vote. `weight` is in basis points, negative for a downvote.
pub fn vote(voter: &str, author: &str, permlink: &str, weight: i32) -> BuildResult<Operation> {
    if !(-MAX_VOTE_WEIGHT..=MAX_VOTE_WEIGHT).contains(&weight) {
        return Err(BuildError::WeightOutOfRange(weight));
    }
    validate_account(voter)?;
    validate_account(author)?;
    validate_permlink(permlink)?;

    Ok(Operation::Vote(VoteOp {
        voter: voter.to_string(),
        author: author.to_string(),
        permlink: permlink.to_string(),
        weight: weight as i16,
    }))
}

/// Parameters of a post or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentParams {
    /// Empty for a root post.
    pub parent_author: String,
    /// Category tag for a root post, parent permlink for a reply.
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: serde_json::Value,
}

/// Build a comment (post or reply).
pub fn comment(params: &CommentParams) -> BuildResult<Operation> {
    if !params.parent_author.is_empty() {
        validate_account(&params.parent_author)?;
    }
    validate_permlink(&params.parent_permlink)?;
    validate_account(&params.author)?;
    validate_permlink(&params.permlink)?;
    if params.body.is_empty() {
        return Err(BuildError::Invalid("comment body is empty".into()));
    }

    let json_metadata = if params.json_metadata.is_null() {
        String::new()
    } else {
        params.json_metadata.to_string()
    };

    Ok(Operation::Comment(CommentOp {
        parent_author: params.parent_author.clone(),
        parent_permlink: params.parent_permlink.clone(),
        author: params.author.clone(),
        permlink: params.permlink.clone(),
        title: params.title.clone(),
        body: params.body.clone(),
        json_metadata,
    }))
}

/// Reward settings attached to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentOptions {
    pub max_accepted_payout: Asset,
    pub percent_hbd: u32,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    pub beneficiaries: Vec<Beneficiary>,
}

impl Default for CommentOptions {
    fn default() -> Self {
        Self {
            max_accepted_payout: Asset::new(1_000_000_000, AssetSymbol::Hbd),
            percent_hbd: 10_000,
            allow_votes: true,
            allow_curation_rewards: true,
            beneficiaries: Vec::new(),
        }
    }
}

/// Build comment_options for an existing author/permlink.
///
/// Beneficiaries are sorted by account name, which the ledger requires.
pub fn comment_options(
    author: &str,
    permlink: &str,
    options: &CommentOptions,
) -> BuildResult<Operation> {
    validate_account(author)?;
    validate_permlink(permlink)?;
    require_symbol(&options.max_accepted_payout, &[AssetSymbol::Hbd])?;
    let percent_hbd = validate_percent(options.percent_hbd)?;

    let mut beneficiaries = options.beneficiaries.clone();
    beneficiaries.sort_by(|a, b| a.account.cmp(&b.account));

    let mut total: u32 = 0;
    for (i, b) in beneficiaries.iter().enumerate() {
        validate_account(&b.account)?;
        if i > 0 && beneficiaries[i - 1].account == b.account {
            return Err(BuildError::InvalidBeneficiaries(format!(
                "duplicate account {}",
                b.account
            )));
        }
        total += u32::from(b.weight);
    }
    if total > 10_000 {
        return Err(BuildError::InvalidBeneficiaries(format!(
            "weights sum to {total}, above 10000"
        )));
    }

    let extensions = if beneficiaries.is_empty() {
        Vec::new()
    } else {
        vec![(0, BeneficiariesExtension { beneficiaries })]
    };

    Ok(Operation::CommentOptions(CommentOptionsOp {
        author: author.to_string(),
        permlink: permlink.to_string(),
        max_accepted_payout: options.max_accepted_payout,
        percent_hbd,
        allow_votes: options.allow_votes,
        allow_curation_rewards: options.allow_curation_rewards,
        extensions,
    }))
}

/// Build a liquid transfer.
pub fn transfer(from: &str, to: &str, amount: &str, memo: &str) -> BuildResult<Operation> {
    validate_account(from)?;
    validate_account(to)?;
    let amount: Asset = amount.parse()?;
    require_symbol(&amount, &[AssetSymbol::Hive, AssetSymbol::Hbd])?;
    require_positive(&amount)?;
    validate_memo(memo)?;

    Ok(Operation::Transfer(TransferOp {
        from: from.to_string(),
        to: to.to_string(),
        amount,
        memo: memo.to_string(),
    }))
}

/// Build a deposit into savings.
pub fn transfer_to_savings(
    from: &str,
    to: &str,
    amount: &str,
    memo: &str,
) -> BuildResult<Operation> {
    validate_account(from)?;
    validate_account(to)?;
    let amount: Asset = amount.parse()?;
    require_symbol(&amount, &[AssetSymbol::Hive, AssetSymbol::Hbd])?;
    require_positive(&amount)?;
    validate_memo(memo)?;

    Ok(Operation::TransferToSavings(TransferToSavingsOp {
        from: from.to_string(),
        to: to.to_string(),
        amount,
        memo: memo.to_string(),
    }))
}

/// Build a withdrawal from savings. `request_id` must be unique per account.
pub fn transfer_from_savings(
    from: &str,
    to: &str,
    amount: &str,
    memo: &str,
    request_id: u32,
) -> BuildResult<Operation> {
    validate_account(from)?;
    validate_account(to)?;
    let amount: Asset = amount.parse()?;
    require_symbol(&amount, &[AssetSymbol::Hive, AssetSymbol::Hbd])?;
    require_positive(&amount)?;
    validate_memo(memo)?;

    Ok(Operation::TransferFromSavings(TransferFromSavingsOp {
        from: from.to_string(),
        request_id,
        to: to.to_string(),
        amount,
        memo: memo.to_string(),
    }))
}

/// Build the cancellation of a pending savings withdrawal.
pub fn cancel_transfer_from_savings(from: &str, request_id: u32) -> BuildResult<Operation> {
    validate_account(from)?;
    Ok(Operation::CancelTransferFromSavings(
        CancelTransferFromSavingsOp {
            from: from.to_string(),
            request_id,
        },
    ))
}

/// Build a power-up (HIVE to vesting shares).
pub fn transfer_to_vesting(from: &str, to: &str, amount: &str) -> BuildResult<Operation> {
    validate_account(from)?;
    validate_account(to)?;
    let amount: Asset = amount.parse()?;
    require_symbol(&amount, &[AssetSymbol::Hive])?;
    require_positive(&amount)?;

    Ok(Operation::TransferToVesting(TransferToVestingOp {
        from: from.to_string(),
        to: to.to_string(),
        amount,
    }))
}

/// Build a power-down. A zero amount stops an active power-down.
pub fn withdraw_vesting(account: &str, vesting_shares: &str) -> BuildResult<Operation> {
    validate_account(account)?;
    let vesting_shares: Asset = vesting_shares.parse()?;
    require_symbol(&vesting_shares, &[AssetSymbol::Vests])?;

    Ok(Operation::WithdrawVesting(WithdrawVestingOp {
        account: account.to_string(),
        vesting_shares,
    }))
}

/// Build a delegation. A zero amount removes the delegation.
pub fn delegate_vesting_shares(
    delegator: &str,
    delegatee: &str,
    vesting_shares: &str,
) -> BuildResult<Operation> {
    validate_account(delegator)?;
    validate_account(delegatee)?;
    if delegator == delegatee {
        return Err(BuildError::Invalid("cannot delegate to self".into()));
    }
    let vesting_shares: Asset = vesting_shares.parse()?;
    require_symbol(&vesting_shares, &[AssetSymbol::Vests])?;

    Ok(Operation::DelegateVestingShares(DelegateVestingSharesOp {
        delegator: delegator.to_string(),
        delegatee: delegatee.to_string(),
        vesting_shares,
    }))
}

/// Build a reward claim. At least one balance must be non-zero.
pub fn claim_reward_balance(
    account: &str,
    reward_hive: &str,
    reward_hbd: &str,
    reward_vests: &str,
) -> BuildResult<Operation> {
    validate_account(account)?;
    let reward_hive: Asset = reward_hive.parse()?;
    let reward_hbd: Asset = reward_hbd.parse()?;
    let reward_vests: Asset = reward_vests.parse()?;
    require_symbol(&reward_hive, &[AssetSymbol::Hive])?;
    require_symbol(&reward_hbd, &[AssetSymbol::Hbd])?;
    require_symbol(&reward_vests, &[AssetSymbol::Vests])?;
    if reward_hive.is_zero() && reward_hbd.is_zero() && reward_vests.is_zero() {
        return Err(BuildError::Invalid("nothing to claim".into()));
    }

    Ok(Operation::ClaimRewardBalance(ClaimRewardBalanceOp {
        account: account.to_string(),
        reward_hive,
        reward_hbd,
        reward_vests,
    }))
}

/// Which authority a custom_json declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomJsonAuth {
    Posting,
    Active,
}

/// Build a custom_json operation signed by a single account.
///
/// `json` is re-serialized compactly so equal values yield equal payloads.
pub fn custom_json(
    account: &str,
    id: &str,
    json: &serde_json::Value,
    auth: CustomJsonAuth,
) -> BuildResult<Operation> {
    validate_account(account)?;
    if id.is_empty() {
        return Err(BuildError::Invalid("custom_json id is empty".into()));
    }
    if id.chars().count() > MAX_CUSTOM_JSON_ID {
        return Err(BuildError::CustomJsonIdTooLong(id.to_string()));
    }

    let (required_auths, required_posting_auths) = match auth {
        CustomJsonAuth::Posting => (Vec::new(), vec![account.to_string()]),
        CustomJsonAuth::Active => (vec![account.to_string()], Vec::new()),
    };

    Ok(Operation::CustomJson(CustomJsonOp {
        required_auths,
        required_posting_auths,
        id: id.to_string(),
        json: json.to_string(),
    }))
}

/// Build a custom_json operation from a raw JSON string.
pub fn custom_json_str(
    account: &str,
    id: &str,
    json: &str,
    auth: CustomJsonAuth,
) -> BuildResult<Operation> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| BuildError::InvalidJson(e.to_string()))?;
    custom_json(account, id, &value, auth)
}

/// Build a witness approval or removal.
pub fn account_witness_vote(account: &str, witness: &str, approve: bool) -> BuildResult<Operation> {
    validate_account(account)?;
    validate_account(witness)?;

    Ok(Operation::AccountWitnessVote(AccountWitnessVoteOp {
        account: account.to_string(),
        witness: witness.to_string(),
        approve,
    }))
}

/// Build a proposal vote. Ids are sorted and deduplicated.
pub fn update_proposal_votes(
    voter: &str,
    proposal_ids: &[u64],
    approve: bool,
) -> BuildResult<Operation> {
    validate_account(voter)?;
    if proposal_ids.is_empty() {
        return Err(BuildError::Invalid("no proposal ids".into()));
    }

    let mut ids = proposal_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    Ok(Operation::UpdateProposalVotes(UpdateProposalVotesOp {
        voter: voter.to_string(),
        proposal_ids: ids,
        approve,
        extensions: Vec::new(),
    }))
}

/// A fresh savings request id. Callers must not reuse one across invocations.
pub fn fresh_request_id() -> u32 {
    // 0 is reserved for "no request".
    fastrand::u32(1..)
}
