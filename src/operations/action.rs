//! Domain actions and their expansion into operation sets.

use serde::{Deserialize, Serialize};

use crate::operations::builder::{self, CommentOptions, CommentParams, CustomJsonAuth};
use crate::operations::types::{BuildResult, Operation, OperationSet};

/// Activity code recorded for a root post.
pub const ACTIVITY_POST: u32 = 100;
/// Activity code recorded for a reply.
pub const ACTIVITY_COMMENT: u32 = 110;
/// Activity code recorded for a vote.
pub const ACTIVITY_VOTE: u32 = 120;

/// Amount withdrawn and immediately cancelled to trigger savings interest.
const INTEREST_TRIGGER_AMOUNT: &str = "0.001 HBD";

/// Path-like key of a host cache entry to invalidate after a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(pub Vec<String>);

impl CacheKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A logical user action to be signed and broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Vote {
        voter: String,
        author: String,
        permlink: String,
        weight: i32,
    },
    Comment {
        params: CommentParams,
        options: Option<CommentOptions>,
    },
    Transfer {
        from: String,
        to: String,
        amount: String,
        memo: String,
    },
    CustomJson {
        account: String,
        id: String,
        json: serde_json::Value,
        auth: CustomJsonAuth,
    },
    ProposalVote {
        voter: String,
        proposal_ids: Vec<u64>,
        approve: bool,
    },
    ClaimRewards {
        account: String,
        reward_hive: String,
        reward_hbd: String,
        reward_vests: String,
    },
    Delegate {
        delegator: String,
        delegatee: String,
        vesting_shares: String,
    },
    WitnessVote {
        account: String,
        witness: String,
        approve: bool,
    },
    PowerUp {
        from: String,
        to: String,
        amount: String,
    },
    PowerDown {
        account: String,
        vesting_shares: String,
    },
    SavingsDeposit {
        from: String,
        to: String,
        amount: String,
        memo: String,
    },
    SavingsWithdraw {
        from: String,
        to: String,
        amount: String,
        memo: String,
        request_id: u32,
    },
    /// Withdraw-then-cancel pair that realizes pending savings interest.
    ClaimSavingsInterest { account: String, request_id: u32 },
    /// Operations the caller already built.
    Raw {
        operations: Vec<Operation>,
        cache_keys: Vec<CacheKey>,
    },
}

impl Action {
    /// Savings interest claim with a request id unique to this invocation.
    pub fn claim_savings_interest(account: impl Into<String>) -> Self {
        Action::ClaimSavingsInterest {
            account: account.into(),
            request_id: builder::fresh_request_id(),
        }
    }

    /// Short name used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Vote { .. } => "vote",
            Action::Comment { .. } => "comment",
            Action::Transfer { .. } => "transfer",
            Action::CustomJson { .. } => "custom_json",
            Action::ProposalVote { .. } => "proposal_vote",
            Action::ClaimRewards { .. } => "claim_rewards",
            Action::Delegate { .. } => "delegate",
            Action::WitnessVote { .. } => "witness_vote",
            Action::PowerUp { .. } => "power_up",
            Action::PowerDown { .. } => "power_down",
            Action::SavingsDeposit { .. } => "savings_deposit",
            Action::SavingsWithdraw { .. } => "savings_withdraw",
            Action::ClaimSavingsInterest { .. } => "claim_savings_interest",
            Action::Raw { .. } => "raw",
        }
    }

    /// Expand the action into the operations broadcast together.
    pub fn build(&self) -> BuildResult<OperationSet> {
        let operations = match self {
            Action::Vote {
                voter,
                author,
                permlink,
                weight,
            } => vec![builder::vote(voter, author, permlink, *weight)?],
            Action::Comment { params, options } => {
                let mut ops = vec![builder::comment(params)?];
                if let Some(options) = options {
                    ops.push(builder::comment_options(
                        &params.author,
                        &params.permlink,
                        options,
                    )?);
                }
                ops
            }
            Action::Transfer {
                from,
                to,
                amount,
                memo,
            } => vec![builder::transfer(from, to, amount, memo)?],
            Action::CustomJson {
                account,
                id,
                json,
                auth,
            } => vec![builder::custom_json(account, id, json, *auth)?],
            Action::ProposalVote {
                voter,
                proposal_ids,
                approve,
            } => vec![builder::update_proposal_votes(voter, proposal_ids, *approve)?],
            Action::ClaimRewards {
                account,
                reward_hive,
                reward_hbd,
                reward_vests,
            } => vec![builder::claim_reward_balance(
                account,
                reward_hive,
                reward_hbd,
                reward_vests,
            )?],
            Action::Delegate {
                delegator,
                delegatee,
                vesting_shares,
            } => vec![builder::delegate_vesting_shares(
                delegator,
                delegatee,
                vesting_shares,
            )?],
            Action::WitnessVote {
                account,
                witness,
                approve,
            } => vec![builder::account_witness_vote(account, witness, *approve)?],
            Action::PowerUp { from, to, amount } => {
                vec![builder::transfer_to_vesting(from, to, amount)?]
            }
            Action::PowerDown {
                account,
                vesting_shares,
            } => vec![builder::withdraw_vesting(account, vesting_shares)?],
            Action::SavingsDeposit {
                from,
                to,
                amount,
                memo,
            } => vec![builder::transfer_to_savings(from, to, amount, memo)?],
            Action::SavingsWithdraw {
                from,
                to,
                amount,
                memo,
                request_id,
            } => vec![builder::transfer_from_savings(
                from,
                to,
                amount,
                memo,
                *request_id,
            )?],
            Action::ClaimSavingsInterest {
                account,
                request_id,
            } => vec![
                builder::transfer_from_savings(
                    account,
                    account,
                    INTEREST_TRIGGER_AMOUNT,
                    "",
                    *request_id,
                )?,
                builder::cancel_transfer_from_savings(account, *request_id)?,
            ],
            Action::Raw { operations, .. } => operations.clone(),
        };

        OperationSet::new(operations)
    }

    /// Activity code to record on success, if the action is tracked.
    pub fn activity_code(&self) -> Option<u32> {
        match self {
            Action::Vote { .. } => Some(ACTIVITY_VOTE),
            Action::Comment { params, .. } if params.parent_author.is_empty() => {
                Some(ACTIVITY_POST)
            }
            Action::Comment { .. } => Some(ACTIVITY_COMMENT),
            _ => None,
        }
    }

    /// Host cache entries made stale by this action.
    pub fn cache_keys(&self) -> Vec<CacheKey> {
        match self {
            Action::Vote {
                voter,
                author,
                permlink,
                ..
            } => vec![
                CacheKey::new(["post", author.as_str(), permlink.as_str()]),
                CacheKey::new(["account", voter.as_str()]),
            ],
            Action::Comment { params, .. } => {
                let mut keys = vec![CacheKey::new(["account", params.author.as_str()])];
                if !params.parent_author.is_empty() {
                    keys.push(CacheKey::new([
                        "discussion",
                        params.parent_author.as_str(),
                        params.parent_permlink.as_str(),
                    ]));
                }
                keys
            }
            Action::Transfer { from, to, .. }
            | Action::SavingsDeposit { from, to, .. }
            | Action::SavingsWithdraw { from, to, .. }
            | Action::PowerUp { from, to, .. } => vec![
                CacheKey::new(["wallet", from.as_str()]),
                CacheKey::new(["wallet", to.as_str()]),
            ],
            Action::Delegate {
                delegator,
                delegatee,
                ..
            } => vec![
                CacheKey::new(["wallet", delegator.as_str()]),
                CacheKey::new(["delegations", delegator.as_str()]),
                CacheKey::new(["wallet", delegatee.as_str()]),
            ],
            Action::ClaimRewards { account, .. }
            | Action::PowerDown { account, .. }
            | Action::ClaimSavingsInterest { account, .. } => {
                vec![CacheKey::new(["wallet", account.as_str()])]
            }
            Action::WitnessVote { account, .. } => {
                vec![CacheKey::new(["witness-votes", account.as_str()])]
            }
            Action::ProposalVote { voter, .. } => {
                vec![CacheKey::new(["proposal-votes", voter.as_str()])]
            }
            Action::CustomJson { account, id, .. } => {
                vec![CacheKey::new(["custom-json", id.as_str(), account.as_str()])]
            }
            Action::Raw { cache_keys, .. } => cache_keys.clone(),
        }
    }
}
