//! `broadcast-fallback` command line.
//!
//! Broadcasts a single action through the configured signing chain using
//! credentials from the environment, and offers a few diagnostics.
//!
//! # Environment
//! - `BROADCAST_POSTING_KEY` / `BROADCAST_ACTIVE_KEY`: local signing keys, WIF or hex
//! - `BROADCAST_DELEGATED_TOKEN`: bearer token for the remote signer
//! - `BROADCAST_PUSH_TOKEN`: paired push-auth session token

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use url::Url;

use broadcast_fallback::blockchain::wallet::{ACTIVE_KEY_ENV_VAR, POSTING_KEY_ENV_VAR};
use broadcast_fallback::capability::{
    CapabilityError, DelegatedToken, LocalKey, PushPrompt, PushSession, UserInteraction,
};
use broadcast_fallback::config::{load_config, validate_config};
use broadcast_fallback::lifecycle::cancel_on_ctrl_c;
use broadcast_fallback::observability::{logging, metrics};
use broadcast_fallback::operations::builder::CustomJsonAuth;
use broadcast_fallback::operations::CacheKey;
use broadcast_fallback::{
    Action, AuthMethod, AuthorityLevel, BroadcastConfig, BroadcastRequest, CancelHandle,
    Capabilities, ErrorClassifier, Orchestrator, SharedConfig, SideEffects, StrategyTable,
};

const DELEGATED_TOKEN_ENV_VAR: &str = "BROADCAST_DELEGATED_TOKEN";
const PUSH_TOKEN_ENV_VAR: &str = "BROADCAST_PUSH_TOKEN";

#[derive(Parser)]
#[command(name = "broadcast-fallback")]
#[command(
    about = "Sign and broadcast ledger actions with automatic signer fallback",
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated signing chain overriding the configured one.
    #[arg(long, value_delimiter = ',')]
    chain: Option<Vec<AuthMethod>>,

    /// Try only the first method of the chain.
    #[arg(long)]
    no_fallback: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vote on a post or comment
    Vote {
        #[arg(long)]
        voter: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        permlink: String,
        /// Basis points, -10000..=10000
        #[arg(long, default_value_t = 10_000, allow_hyphen_values = true)]
        weight: i32,
    },
    /// Transfer HIVE or HBD
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// e.g. "1.000 HIVE"
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        memo: String,
    },
    /// Broadcast a custom_json operation
    CustomJson {
        #[arg(long)]
        account: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        json: String,
        /// Sign with active authority instead of posting
        #[arg(long)]
        active: bool,
    },
    /// Print the classification of an error string or JSON payload
    Classify { error: String },
    /// Validate a configuration file
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            logging::init_logging(None);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    logging::init_logging(Some(&config.observability.log_level));

    let action = match cli.command {
        Commands::Classify { error } => return classify(&error),
        Commands::CheckConfig { path } => return check_config(&path),
        Commands::Vote {
            voter,
            author,
            permlink,
            weight,
        } => Action::Vote {
            voter,
            author,
            permlink,
            weight,
        },
        Commands::Transfer {
            from,
            to,
            amount,
            memo,
        } => Action::Transfer {
            from,
            to,
            amount,
            memo,
        },
        Commands::CustomJson {
            account,
            id,
            json,
            active,
        } => {
            let json = match serde_json::from_str(&json) {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("Error: --json is not valid JSON: {e}");
                    return ExitCode::FAILURE;
                }
            };
            Action::CustomJson {
                account,
                id,
                json,
                auth: if active {
                    CustomJsonAuth::Active
                } else {
                    CustomJsonAuth::Posting
                },
            }
        }
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let strategies = StrategyTable::with_defaults(reqwest::Client::new());
    let orchestrator = Orchestrator::new(strategies, SharedConfig::new(config));

    let user = actor(&action).to_string();
    let (cancel, token) = CancelHandle::new();
    let signal_task = cancel_on_ctrl_c(cancel);

    let mut request = BroadcastRequest::new(user.clone(), action)
        .with_capabilities(Arc::new(EnvCapabilities::from_env(&user)))
        .with_cancel(token);
    if let Some(chain) = cli.chain {
        request = request.with_chain(chain);
    }
    if cli.no_fallback {
        request = request.with_fallback(false);
    }

    let result = orchestrator.broadcast(request).await;
    signal_task.abort();

    match result {
        Ok(confirmation) => print_json(&confirmation),
        Err(e) => {
            for attempt in e.attempts() {
                tracing::debug!(%attempt, "Attempt");
            }
            let report =
                serde_json::to_string_pretty(&e.report()).unwrap_or_else(|_| e.to_string());
            eprintln!("{report}");
            ExitCode::FAILURE
        }
    }
}

/// The account whose credentials sign `action`.
fn actor(action: &Action) -> &str {
    match action {
        Action::Vote { voter, .. } | Action::ProposalVote { voter, .. } => voter,
        Action::Comment { params, .. } => &params.author,
        Action::Transfer { from, .. }
        | Action::PowerUp { from, .. }
        | Action::SavingsDeposit { from, .. }
        | Action::SavingsWithdraw { from, .. } => from,
        Action::Delegate { delegator, .. } => delegator,
        Action::CustomJson { account, .. }
        | Action::ClaimRewards { account, .. }
        | Action::WitnessVote { account, .. }
        | Action::PowerDown { account, .. }
        | Action::ClaimSavingsInterest { account, .. } => account,
        Action::Raw { .. } => "",
    }
}

fn classify(error: &str) -> ExitCode {
    let classifier = ErrorClassifier::new();
    let classified = match serde_json::from_str::<serde_json::Value>(error) {
        Ok(value) => classifier.classify_value(&value),
        Err(_) => classifier.classify_text(error),
    };
    print_json(&classified)
}

fn check_config(path: &Path) -> ExitCode {
    // Parse without the loader so every validation error is listed.
    let config: BroadcastConfig = match std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| toml::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };
    match validate_config(&config) {
        Ok(()) => {
            println!("{}: ok", path.display());
            ExitCode::SUCCESS
        }
        Err(errors) => {
            for error in errors {
                eprintln!("{}: {error}", path.display());
            }
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Credentials read once from the environment.
struct EnvCapabilities {
    posting_key: Option<LocalKey>,
    active_key: Option<LocalKey>,
    delegated_token: Option<DelegatedToken>,
    push_session: Option<PushSession>,
}

impl EnvCapabilities {
    fn from_env(user: &str) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            posting_key: var(POSTING_KEY_ENV_VAR).map(LocalKey::new),
            active_key: var(ACTIVE_KEY_ENV_VAR).map(LocalKey::new),
            delegated_token: var(DELEGATED_TOKEN_ENV_VAR).map(DelegatedToken::new),
            push_session: var(PUSH_TOKEN_ENV_VAR).map(|token| PushSession::new(user, token)),
        }
    }
}

#[async_trait]
impl SideEffects for EnvCapabilities {
    async fn record_activity(
        &self,
        code: u32,
        block_reference: u64,
        transaction_id: &str,
    ) -> Result<(), CapabilityError> {
        tracing::info!(code, block_reference, transaction_id, "Activity");
        Ok(())
    }

    async fn invalidate_caches(&self, keys: &[CacheKey]) -> Result<(), CapabilityError> {
        for key in keys {
            tracing::debug!(%key, "Stale cache entry");
        }
        Ok(())
    }
}

#[async_trait]
impl Capabilities for EnvCapabilities {
    async fn local_key(
        &self,
        _user: &str,
        authority: AuthorityLevel,
    ) -> Result<Option<LocalKey>, CapabilityError> {
        Ok(match authority {
            AuthorityLevel::Posting => self.posting_key.clone().or_else(|| self.active_key.clone()),
            AuthorityLevel::Active => self.active_key.clone(),
        })
    }

    async fn delegated_token(
        &self,
        _user: &str,
    ) -> Result<Option<DelegatedToken>, CapabilityError> {
        Ok(self.delegated_token.clone())
    }

    async fn push_session(&self, _user: &str) -> Result<Option<PushSession>, CapabilityError> {
        Ok(self.push_session.clone())
    }

    fn interaction(&self) -> Option<Arc<dyn UserInteraction>> {
        Some(Arc::new(TerminalInteraction))
    }
}

/// Prints redirects and push prompts for the user to act on.
struct TerminalInteraction;

#[async_trait]
impl UserInteraction for TerminalInteraction {
    async fn open_redirect(&self, url: &Url) -> Result<(), CapabilityError> {
        eprintln!("Open this page to approve the transaction:\n  {url}");
        Ok(())
    }

    async fn show_push_prompt(&self, prompt: &PushPrompt) -> Result<(), CapabilityError> {
        eprintln!(
            "Approve request {} for @{} on your device (Ctrl-C to cancel)",
            prompt.request_id, prompt.account
        );
        Ok(())
    }
}
