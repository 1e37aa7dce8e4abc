mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use broadcast_fallback::blockchain::Confirmation;
use broadcast_fallback::capability::LocalKey;
use broadcast_fallback::config::BroadcastConfig;
use broadcast_fallback::dispatch::BroadcastStrategy;
use broadcast_fallback::orchestrator::{AttemptOutcome, LegacyCredentials};
use broadcast_fallback::{
    AuthMethod, BroadcastError, BroadcastRequest, CancelHandle, ErrorKind, Failure, Orchestrator,
    SharedConfig, StrategyTable,
};
use common::*;

type CallLog = Arc<Mutex<Vec<AuthMethod>>>;

fn orchestrator(strategies: Vec<ScriptedStrategy>) -> Orchestrator {
    orchestrator_with_config(strategies, BroadcastConfig::default())
}

fn orchestrator_with_config(
    strategies: Vec<ScriptedStrategy>,
    config: BroadcastConfig,
) -> Orchestrator {
    let mut table = StrategyTable::new();
    for strategy in strategies {
        table.register(Arc::new(strategy) as Arc<dyn BroadcastStrategy>);
    }
    Orchestrator::new(table, SharedConfig::new(config))
}

fn calls_of(log: &CallLog) -> Vec<AuthMethod> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_visits_methods_in_configured_order() {
    let log = CallLog::default();
    let chain = vec![
        AuthMethod::PushHardware,
        AuthMethod::LocalKey,
        AuthMethod::DelegatedToken,
        AuthMethod::BrowserExtension,
    ];
    let strategies = chain
        .iter()
        .map(|&m| ScriptedStrategy::new(m, vec![Err(auth_missing())], log.clone()))
        .collect();
    let caps = Arc::new(FakeCapabilities::with(&chain));

    let err = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps.clone())
                .with_chain(chain.clone()),
        )
        .await
        .unwrap_err();

    assert_eq!(calls_of(&log), chain);
    let visited: Vec<_> = err.attempts().iter().map(|a| a.method).collect();
    assert_eq!(visited, chain);
    assert!(matches!(err, BroadcastError::Exhausted { .. }));
    assert_eq!(err.kind(), ErrorKind::AuthMissing);
    assert_eq!(caps.activity_calls(), 0);
    assert_eq!(caps.invalidation_calls(), 0);
}

#[tokio::test]
async fn test_stops_after_first_success() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(AuthMethod::LocalKey, vec![Err(auth_missing())], log.clone()),
        ScriptedStrategy::new(
            AuthMethod::BrowserExtension,
            vec![Ok(Confirmation::confirmed("ext-tx", 77))],
            log.clone(),
        ),
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Ok(Confirmation::confirmed("never", 1))],
            log.clone(),
        ),
    ];
    let chain = vec![
        AuthMethod::LocalKey,
        AuthMethod::BrowserExtension,
        AuthMethod::DelegatedToken,
    ];
    let caps = Arc::new(FakeCapabilities::with(&chain));

    let confirmation = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(chain),
        )
        .await
        .unwrap();

    assert_eq!(confirmation.transaction_id, "ext-tx");
    assert_eq!(
        calls_of(&log),
        vec![AuthMethod::LocalKey, AuthMethod::BrowserExtension]
    );
}

#[tokio::test]
async fn test_non_retryable_failure_aborts() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(
            AuthMethod::LocalKey,
            vec![Err(Failure::Text(
                concat!(
                    "Account: alice has 0 RC, needs 5 RC. ",
                    "Please wait to transact, or power up HIVE."
                )
                .into(),
            ))],
            log.clone(),
        ),
        ScriptedStrategy::new(
            AuthMethod::BrowserExtension,
            vec![Ok(Confirmation::confirmed("ext-tx", 1))],
            log.clone(),
        ),
    ];
    let chain = vec![AuthMethod::LocalKey, AuthMethod::BrowserExtension];
    let caps = Arc::new(FakeCapabilities::with(&chain));

    let err = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", transfer_action())
                .with_capabilities(caps.clone())
                .with_chain(chain),
        )
        .await
        .unwrap_err();

    assert_eq!(calls_of(&log), vec![AuthMethod::LocalKey]);
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    assert!(matches!(
        err,
        BroadcastError::Aborted {
            method: AuthMethod::LocalKey,
            ..
        }
    ));
    assert_eq!(
        err.hint(),
        Some("Resource credits are low. Wait for them to recharge or power up.")
    );
    assert_eq!(caps.invalidation_calls(), 0);
}

#[tokio::test]
async fn test_absent_credential_is_skipped_without_classification() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(
            AuthMethod::LocalKey,
            vec![Ok(Confirmation::confirmed("local", 1))],
            log.clone(),
        ),
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Ok(Confirmation::confirmed("delegated-tx", 42))],
            log.clone(),
        ),
    ];
    let caps = Arc::new(FakeCapabilities::with(&[AuthMethod::DelegatedToken]));

    let request = BroadcastRequest::new("alice", vote_action())
        .with_capabilities(caps.clone())
        .with_chain(vec![AuthMethod::LocalKey, AuthMethod::DelegatedToken]);
    let confirmation = orchestrator(strategies).broadcast(request).await.unwrap();

    assert_eq!(confirmation.transaction_id, "delegated-tx");
    assert_eq!(calls_of(&log), vec![AuthMethod::DelegatedToken]);
}

#[tokio::test]
async fn test_absent_credentials_only_yield_no_method_error() {
    let log = CallLog::default();
    let strategies = vec![ScriptedStrategy::new(AuthMethod::LocalKey, vec![], log.clone())];
    let caps = Arc::new(FakeCapabilities::default());

    let err = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(vec![AuthMethod::LocalKey, AuthMethod::DelegatedToken]),
        )
        .await
        .unwrap_err();

    assert!(calls_of(&log).is_empty());
    assert!(matches!(err, BroadcastError::Exhausted { last: None, .. }));
    assert_eq!(err.kind(), ErrorKind::AuthMissing);
    assert_eq!(err.message(), "No authentication method available for this account");
    let outcomes: Vec<_> = err.attempts().iter().map(|a| a.outcome.clone()).collect();
    // Local key has a strategy but no credential; delegated has neither.
    assert_eq!(
        outcomes,
        vec![AttemptOutcome::CredentialAbsent, AttemptOutcome::Unsupported]
    );
}

#[tokio::test]
async fn test_capability_error_advances_chain() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(AuthMethod::LocalKey, vec![], log.clone()),
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Ok(Confirmation::confirmed("delegated-tx", 3))],
            log.clone(),
        ),
    ];
    let caps = Arc::new(
        FakeCapabilities::with(&[AuthMethod::LocalKey, AuthMethod::DelegatedToken])
            .failing(AuthMethod::LocalKey),
    );

    let confirmation = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(vec![AuthMethod::LocalKey, AuthMethod::DelegatedToken]),
        )
        .await
        .unwrap();

    assert_eq!(confirmation.transaction_id, "delegated-tx");
    assert_eq!(calls_of(&log), vec![AuthMethod::DelegatedToken]);
}

#[tokio::test]
async fn test_no_capabilities_means_legacy_even_with_chain() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Ok(Confirmation::confirmed("delegated", 1))],
            log.clone(),
        ),
        ScriptedStrategy::new(AuthMethod::LocalKey, vec![Err(auth_missing())], log.clone()),
    ];
    let request = BroadcastRequest::new("alice", vote_action())
        .with_chain(vec![AuthMethod::DelegatedToken, AuthMethod::LocalKey])
        .with_fallback(true)
        .with_legacy(LegacyCredentials {
            local_key: Some(LocalKey::new(TEST_PRIVATE_KEY)),
            delegated_token: Some(broadcast_fallback::capability::DelegatedToken::new("t")),
            ..Default::default()
        });
    assert!(!request.fallback_enabled(&BroadcastConfig::default().fallback));

    let err = orchestrator(strategies).broadcast(request).await.unwrap_err();

    // Legacy mode picks the local key first and its failure is final, even though
    // auth-missing would be retryable in fallback mode.
    assert_eq!(calls_of(&log), vec![AuthMethod::LocalKey]);
    assert!(matches!(
        err,
        BroadcastError::Aborted {
            method: AuthMethod::LocalKey,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::AuthMissing);
}

#[tokio::test]
async fn test_legacy_without_credentials() {
    let err = orchestrator(vec![])
        .broadcast(BroadcastRequest::new("alice", vote_action()))
        .await
        .unwrap_err();
    assert_eq!(err, BroadcastError::NoCredentials);
    assert_eq!(err.kind(), ErrorKind::AuthMissing);
}

#[tokio::test]
async fn test_disabled_fallback_tries_only_head() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(AuthMethod::LocalKey, vec![Err(auth_missing())], log.clone()),
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Ok(Confirmation::confirmed("delegated", 1))],
            log.clone(),
        ),
    ];
    let caps = Arc::new(FakeCapabilities::with(&[
        AuthMethod::LocalKey,
        AuthMethod::DelegatedToken,
    ]));

    let err = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(vec![AuthMethod::LocalKey, AuthMethod::DelegatedToken])
                .with_fallback(false),
        )
        .await
        .unwrap_err();

    assert_eq!(calls_of(&log), vec![AuthMethod::LocalKey]);
    assert!(matches!(err, BroadcastError::Exhausted { .. }));
    assert_eq!(err.attempts().len(), 1);
}

#[tokio::test]
async fn test_configured_chain_used_when_request_has_none() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(AuthMethod::LocalKey, vec![], log.clone()),
        ScriptedStrategy::new(
            AuthMethod::PushHardware,
            vec![Ok(Confirmation::confirmed("push", 9))],
            log.clone(),
        ),
    ];
    let mut config = BroadcastConfig::default();
    config.fallback.chain = vec![AuthMethod::PushHardware, AuthMethod::LocalKey];
    let caps = Arc::new(FakeCapabilities::with(&[
        AuthMethod::LocalKey,
        AuthMethod::PushHardware,
    ]));

    let confirmation = orchestrator_with_config(strategies, config)
        .broadcast(BroadcastRequest::new("alice", vote_action()).with_capabilities(caps))
        .await
        .unwrap();

    assert_eq!(confirmation.transaction_id, "push");
    assert_eq!(calls_of(&log), vec![AuthMethod::PushHardware]);
}

#[tokio::test]
async fn test_side_effects_fire_exactly_once() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(AuthMethod::LocalKey, vec![Err(auth_missing())], log.clone()),
        ScriptedStrategy::new(
            AuthMethod::BrowserExtension,
            vec![Ok(Confirmation::confirmed("ext-tx", 1234))],
            log.clone(),
        ),
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Ok(Confirmation::confirmed("never", 1))],
            log.clone(),
        ),
    ];
    let chain = vec![
        AuthMethod::LocalKey,
        AuthMethod::BrowserExtension,
        AuthMethod::DelegatedToken,
    ];
    let caps = Arc::new(FakeCapabilities::with(&chain));

    orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps.clone())
                .with_chain(chain),
        )
        .await
        .unwrap();

    assert_eq!(caps.activity_calls(), 1);
    assert_eq!(caps.invalidation_calls(), 1);
    assert_eq!(
        caps.activity.lock().unwrap()[0],
        (120, 1234, "ext-tx".to_string())
    );
    let keys: Vec<String> = caps
        .invalidated_keys
        .lock()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(keys, vec!["post/bob/hello-world", "account/alice"]);
}

#[tokio::test]
async fn test_surfaced_message_truncated_to_80() {
    let log = CallLog::default();
    let long = format!("Assert Exception: {}", "x".repeat(300));
    let strategies = vec![ScriptedStrategy::new(
        AuthMethod::LocalKey,
        vec![Err(Failure::Text(long.clone()))],
        log.clone(),
    )];
    let caps = Arc::new(FakeCapabilities::with(&[AuthMethod::LocalKey]));

    let err = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(vec![AuthMethod::LocalKey]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.message().chars().count(), 80);
    assert_eq!(err.message(), &long[..80]);
    assert_eq!(err.report().message, err.message());
}

#[tokio::test]
async fn test_last_classified_error_is_surfaced() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(AuthMethod::LocalKey, vec![Err(auth_missing())], log.clone()),
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Err(Failure::Text("missing required active authority for bob".into()))],
            log.clone(),
        ),
    ];
    let chain = vec![AuthMethod::LocalKey, AuthMethod::DelegatedToken];
    let caps = Arc::new(FakeCapabilities::with(&chain));

    let err = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(chain),
        )
        .await
        .unwrap_err();

    assert_eq!(err.message(), "missing required active authority for bob");
    assert_eq!(
        err.to_string(),
        "all methods failed (local-key: auth-missing; delegated-token: auth-missing)"
    );
}

#[tokio::test]
async fn test_retry_predicate_widens_retryable_set() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(
            AuthMethod::LocalKey,
            vec![Err(Failure::connect("connection refused"))],
            log.clone(),
        ),
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Ok(Confirmation::confirmed("delegated", 5))],
            log.clone(),
        ),
    ];
    let chain = vec![AuthMethod::LocalKey, AuthMethod::DelegatedToken];
    let caps = Arc::new(FakeCapabilities::with(&chain));

    let confirmation = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(chain)
                .with_retry_predicate(|e| e.kind() == ErrorKind::Network),
        )
        .await
        .unwrap();

    assert_eq!(confirmation.transaction_id, "delegated");
    assert_eq!(
        calls_of(&log),
        vec![AuthMethod::LocalKey, AuthMethod::DelegatedToken]
    );
}

#[tokio::test]
async fn test_cancelled_failure_never_retries() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(AuthMethod::PushHardware, vec![Err(Failure::Cancelled)], log.clone()),
        ScriptedStrategy::new(
            AuthMethod::LocalKey,
            vec![Ok(Confirmation::confirmed("local", 1))],
            log.clone(),
        ),
    ];
    let chain = vec![AuthMethod::PushHardware, AuthMethod::LocalKey];
    let caps = Arc::new(FakeCapabilities::with(&chain));

    let err = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(chain)
                .with_retry_predicate(|_| true),
        )
        .await
        .unwrap_err();

    assert_eq!(calls_of(&log), vec![AuthMethod::PushHardware]);
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(matches!(
        err,
        BroadcastError::Cancelled {
            method: Some(AuthMethod::PushHardware),
            ..
        }
    ));
}

#[tokio::test]
async fn test_cancel_before_start_makes_no_attempt() {
    let log = CallLog::default();
    let strategies = vec![ScriptedStrategy::new(
        AuthMethod::LocalKey,
        vec![Ok(Confirmation::confirmed("local", 1))],
        log.clone(),
    )];
    let caps = Arc::new(FakeCapabilities::with(&[AuthMethod::LocalKey]));
    let (handle, token) = CancelHandle::new();
    handle.cancel();

    let err = orchestrator(strategies)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(vec![AuthMethod::LocalKey])
                .with_cancel(token),
        )
        .await
        .unwrap_err();

    assert!(calls_of(&log).is_empty());
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_attempt_deadline_is_timeout() {
    let log = CallLog::default();
    let strategies = vec![
        ScriptedStrategy::new(
            AuthMethod::LocalKey,
            vec![Ok(Confirmation::confirmed("late", 1))],
            log.clone(),
        )
        .with_delay(Duration::from_secs(30)),
        ScriptedStrategy::new(
            AuthMethod::DelegatedToken,
            vec![Ok(Confirmation::confirmed("delegated", 1))],
            log.clone(),
        ),
    ];
    let mut config = BroadcastConfig::default();
    config.timeouts.local_key_secs = 1;
    let chain = vec![AuthMethod::LocalKey, AuthMethod::DelegatedToken];
    let caps = Arc::new(FakeCapabilities::with(&chain));

    let err = orchestrator_with_config(strategies, config)
        .broadcast(
            BroadcastRequest::new("alice", vote_action())
                .with_capabilities(caps)
                .with_chain(chain),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(calls_of(&log), vec![AuthMethod::LocalKey]);
}

#[tokio::test]
async fn test_invalid_action_is_rejected_before_any_attempt() {
    let log = CallLog::default();
    let strategies = vec![ScriptedStrategy::new(AuthMethod::LocalKey, vec![], log.clone())];
    let caps = Arc::new(FakeCapabilities::with(&[AuthMethod::LocalKey]));
    let action = broadcast_fallback::Action::Vote {
        voter: "alice".into(),
        author: "bob".into(),
        permlink: "p".into(),
        weight: 10_001,
    };

    let err = orchestrator(strategies)
        .broadcast(BroadcastRequest::new("alice", action).with_capabilities(caps))
        .await
        .unwrap_err();

    assert!(matches!(err, BroadcastError::Build(_)));
    assert_eq!(err.kind(), ErrorKind::ChainValidation);
    assert!(calls_of(&log).is_empty());
}
