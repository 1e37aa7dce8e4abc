//! Post-success hooks: activity recording and cache invalidation.
//!
//! Both hooks are best-effort. A failure or timeout is logged at `warn` and
//! counted, never surfaced to the caller.

use std::time::Duration;
use uuid::Uuid;

use crate::blockchain::Confirmation;
use crate::capability::SideEffects;
use crate::observability::metrics;
use crate::operations::CacheKey;
use crate::resilience::with_deadline;

/// Which hooks actually ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideEffectReport {
    pub activity_recorded: bool,
    pub caches_invalidated: bool,
}

/// Run the hooks for one confirmed broadcast. Called once per invocation.
///
/// Activity needs a block reference, so pending confirmations only
/// invalidate caches.
pub async fn fire<H: SideEffects + ?Sized>(
    hooks: &H,
    confirmation: &Confirmation,
    activity_code: Option<u32>,
    cache_keys: &[CacheKey],
    hook_timeout: Duration,
    correlation_id: Uuid,
) -> SideEffectReport {
    let mut report = SideEffectReport::default();

    match (activity_code, confirmation.block_reference) {
        (Some(code), Some(block)) if !confirmation.is_pending() => {
            let outcome = with_deadline(
                hook_timeout,
                hooks.record_activity(code, block, &confirmation.transaction_id),
            )
            .await;
            match outcome {
                Ok(Ok(())) => report.activity_recorded = true,
                Ok(Err(e)) => {
                    tracing::warn!(%correlation_id, error = %e, "Activity recording failed");
                    metrics::record_side_effect_failure("record_activity");
                }
                Err(e) => {
                    tracing::warn!(%correlation_id, error = %e, "Activity recording timed out");
                    metrics::record_side_effect_failure("record_activity");
                }
            }
        }
        (Some(code), _) => {
            tracing::debug!(%correlation_id, code, "Skipping activity for unconfirmed block");
        }
        (None, _) => {}
    }

    if !cache_keys.is_empty() {
        match with_deadline(hook_timeout, hooks.invalidate_caches(cache_keys)).await {
            Ok(Ok(())) => report.caches_invalidated = true,
            Ok(Err(e)) => {
                tracing::warn!(%correlation_id, error = %e, "Cache invalidation failed");
                metrics::record_side_effect_failure("invalidate_caches");
            }
            Err(e) => {
                tracing::warn!(%correlation_id, error = %e, "Cache invalidation timed out");
                metrics::record_side_effect_failure("invalidate_caches");
            }
        }
    }

    report
}
