//! Server-authoritative assessment session engine.
//!
//! Owns the assessment and item state machines, deadline computation,
//! and score aggregation. Every multi-row transition runs under the
//! store's per-assessment lock so the one-active-item invariant holds
//! under concurrent handlers, not just in the single-threaded happy path.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditRecorder};
use crate::clock::Clock;
use crate::config::PlatformConfig;
use crate::error::{ConflictReason, Error, Result};
use crate::store::Store;

use super::scoring::ScorerRegistry;
use super::{Assessment, AssessmentItem, AssessmentStatus, ItemStatus, JsonMap};

pub struct SessionEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    scorers: ScorerRegistry,
    audit: AuditRecorder,
    assessment_budget_seconds: i64,
}

impl SessionEngine {
    #[must_use]
    pub fn new(
        config: &PlatformConfig,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        scorers: ScorerRegistry,
    ) -> Self {
        Self {
            audit: AuditRecorder::new(Arc::clone(&store), Arc::clone(&clock)),
            assessment_budget_seconds: config.assessment_budget_seconds(),
            store,
            clock,
            scorers,
        }
    }

    /// Create a NOT_STARTED assessment for `candidate_id` with one PENDING
    /// item per required game of the job role, in required-game order.
    /// Each item freezes the game's configuration at provisioning time so
    /// later catalog edits never alter an in-flight assessment.
    ///
    /// # Errors
    ///
    /// `NotFound` when the job role or any required game is missing.
    #[instrument(skip(self))]
    pub async fn provision(&self, candidate_id: Uuid, job_role_id: Uuid) -> Result<Assessment> {
        let job_role = self
            .store
            .job_role_by_id(job_role_id)
            .await?
            .ok_or(Error::not_found("job_role", job_role_id))?;

        let weight_sum = job_role.required_weight_sum();
        if weight_sum > 1.0 + f64::EPSILON {
            // Not rejected: weight normalization is a display-side concern
            // until product says otherwise.
            warn!(job_role = %job_role.id, weight_sum, "required trait weights sum above 1.0");
        }

        let now = self.clock.now();
        let assessment = Assessment {
            id: Uuid::new_v4(),
            tenant_id: job_role.tenant_id,
            candidate_id,
            job_role_id,
            status: AssessmentStatus::NotStarted,
            started_at: None,
            completed_at: None,
            expires_at: None,
            total_score: None,
            integrity_flags: JsonMap::new(),
            created_at: now,
            version: 0,
        };

        let mut items = Vec::with_capacity(job_role.required_games.len());
        for (index, game_id) in job_role.required_games.iter().enumerate() {
            let game = self
                .store
                .game_by_id(*game_id)
                .await?
                .ok_or(Error::not_found("game", *game_id))?;
            items.push(AssessmentItem {
                id: Uuid::new_v4(),
                assessment_id: assessment.id,
                game_id: game.id,
                candidate_id,
                order_index: index as u32,
                timer_seconds: game.timer_seconds,
                server_started_at: None,
                server_deadline_at: None,
                status: ItemStatus::Pending,
                score: None,
                metrics: JsonMap::new(),
                config_snapshot: game.base_config.clone(),
                created_at: now,
                version: 0,
            });
        }

        self.store.insert_assessment(assessment.clone()).await?;
        for item in items {
            self.store.insert_item(item).await?;
        }

        let mut payload = JsonMap::new();
        payload.insert("job_role_id".to_string(), job_role_id.to_string().into());
        payload.insert(
            "item_count".to_string(),
            job_role.required_games.len().into(),
        );
        self.audit
            .record(
                candidate_id,
                AuditAction::AssessmentProvisioned,
                "ASSESSMENT",
                assessment.id,
                payload,
            )
            .await;

        Ok(assessment)
    }

    /// NOT_STARTED -> IN_PROGRESS. Sets `started_at` and computes
    /// `expires_at` from the configured overall time budget.
    #[instrument(skip(self))]
    pub async fn start_assessment(&self, assessment_id: Uuid) -> Result<Assessment> {
        let _guard = self.store.lock_assessment(assessment_id).await?;
        let mut assessment = self.load_assessment(assessment_id).await?;

        if assessment.status != AssessmentStatus::NotStarted {
            return Err(Error::InvalidTransition {
                entity: "assessment",
                from: assessment.status.as_str(),
                attempted: AssessmentStatus::InProgress.as_str(),
            });
        }

        let now = self.clock.now();
        assessment.status = AssessmentStatus::InProgress;
        assessment.started_at = Some(now);
        assessment.expires_at = Some(now + Duration::seconds(self.assessment_budget_seconds));
        self.store.update_assessment(&assessment).await?;

        self.audit
            .record(
                assessment.candidate_id,
                AuditAction::AssessmentStarted,
                "ASSESSMENT",
                assessment.id,
                JsonMap::new(),
            )
            .await;

        self.load_assessment(assessment_id).await
    }

    /// PENDING -> IN_PROGRESS for one item. Items must be attempted in
    /// assigned order, one at a time: the item has to hold the smallest
    /// `order_index` among non-COMPLETED siblings, and no sibling may be
    /// IN_PROGRESS. Stamps the server-side start and deadline.
    ///
    /// # Errors
    ///
    /// `OutOfOrder` on an out-of-order attempt, `InvalidTransition` when
    /// the item or its assessment is not startable, and
    /// `Conflict { concurrent_modification }` when a sibling is active.
    #[instrument(skip(self))]
    pub async fn start_item(&self, item_id: Uuid) -> Result<AssessmentItem> {
        let item = self.load_item(item_id).await?;
        let _guard = self.store.lock_assessment(item.assessment_id).await?;
        // Re-read under the lock; the first read only located the parent.
        let mut item = self.load_item(item_id).await?;

        let assessment = self.load_assessment(item.assessment_id).await?;
        if assessment.status != AssessmentStatus::InProgress {
            return Err(Error::InvalidTransition {
                entity: "assessment",
                from: assessment.status.as_str(),
                attempted: "start_item",
            });
        }
        if item.status != ItemStatus::Pending {
            return Err(Error::InvalidTransition {
                entity: "assessment_item",
                from: item.status.as_str(),
                attempted: ItemStatus::InProgress.as_str(),
            });
        }

        let siblings = self.store.items_for_assessment(item.assessment_id).await?;
        if siblings
            .iter()
            .any(|s| s.id != item.id && s.status == ItemStatus::InProgress)
        {
            return Err(Error::Conflict {
                reason: ConflictReason::ConcurrentModification,
            });
        }
        let next_index = siblings
            .iter()
            .filter(|s| s.status != ItemStatus::Completed)
            .map(|s| s.order_index)
            .min();
        if next_index != Some(item.order_index) {
            return Err(Error::OutOfOrder);
        }

        let now = self.clock.now();
        item.status = ItemStatus::InProgress;
        item.server_started_at = Some(now);
        // Immutable once set: the deadline is never recomputed.
        item.server_deadline_at = Some(now + Duration::seconds(item.timer_seconds));
        self.store.update_item(&item).await?;

        self.audit
            .record(
                item.candidate_id,
                AuditAction::ItemStarted,
                "ASSESSMENT_ITEM",
                item.id,
                JsonMap::new(),
            )
            .await;

        self.load_item(item_id).await
    }

    /// IN_PROGRESS -> COMPLETED with a computed score.
    ///
    /// A submission past the deadline is still accepted (a client may be
    /// fractionally late over the network), but flags `late_submission`
    /// on the parent assessment, and timestamped response entries past
    /// the deadline are dropped before scoring.
    #[instrument(skip(self, raw_metrics))]
    pub async fn submit_item(&self, item_id: Uuid, raw_metrics: JsonMap) -> Result<AssessmentItem> {
        let item = self.load_item(item_id).await?;
        let _guard = self.store.lock_assessment(item.assessment_id).await?;
        let mut item = self.load_item(item_id).await?;

        if item.status != ItemStatus::InProgress {
            return Err(Error::InvalidTransition {
                entity: "assessment_item",
                from: item.status.as_str(),
                attempted: ItemStatus::Completed.as_str(),
            });
        }

        let now = self.clock.now();
        let deadline = item.server_deadline_at.ok_or_else(|| {
            Error::Unavailable(anyhow::anyhow!("IN_PROGRESS item has no deadline"))
        })?;
        let late = now > deadline;

        let metrics = if late {
            truncate_responses_to_deadline(raw_metrics, deadline)
        } else {
            raw_metrics
        };

        let game = self
            .store
            .game_by_id(item.game_id)
            .await?
            .ok_or(Error::not_found("game", item.game_id))?;
        let outcome = self
            .scorers
            .scorer_for(&game.code)
            .score(&metrics, &item.config_snapshot);

        item.status = ItemStatus::Completed;
        item.score = Some(outcome.score);
        item.metrics = outcome.metrics;
        self.store.update_item(&item).await?;

        if late {
            let mut assessment = self.load_assessment(item.assessment_id).await?;
            assessment
                .integrity_flags
                .insert("late_submission".to_string(), true.into());
            self.store.update_assessment(&assessment).await?;
            info!(item = %item.id, "late submission accepted and flagged");
        }

        let mut payload = JsonMap::new();
        payload.insert("score".to_string(), outcome.score.into());
        payload.insert("late".to_string(), late.into());
        self.audit
            .record(
                item.candidate_id,
                AuditAction::ItemSubmitted,
                "ASSESSMENT_ITEM",
                item.id,
                payload,
            )
            .await;

        self.load_item(item_id).await
    }

    /// Complete the assessment once every item is COMPLETED; otherwise a
    /// no-op success (safe to invoke speculatively on every read).
    ///
    /// `total_score` is the weighted aggregate of item scores using the
    /// job role's trait weights mapped onto each item's game. Items whose
    /// game has no matching trait weight contribute 0 to the weighted
    /// term; they are noted in `integrity_flags` together with the plain
    /// unweighted average, not silently dropped.
    #[instrument(skip(self))]
    pub async fn complete_assessment_if_done(&self, assessment_id: Uuid) -> Result<Assessment> {
        let _guard = self.store.lock_assessment(assessment_id).await?;
        let mut assessment = self.load_assessment(assessment_id).await?;

        if assessment.status != AssessmentStatus::InProgress {
            return Ok(assessment);
        }
        let items = self.store.items_for_assessment(assessment_id).await?;
        if items.is_empty() || items.iter().any(|i| i.status != ItemStatus::Completed) {
            return Ok(assessment);
        }

        let job_role = self
            .store
            .job_role_by_id(assessment.job_role_id)
            .await?
            .ok_or(Error::not_found("job_role", assessment.job_role_id))?;

        let mut weighted_total = 0.0;
        let mut unweighted_sum = 0.0;
        let mut unweighted_games: Vec<String> = Vec::new();
        for item in &items {
            let score = item.score.unwrap_or(0.0);
            unweighted_sum += score;
            let game = self
                .store
                .game_by_id(item.game_id)
                .await?
                .ok_or(Error::not_found("game", item.game_id))?;
            match job_role.traits.get(&game.trait_key) {
                Some(weight) => weighted_total += weight.weight * score,
                None => unweighted_games.push(game.code),
            }
        }
        let unweighted_average = unweighted_sum / items.len() as f64;

        let now = self.clock.now();
        assessment.status = AssessmentStatus::Completed;
        assessment.completed_at = Some(now);
        assessment.total_score = Some(weighted_total);
        assessment
            .integrity_flags
            .insert("unweighted_average".to_string(), unweighted_average.into());
        if !unweighted_games.is_empty() {
            assessment
                .integrity_flags
                .insert("unweighted_games".to_string(), unweighted_games.into());
        }
        self.store.update_assessment(&assessment).await?;

        let mut payload = JsonMap::new();
        payload.insert("total_score".to_string(), weighted_total.into());
        self.audit
            .record(
                assessment.candidate_id,
                AuditAction::AssessmentCompleted,
                "ASSESSMENT",
                assessment.id,
                payload,
            )
            .await;

        self.load_assessment(assessment_id).await
    }

    /// Force IN_PROGRESS -> EXPIRED once the overall deadline has passed;
    /// otherwise a no-op success. Any item still IN_PROGRESS is
    /// force-completed with its last-known metrics and a
    /// `terminated_by_expiry` marker rather than silently discarded.
    #[instrument(skip(self))]
    pub async fn expire_overdue(&self, assessment_id: Uuid) -> Result<Assessment> {
        let _guard = self.store.lock_assessment(assessment_id).await?;
        let mut assessment = self.load_assessment(assessment_id).await?;

        if assessment.status != AssessmentStatus::InProgress {
            return Ok(assessment);
        }
        let now = self.clock.now();
        let overdue = assessment.expires_at.is_some_and(|expires| now > expires);
        if !overdue {
            return Ok(assessment);
        }

        let items = self.store.items_for_assessment(assessment_id).await?;
        let mut terminated: Vec<serde_json::Value> = Vec::new();
        for mut item in items {
            if item.status != ItemStatus::InProgress {
                continue;
            }
            let game = self
                .store
                .game_by_id(item.game_id)
                .await?
                .ok_or(Error::not_found("game", item.game_id))?;
            item.metrics
                .insert("terminated_by_expiry".to_string(), true.into());
            let outcome = self
                .scorers
                .scorer_for(&game.code)
                .score(&item.metrics, &item.config_snapshot);
            item.status = ItemStatus::Completed;
            item.score = Some(outcome.score);
            item.metrics = outcome.metrics;
            terminated.push(item.id.to_string().into());
            self.store.update_item(&item).await?;
        }

        assessment.status = AssessmentStatus::Expired;
        if !terminated.is_empty() {
            assessment
                .integrity_flags
                .insert("terminated_by_expiry".to_string(), terminated.into());
        }
        self.store.update_assessment(&assessment).await?;

        self.audit
            .record(
                assessment.candidate_id,
                AuditAction::AssessmentExpired,
                "ASSESSMENT",
                assessment.id,
                JsonMap::new(),
            )
            .await;

        self.load_assessment(assessment_id).await
    }

    async fn load_assessment(&self, id: Uuid) -> Result<Assessment> {
        self.store
            .assessment(id)
            .await?
            .ok_or(Error::not_found("assessment", id))
    }

    async fn load_item(&self, id: Uuid) -> Result<AssessmentItem> {
        self.store
            .item(id)
            .await?
            .ok_or(Error::not_found("assessment_item", id))
    }
}

/// Drop timestamped `responses` entries recorded after the deadline.
/// Entries without a parseable RFC 3339 `timestamp` are kept as-is: the
/// deadline is advisory for scoring fairness, not a hard reject.
fn truncate_responses_to_deadline(mut metrics: JsonMap, deadline: DateTime<Utc>) -> JsonMap {
    let Some(serde_json::Value::Array(responses)) = metrics.get_mut("responses") else {
        return metrics;
    };
    responses.retain(|entry| {
        let Some(timestamp) = entry.get("timestamp").and_then(serde_json::Value::as_str) else {
            return true;
        };
        match DateTime::parse_from_rfc3339(timestamp) {
            Ok(at) => at.with_timezone(&Utc) <= deadline,
            Err(_) => true,
        }
    });
    metrics
}
