//! Pluggable per-game scoring.
//!
//! Scorers are synchronous and cheap by construction; `submit_item` runs
//! them inline. The registry dispatches on the game code with an
//! accuracy-based fallback for games without a dedicated scorer.

use std::collections::HashMap;
use std::sync::Arc;

use super::JsonMap;

#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Numeric score on a 0..=100 scale.
    pub score: f64,
    /// Metrics as stored on the item, possibly enriched by the scorer.
    pub metrics: JsonMap,
}

pub trait GameScorer: Send + Sync {
    fn score(&self, metrics: &JsonMap, config_snapshot: &JsonMap) -> ScoreOutcome;
}

/// Fallback scorer: `correct / total` as a percentage, enriched with an
/// `accuracy` key. Metrics that carry a pre-computed `score` instead are
/// clamped to the 0..=100 scale and taken as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccuracyScorer;

impl GameScorer for AccuracyScorer {
    fn score(&self, metrics: &JsonMap, _config_snapshot: &JsonMap) -> ScoreOutcome {
        let mut enriched = metrics.clone();

        let correct = number(metrics, "correct");
        let total = number(metrics, "total");
        if let (Some(correct), Some(total)) = (correct, total) {
            let accuracy = if total > 0.0 { correct / total } else { 0.0 };
            enriched.insert("accuracy".to_string(), accuracy.into());
            return ScoreOutcome {
                score: (accuracy * 100.0).clamp(0.0, 100.0),
                metrics: enriched,
            };
        }

        let score = number(metrics, "score").unwrap_or(0.0).clamp(0.0, 100.0);
        ScoreOutcome {
            score,
            metrics: enriched,
        }
    }
}

pub struct ScorerRegistry {
    scorers: HashMap<String, Arc<dyn GameScorer>>,
    fallback: Arc<dyn GameScorer>,
}

impl ScorerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scorers: HashMap::new(),
            fallback: Arc::new(AccuracyScorer),
        }
    }

    #[must_use]
    pub fn with_scorer(mut self, game_code: impl Into<String>, scorer: Arc<dyn GameScorer>) -> Self {
        self.scorers.insert(game_code.into(), scorer);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, scorer: Arc<dyn GameScorer>) -> Self {
        self.fallback = scorer;
        self
    }

    #[must_use]
    pub fn scorer_for(&self, game_code: &str) -> &dyn GameScorer {
        self.scorers
            .get(game_code)
            .map_or(self.fallback.as_ref(), |scorer| scorer.as_ref())
    }
}

impl Default for ScorerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn number(metrics: &JsonMap, key: &str) -> Option<f64> {
    metrics.get(key).and_then(serde_json::Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::{AccuracyScorer, GameScorer, ScoreOutcome, ScorerRegistry};
    use crate::assessment::JsonMap;
    use serde_json::json;
    use std::sync::Arc;

    fn metrics(pairs: &[(&str, serde_json::Value)]) -> JsonMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn accuracy_scorer_computes_percentage() {
        let outcome = AccuracyScorer.score(
            &metrics(&[("correct", json!(18)), ("total", json!(20))]),
            &JsonMap::new(),
        );
        assert!((outcome.score - 90.0).abs() < f64::EPSILON);
        assert_eq!(outcome.metrics["accuracy"], json!(0.9));
    }

    #[test]
    fn accuracy_scorer_handles_zero_total_and_raw_score() {
        let outcome = AccuracyScorer.score(
            &metrics(&[("correct", json!(0)), ("total", json!(0))]),
            &JsonMap::new(),
        );
        assert_eq!(outcome.score, 0.0);

        let outcome = AccuracyScorer.score(&metrics(&[("score", json!(250))]), &JsonMap::new());
        assert_eq!(outcome.score, 100.0);

        let outcome = AccuracyScorer.score(&JsonMap::new(), &JsonMap::new());
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn registry_dispatches_by_game_code() {
        struct Fixed(f64);
        impl GameScorer for Fixed {
            fn score(&self, metrics: &JsonMap, _config: &JsonMap) -> ScoreOutcome {
                ScoreOutcome {
                    score: self.0,
                    metrics: metrics.clone(),
                }
            }
        }

        let registry = ScorerRegistry::new().with_scorer("STROOP", Arc::new(Fixed(42.0)));
        let outcome = registry.scorer_for("STROOP").score(&JsonMap::new(), &JsonMap::new());
        assert_eq!(outcome.score, 42.0);

        // Unknown games fall back to the accuracy scorer.
        let outcome = registry.scorer_for("NBACK").score(&JsonMap::new(), &JsonMap::new());
        assert_eq!(outcome.score, 0.0);
    }
}
