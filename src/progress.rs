use tracing::{debug, warn};

use crate::error::ProgressComputationError;
use crate::models::{FeedbackRecord, MoodTrend, ProgressSummary, QuizResultRecord, Sentiment};
use crate::store::{FeedbackStore, QuizResultStore};

pub const DEFAULT_MOOD_WINDOW: usize = 5;

/// Builds a learner's progress summary from quiz results and recent feedback.
#[derive(Debug, Clone, Copy)]
pub struct ProgressAggregator {
    mood_window: usize,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MOOD_WINDOW)
    }
}

impl ProgressAggregator {
    pub fn new(mood_window: usize) -> Self {
        Self {
            mood_window: mood_window.max(1),
        }
    }

    pub fn mood_window(&self) -> usize {
        self.mood_window
    }

    /// Both fetches must succeed; a failure in either discards the other.
    pub async fn summarize<S>(
        &self,
        store: &S,
        user_id: i64,
    ) -> Result<ProgressSummary, ProgressComputationError>
    where
        S: QuizResultStore + FeedbackStore + ?Sized,
    {
        let results = async {
            store.fetch_results(user_id).await.map_err(|err| {
                warn!(user_id, error = ?err, "quiz result fetch failed");
                err
            })
        };
        let feedback = async {
            store
                .fetch_recent(user_id, self.mood_window)
                .await
                .map_err(|err| {
                    warn!(user_id, error = ?err, "feedback fetch failed");
                    err
                })
        };
        let (results, mut feedback) = tokio::try_join!(results, feedback)?;

        // Stores are expected to honour the ordering and limit already.
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        feedback.truncate(self.mood_window);

        let summary = ProgressSummary {
            average_score: average_score(&results),
            mood_trend: mood_trend(&feedback),
            recent_feedbacks: feedback,
        };
        debug!(
            user_id,
            average_score = summary.average_score,
            feedback_count = summary.recent_feedbacks.len(),
            "computed progress summary"
        );
        Ok(summary)
    }
}

/// Mean percentage rounded to two decimals, `0.0` when there are no results.
pub fn average_score(results: &[QuizResultRecord]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results.iter().map(|result| result.percentage).sum();
    round2(total / results.len() as f64)
}

pub fn mood_trend(feedback: &[FeedbackRecord]) -> MoodTrend {
    let (positive, negative) = feedback.iter().fold((0usize, 0usize), |(pos, neg), record| {
        match Sentiment::from_label(&record.sentiment) {
            Some(Sentiment::Positive) => (pos + 1, neg),
            Some(Sentiment::Negative) => (pos, neg + 1),
            _ => (pos, neg),
        }
    });

    if positive > negative {
        MoodTrend::Improving
    } else if negative > positive {
        MoodTrend::Challenging
    } else {
        MoodTrend::Steady
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
