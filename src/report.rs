use std::fmt::Write;

use crate::models::{ProgressSummary, Sentiment};

pub fn build_report(user_id: i64, mood_window: usize, summary: &ProgressSummary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Learner Progress Report");
    let _ = writeln!(
        output,
        "Generated for user {} (mood over the last {} feedbacks)",
        user_id, mood_window
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Quiz Performance");
    let _ = writeln!(output, "Average score: {:.2}%", summary.average_score);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Mood Trend");
    let _ = writeln!(output, "{}", summary.mood_trend.message());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Feedback");

    if summary.recent_feedbacks.is_empty() {
        let _ = writeln!(output, "No feedback recorded yet.");
    } else {
        for feedback in summary.recent_feedbacks.iter() {
            let label = Sentiment::from_label(&feedback.sentiment)
                .map(|sentiment| sentiment.as_str())
                .unwrap_or(feedback.sentiment.as_str());
            let _ = writeln!(
                output,
                "- {} on {}",
                label,
                feedback.created_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
    }

    output
}
