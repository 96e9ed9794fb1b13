use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use sqlx::FromRow;

/// Three-way sentiment label persisted with every feedback row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Parses a stored label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative]
            .into_iter()
            .find(|sentiment| sentiment.as_str().eq_ignore_ascii_case(label))
    }
}

/// Coarse direction of a learner's recent feedback.
///
/// Serializes as the learner-facing message rather than the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodTrend {
    Improving,
    Challenging,
    Steady,
}

impl MoodTrend {
    pub fn message(&self) -> &'static str {
        match self {
            MoodTrend::Improving => "You're enjoying your lessons more lately!",
            MoodTrend::Challenging => "You seem to find some lessons challenging. Keep going!",
            MoodTrend::Steady => "Your learning mood is steady!",
        }
    }
}

impl Serialize for MoodTrend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct FeedbackRecord {
    pub user_id: i64,
    pub sentiment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct QuizResultRecord {
    pub user_id: i64,
    pub lesson_id: Option<i64>,
    pub percentage: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub average_score: f64,
    pub mood_trend: MoodTrend,
    pub recent_feedbacks: Vec<FeedbackRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Lesson {
    pub id: i64,
    pub subject_id: i64,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct QuizQuestion {
    pub id: i64,
    pub lesson_id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn with_password(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash: hash_password(password),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hex-encoded SHA-256 of the raw password.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub user_id: i64,
    pub text: String,
    pub sentiment: Sentiment,
    pub polarity: f64,
}

#[derive(Debug, Clone)]
pub struct NewQuizResult {
    pub user_id: i64,
    pub lesson_id: Option<i64>,
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Sentiment::from_label("Positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label(" NEGATIVE "), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("neutral"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::from_label("mixed"), None);
    }

    #[test]
    fn passwords_hash_deterministically() {
        let user = NewUser::with_password(" Ada ", "Ada@Example.com ", "secret");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.password_hash, hash_password("secret"));
        assert_eq!(user.password_hash.len(), 64);
        assert_ne!(user.password_hash, hash_password("Secret"));
    }

    #[test]
    fn mood_trend_serializes_as_message() {
        let json = serde_json::to_value(MoodTrend::Steady).unwrap();
        assert_eq!(json, serde_json::json!("Your learning mood is steady!"));
    }
}
