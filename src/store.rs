use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{
    FeedbackRecord, Lesson, NewFeedback, NewQuizResult, NewUser, QuizQuestion, QuizResultRecord,
    Subject, UserProfile,
};

#[async_trait]
pub trait QuizResultStore: Send + Sync {
    async fn fetch_results(&self, user_id: i64) -> Result<Vec<QuizResultRecord>, StorageError>;

    async fn record_result(&self, result: &NewQuizResult)
        -> Result<QuizResultRecord, StorageError>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Newest first, at most `limit` rows.
    async fn fetch_recent(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, StorageError>;

    async fn record_feedback(&self, feedback: &NewFeedback)
        -> Result<FeedbackRecord, StorageError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError>;

    async fn list_lessons(&self, subject_id: i64) -> Result<Vec<Lesson>, StorageError>;

    async fn list_quiz(&self, lesson_id: i64) -> Result<Vec<QuizQuestion>, StorageError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Returns `None` when the email is already taken.
    async fn create_user(&self, user: &NewUser) -> Result<Option<UserProfile>, StorageError>;

    async fn find_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserProfile>, StorageError>;
}

/// Everything the HTTP surface needs from persistence.
pub trait TutorStore: QuizResultStore + FeedbackStore + CatalogStore + AccountStore {}

impl<T> TutorStore for T where T: QuizResultStore + FeedbackStore + CatalogStore + AccountStore {}
