// In-memory store used by unit tests in place of Postgres.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::models::{
    FeedbackRecord, Lesson, NewFeedback, NewQuizResult, NewUser, QuizQuestion, QuizResultRecord,
    Subject, UserProfile,
};
use crate::store::{AccountStore, CatalogStore, FeedbackStore, QuizResultStore};

type Fault = Box<dyn Fn() -> sqlx::Error + Send>;

#[derive(Default)]
struct State {
    results: Vec<QuizResultRecord>,
    feedback: Vec<FeedbackRecord>,
    subjects: Vec<Subject>,
    lessons: Vec<Lesson>,
    questions: Vec<QuizQuestion>,
    users: Vec<(UserProfile, String)>,
    results_fault: Option<Fault>,
    feedback_fault: Option<Fault>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn push_result(&self, user_id: i64, percentage: f64) {
        self.with_state(|state| {
            state.results.push(QuizResultRecord {
                user_id,
                lesson_id: None,
                percentage,
                recorded_at: Utc::now(),
            })
        });
    }

    pub fn push_feedback(&self, record: FeedbackRecord) {
        self.with_state(|state| state.feedback.push(record));
    }

    pub fn push_subject(&self, subject: Subject) {
        self.with_state(|state| state.subjects.push(subject));
    }

    pub fn push_lesson(&self, lesson: Lesson) {
        self.with_state(|state| state.lessons.push(lesson));
    }

    pub fn push_question(&self, question: QuizQuestion) {
        self.with_state(|state| state.questions.push(question));
    }

    pub fn fail_results(&self, fault: impl Fn() -> sqlx::Error + Send + 'static) {
        self.with_state(|state| state.results_fault = Some(Box::new(fault)));
    }

    pub fn fail_feedback(&self, fault: impl Fn() -> sqlx::Error + Send + 'static) {
        self.with_state(|state| state.feedback_fault = Some(Box::new(fault)));
    }

    pub fn feedback_count(&self) -> usize {
        self.with_state(|state| state.feedback.len())
    }
}

#[async_trait]
impl QuizResultStore for MemoryStore {
    async fn fetch_results(&self, user_id: i64) -> Result<Vec<QuizResultRecord>, StorageError> {
        self.with_state(|state| {
            if let Some(fault) = &state.results_fault {
                return Err(StorageError::Query(fault()));
            }
            Ok(state
                .results
                .iter()
                .filter(|result| result.user_id == user_id)
                .cloned()
                .collect())
        })
    }

    async fn record_result(
        &self,
        result: &NewQuizResult,
    ) -> Result<QuizResultRecord, StorageError> {
        let record = QuizResultRecord {
            user_id: result.user_id,
            lesson_id: result.lesson_id,
            percentage: result.percentage,
            recorded_at: Utc::now(),
        };
        self.with_state(|state| state.results.push(record.clone()));
        Ok(record)
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn fetch_recent(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, StorageError> {
        self.with_state(|state| {
            if let Some(fault) = &state.feedback_fault {
                return Err(StorageError::Query(fault()));
            }
            let mut records: Vec<FeedbackRecord> = state
                .feedback
                .iter()
                .filter(|record| record.user_id == user_id)
                .cloned()
                .collect();
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            records.truncate(limit);
            Ok(records)
        })
    }

    async fn record_feedback(
        &self,
        feedback: &NewFeedback,
    ) -> Result<FeedbackRecord, StorageError> {
        let record = FeedbackRecord {
            user_id: feedback.user_id,
            sentiment: feedback.sentiment.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.with_state(|state| state.feedback.push(record.clone()));
        Ok(record)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        Ok(self.with_state(|state| state.subjects.clone()))
    }

    async fn list_lessons(&self, subject_id: i64) -> Result<Vec<Lesson>, StorageError> {
        Ok(self.with_state(|state| {
            state
                .lessons
                .iter()
                .filter(|lesson| lesson.subject_id == subject_id)
                .cloned()
                .collect()
        }))
    }

    async fn list_quiz(&self, lesson_id: i64) -> Result<Vec<QuizQuestion>, StorageError> {
        Ok(self.with_state(|state| {
            state
                .questions
                .iter()
                .filter(|question| question.lesson_id == lesson_id)
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> Result<Option<UserProfile>, StorageError> {
        Ok(self.with_state(|state| {
            if state.users.iter().any(|(existing, _)| existing.email == user.email) {
                return None;
            }
            let profile = UserProfile {
                id: state.users.len() as i64 + 1,
                name: user.name.clone(),
                email: user.email.clone(),
            };
            state
                .users
                .push((profile.clone(), user.password_hash.clone()));
            Some(profile)
        }))
    }

    async fn find_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserProfile>, StorageError> {
        Ok(self.with_state(|state| {
            state
                .users
                .iter()
                .find(|(profile, hash)| profile.email == email && hash == password_hash)
                .map(|(profile, _)| profile.clone())
        }))
    }
}
