use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::error::{ClassificationError, ProgressComputationError, StorageError};
use crate::models::{
    hash_password, normalize_email, Lesson, NewFeedback, NewQuizResult, NewUser, ProgressSummary,
    QuizQuestion, QuizResultRecord, Sentiment, Subject, UserProfile,
};
use crate::progress::ProgressAggregator;
use crate::sentiment::SentimentClassifier;
use crate::store::TutorStore;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn TutorStore>,
    classifier: SentimentClassifier,
    aggregator: ProgressAggregator,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TutorStore>,
        classifier: SentimentClassifier,
        aggregator: ProgressAggregator,
    ) -> Self {
        Self {
            store,
            classifier,
            aggregator,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error(transparent)]
    Progress(#[from] ProgressComputationError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) | ApiError::Classification(_) | ApiError::Progress(_) => {
                error!(error = ?self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/subjects", get(list_subjects))
        .route("/api/lessons/:subject_id", get(list_lessons))
        .route("/api/quiz/:lesson_id", get(list_quiz))
        .route("/api/quiz-results", post(record_quiz_result))
        .route("/api/feedback", post(submit_feedback))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/progress/:user_id", get(progress))
        .with_state(state)
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to SmartTutor Backend!" }))
}

async fn list_subjects(State(state): State<AppState>) -> Result<Json<Vec<Subject>>, ApiError> {
    Ok(Json(state.store.list_subjects().await?))
}

async fn list_lessons(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
) -> Result<Json<Vec<Lesson>>, ApiError> {
    Ok(Json(state.store.list_lessons(subject_id).await?))
}

async fn list_quiz(
    State(state): State<AppState>,
    Path(lesson_id): Path<i64>,
) -> Result<Json<Vec<QuizQuestion>>, ApiError> {
    Ok(Json(state.store.list_quiz(lesson_id).await?))
}

async fn progress(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ProgressSummary>, ApiError> {
    let summary = state.aggregator.summarize(&*state.store, user_id).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    #[serde(default)]
    feedback: String,
    user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct FeedbackResponse {
    feedback: String,
    sentiment: Sentiment,
    polarity: f64,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let Json(request) = payload?;
    if request.feedback.trim().is_empty() {
        return Err(ApiError::BadRequest("Feedback is required".to_string()));
    }

    let classification = state.classifier.classify(&request.feedback)?;
    let created_at = match request.user_id {
        Some(user_id) => {
            let record = state
                .store
                .record_feedback(&NewFeedback {
                    user_id,
                    text: request.feedback.clone(),
                    sentiment: classification.sentiment,
                    polarity: classification.polarity,
                })
                .await?;
            info!(user_id, sentiment = classification.sentiment.as_str(), "feedback recorded");
            Some(record.created_at)
        }
        None => None,
    };

    Ok(Json(FeedbackResponse {
        feedback: request.feedback,
        sentiment: classification.sentiment,
        polarity: classification.polarity,
        message: classification.message,
        created_at,
    }))
}

#[derive(Debug, Deserialize)]
struct QuizResultRequest {
    user_id: i64,
    lesson_id: Option<i64>,
    percentage: f64,
}

async fn record_quiz_result(
    State(state): State<AppState>,
    payload: Result<Json<QuizResultRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QuizResultRecord>), ApiError> {
    let Json(request) = payload?;
    if !request.percentage.is_finite() || !(0.0..=100.0).contains(&request.percentage) {
        return Err(ApiError::BadRequest(
            "percentage must be between 0 and 100".to_string(),
        ));
    }

    let record = state
        .store
        .record_result(&NewQuizResult {
            user_id: request.user_id,
            lesson_id: request.lesson_id,
            percentage: request.percentage,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct AccountResponse {
    message: &'static str,
    user: UserProfile,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let Json(request) = payload?;
    let (Some(username), Some(email), Some(password)) = (
        present(&request.username),
        present(&request.email),
        present(&request.password),
    ) else {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    };

    let user = state
        .store
        .create_user(&NewUser::with_password(username, email, password))
        .await?
        .ok_or_else(|| ApiError::Conflict("Email is already registered".to_string()))?;
    info!(user_id = user.id, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User registered successfully",
            user,
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, ApiError> {
    let Json(request) = payload?;
    let (Some(email), Some(password)) = (present(&request.email), present(&request.password))
    else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let user = state
        .store
        .find_user(&normalize_email(email), &hash_password(password))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    Ok(Json(AccountResponse {
        message: "Login successful",
        user,
    }))
}
