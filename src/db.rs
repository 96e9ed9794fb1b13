use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::models::{
    FeedbackRecord, Lesson, NewFeedback, NewQuizResult, NewUser, QuizQuestion, QuizResultRecord,
    Subject, UserProfile,
};
use crate::sentiment::SentimentClassifier;
use crate::store::{AccountStore, CatalogStore, FeedbackStore, QuizResultStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed store. Each query checks a connection out of the pool and
/// returns it when the query completes.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizResultStore for PgStore {
    async fn fetch_results(&self, user_id: i64) -> Result<Vec<QuizResultRecord>, StorageError> {
        let results = sqlx::query_as::<_, QuizResultRecord>(
            r#"
            SELECT user_id, lesson_id, percentage, recorded_at
            FROM smarttutor.quiz_results
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(user_id, count = results.len(), "fetched quiz results");
        Ok(results)
    }

    async fn record_result(
        &self,
        result: &NewQuizResult,
    ) -> Result<QuizResultRecord, StorageError> {
        let record = sqlx::query_as::<_, QuizResultRecord>(
            r#"
            INSERT INTO smarttutor.quiz_results (user_id, lesson_id, percentage)
            VALUES ($1, $2, $3)
            RETURNING user_id, lesson_id, percentage, recorded_at
            "#,
        )
        .bind(result.user_id)
        .bind(result.lesson_id)
        .bind(result.percentage)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn fetch_recent(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let feedback = sqlx::query_as::<_, FeedbackRecord>(
            r#"
            SELECT user_id, sentiment, created_at
            FROM smarttutor.feedback
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(user_id, count = feedback.len(), "fetched recent feedback");
        Ok(feedback)
    }

    async fn record_feedback(
        &self,
        feedback: &NewFeedback,
    ) -> Result<FeedbackRecord, StorageError> {
        let record = sqlx::query_as::<_, FeedbackRecord>(
            r#"
            INSERT INTO smarttutor.feedback (user_id, feedback_text, sentiment, polarity)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, sentiment, created_at
            "#,
        )
        .bind(feedback.user_id)
        .bind(&feedback.text)
        .bind(feedback.sentiment.as_str())
        .bind(feedback.polarity)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        let subjects = sqlx::query_as::<_, Subject>(
            "SELECT id, name, description FROM smarttutor.subjects ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    async fn list_lessons(&self, subject_id: i64) -> Result<Vec<Lesson>, StorageError> {
        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT id, subject_id, title, content
            FROM smarttutor.lessons
            WHERE subject_id = $1
            ORDER BY id
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lessons)
    }

    async fn list_quiz(&self, lesson_id: i64) -> Result<Vec<QuizQuestion>, StorageError> {
        let questions = sqlx::query_as::<_, QuizQuestion>(
            r#"
            SELECT id, lesson_id, question, options, answer
            FROM smarttutor.quiz_questions
            WHERE lesson_id = $1
            ORDER BY id
            "#,
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, user: &NewUser) -> Result<Option<UserProfile>, StorageError> {
        let created = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO smarttutor.users (name, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, name, email
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserProfile>, StorageError> {
        let user = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, name, email
            FROM smarttutor.users
            WHERE email = $1 AND password_hash = $2
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

async fn upsert_user(pool: &PgPool, user: &NewUser) -> anyhow::Result<i64> {
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO smarttutor.users (name, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET name = EXCLUDED.name, password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let subjects = vec![
        (
            "Mathematics",
            "Numbers, algebra and geometry",
            vec![
                ("Fractions", "Adding and comparing fractions"),
                ("Linear Equations", "Solving for a single unknown"),
            ],
        ),
        (
            "Science",
            "Physics, chemistry and biology basics",
            vec![("States of Matter", "Solids, liquids and gases")],
        ),
    ];

    let mut first_lesson_id = None;
    for (name, description, lessons) in subjects {
        let subject_id: i64 = sqlx::query(
            r#"
            INSERT INTO smarttutor.subjects (name, description)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .await?
        .get("id");

        for (title, content) in lessons {
            let lesson_id: i64 = sqlx::query(
                r#"
                INSERT INTO smarttutor.lessons (subject_id, title, content)
                VALUES ($1, $2, $3)
                ON CONFLICT (subject_id, title) DO UPDATE SET content = EXCLUDED.content
                RETURNING id
                "#,
            )
            .bind(subject_id)
            .bind(title)
            .bind(content)
            .fetch_one(pool)
            .await?
            .get("id");
            first_lesson_id.get_or_insert(lesson_id);
        }
    }

    let lesson_id = first_lesson_id.context("seed data defines no lessons")?;
    let questions = vec![
        ("What is 1/2 + 1/4?", vec!["1/6", "2/6", "3/4", "1/8"], "3/4"),
        ("Which is larger, 2/3 or 3/5?", vec!["2/3", "3/5"], "2/3"),
    ];
    for (question, options, answer) in questions {
        sqlx::query(
            r#"
            INSERT INTO smarttutor.quiz_questions (lesson_id, question, options, answer)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (lesson_id, question) DO NOTHING
            "#,
        )
        .bind(lesson_id)
        .bind(question)
        .bind(options)
        .bind(answer)
        .execute(pool)
        .await?;
    }

    let user_id = upsert_user(
        pool,
        &NewUser::with_password("Demo Learner", "demo@smarttutor.dev", "learn-every-day"),
    )
    .await?;

    for (source_key, percentage) in [("seed-q1", 80.0), ("seed-q2", 90.0), ("seed-q3", 70.0)] {
        sqlx::query(
            r#"
            INSERT INTO smarttutor.quiz_results (user_id, lesson_id, percentage, source_key)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(percentage)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let classifier = SentimentClassifier::default();
    let feedback = [
        ("seed-f1", 4, "The fractions lesson was confusing"),
        ("seed-f2", 3, "Linear equations are really hard"),
        ("seed-f3", 2, "I finished the quiz"),
        ("seed-f4", 1, "Great examples, very helpful"),
        ("seed-f5", 0, "I really enjoyed the science lesson"),
    ];
    for (source_key, days_ago, text) in feedback {
        let classification = classifier.classify(text)?;
        sqlx::query(
            r#"
            INSERT INTO smarttutor.feedback
            (user_id, feedback_text, sentiment, polarity, created_at, source_key)
            VALUES ($1, $2, $3, $4, now() - make_interval(days => $5), $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(text)
        .bind(classification.sentiment.as_str())
        .bind(classification.polarity)
        .bind(days_ago)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        percentage: f64,
        lesson_id: Option<i64>,
        recorded_at: Option<DateTime<Utc>>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        if !(0.0..=100.0).contains(&row.percentage) {
            warn!(line = line + 2, percentage = row.percentage, "skipping out-of-range score");
            continue;
        }

        let user_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM smarttutor.users WHERE email = $1")
                .bind(row.email.trim().to_lowercase())
                .fetch_optional(pool)
                .await?;
        let Some(user_id) = user_id else {
            warn!(line = line + 2, email = %row.email, "skipping result for unknown user");
            continue;
        };

        let result = sqlx::query(
            r#"
            INSERT INTO smarttutor.quiz_results
            (user_id, lesson_id, percentage, recorded_at, source_key)
            VALUES ($1, $2, $3, COALESCE($4, now()), $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(row.lesson_id)
        .bind(row.percentage)
        .bind(row.recorded_at)
        .bind(row.source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
