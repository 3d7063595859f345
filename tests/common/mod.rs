// tests/common/mod.rs

#![allow(dead_code)]

use quiz_backend::{
    config::Config,
    routes,
    state::AppState,
    utils::jwt::{Role, sign_jwt},
};
use rust_decimal::Decimal;
use sqlx::{PgPool, postgres::PgPoolOptions};

const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
}

/// A seeded question: its id, the correct option and a wrong one.
#[derive(Debug, Clone, Copy)]
pub struct SeededQuestion {
    pub id: i64,
    pub correct: i64,
    pub wrong: i64,
}

/// Spawns the app on a random port against `DATABASE_URL`.
pub async fn spawn_app() -> TestApp {
    // Note: a running Postgres is required.
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
        max_connections: 5,
        per_page: 20,
        pool_utc_offset_minutes: 0,
    };

    let app = routes::create_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn bearer(student_id: i64) -> String {
        let token = sign_jwt(student_id, Role::Student, JWT_SECRET, 600).unwrap();
        format!("Bearer {}", token)
    }

    pub async fn get(&self, student_id: i64, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Authorization", Self::bearer(student_id))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Unsent POST, for firing several requests at once.
    pub fn post_request(
        &self,
        student_id: i64,
        path: &str,
        body: &serde_json::Value,
    ) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", Self::bearer(student_id))
            .json(body)
    }

    pub async fn post(
        &self,
        student_id: i64,
        path: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.post_request(student_id, path, body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Sends every request concurrently and collects the status codes.
    pub async fn send_all(requests: Vec<reqwest::RequestBuilder>) -> Vec<u16> {
        let mut set = tokio::task::JoinSet::new();
        for request in requests {
            set.spawn(request.send());
        }

        let mut statuses = Vec::new();
        while let Some(joined) = set.join_next().await {
            let response = joined.unwrap().expect("Failed to execute request");
            statuses.push(response.status().as_u16());
        }
        statuses
    }

    pub async fn seed_exam_type(&self) -> i64 {
        sqlx::query_scalar("INSERT INTO exam_types (name) VALUES ($1) RETURNING id")
            .bind(format!("type_{}", uuid::Uuid::new_v4()))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn seed_student(&self, exam_type_id: i64) -> i64 {
        sqlx::query_scalar("INSERT INTO students (name, exam_type_id) VALUES ($1, $2) RETURNING id")
            .bind(format!("s_{}", &uuid::Uuid::new_v4().to_string()[..8]))
            .bind(exam_type_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Seeds an exam with `count` two-option questions.
    pub async fn seed_exam(
        &self,
        exam_type_id: i64,
        negative_marking: bool,
        point: Decimal,
        count: usize,
    ) -> (i64, Vec<SeededQuestion>) {
        let exam_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO exams (name, category, exam_type_id, negative_marking, negative_marking_point)
            VALUES ($1, 'mock', $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(format!("Exam {}", uuid::Uuid::new_v4()))
        .bind(exam_type_id)
        .bind(negative_marking)
        .bind(point)
        .fetch_one(&self.pool)
        .await
        .unwrap();

        let mut questions = Vec::with_capacity(count);
        for i in 0..count {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO questions (exam_id, content) VALUES ($1, $2) RETURNING id",
            )
            .bind(exam_id)
            .bind(format!("Question {}", i))
            .fetch_one(&self.pool)
            .await
            .unwrap();

            let correct = self.seed_option(id, "right", true).await;
            let wrong = self.seed_option(id, "wrong", false).await;
            questions.push(SeededQuestion { id, correct, wrong });
        }

        (exam_id, questions)
    }

    async fn seed_option(&self, question_id: i64, content: &str, value: bool) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO options (question_id, content, value) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(question_id)
        .bind(content)
        .bind(value)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }
}
