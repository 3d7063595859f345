// tests/pool_flow_tests.rs

mod common;

use common::{SeededQuestion, TestApp, spawn_app};
use rust_decimal::Decimal;
use serde_json::{Value, json};

async fn answer(app: &TestApp, student: i64, question_id: i64, option_id: i64) -> (u16, Value) {
    let response = app
        .post(
            student,
            "/api/pool/answer",
            &json!({ "question_id": question_id, "option_id": option_id }),
        )
        .await;
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn entry_count(app: &TestApp, student: i64) -> i64 {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM pool_entries pe
        JOIN student_pools sp ON sp.id = pe.student_pool_id
        WHERE sp.student_id = $1
        "#,
    )
    .bind(student)
    .fetch_one(&app.pool)
    .await
    .unwrap()
}

async fn seed_pool(app: &TestApp, count: usize) -> (i64, i64, Vec<SeededQuestion>) {
    let exam_type = app.seed_exam_type().await;
    let student = app.seed_student(exam_type).await;
    let (_, questions) = app.seed_exam(exam_type, false, Decimal::ZERO, count).await;
    (exam_type, student, questions)
}

#[tokio::test]
async fn three_strikes_end_the_day() {
    let app = spawn_app().await;
    let (exam_type, student, questions) = seed_pool(&app, 4).await;

    // First draw needs no token and hides correctness
    let response = app.get(student, "/api/pool/question").await;
    assert_eq!(response.status().as_u16(), 200);
    let question: Value = response.json().await.unwrap();
    assert!(questions.iter().any(|q| question["id"] == q.id));
    assert!(question["options"][0].get("value").is_none());

    let status: Value = app.get(student, "/api/pool/status").await.json().await.unwrap();
    assert_eq!(status["state"], "not_started");

    // Strike 1
    let (code, first) = answer(&app, student, questions[0].id, questions[0].wrong).await;
    assert_eq!(code, 200);
    assert_eq!(first["type"], 0);
    assert_eq!(first["strike"], 1);
    let stale = first["token"].as_str().unwrap().to_string();

    // Re-answering is refused without a second entry or strike
    let (code, repeat) = answer(&app, student, questions[0].id, questions[0].correct).await;
    assert_eq!(code, 400);
    assert_eq!(repeat["error"], "Question already answered");
    assert_eq!(repeat["strike"], 1);
    assert_eq!(entry_count(&app, student).await, 1);
    let current = repeat["token"].as_str().unwrap().to_string();
    assert_ne!(current, stale);

    // Only the latest token draws
    let response = app
        .get(student, &format!("/api/pool/question?token={}", stale))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let next: Value = app
        .get(student, &format!("/api/pool/question?token={}", current))
        .await
        .json()
        .await
        .unwrap();
    assert_ne!(next["id"], questions[0].id);

    // Strike 2
    let (code, second) = answer(&app, student, questions[1].id, questions[1].wrong).await;
    assert_eq!(code, 200);
    assert_eq!(second["strike"], 2);
    let token = second["token"].as_str().unwrap().to_string();

    // Strike 3: game over
    let (code, over) = answer(&app, student, questions[2].id, questions[2].wrong).await;
    assert_eq!(code, 400);
    assert_eq!(over["error"], "Game over");
    assert_eq!(over["strike"], 3);
    assert_eq!(over["score"], 0);

    // No more pool today
    let response = app
        .get(student, &format!("/api/pool/question?token={}", token))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Only one pool per day");

    let (code, _) = answer(&app, student, questions[3].id, questions[3].correct).await;
    assert_eq!(code, 400);
    assert_eq!(entry_count(&app, student).await, 3);

    let status: Value = app.get(student, "/api/pool/status").await.json().await.unwrap();
    assert_eq!(status["state"], "finished");
    assert_eq!(status["strike"], 3);

    // Finished players still show on today's board
    let board: Value = app
        .get(student, &format!("/api/pool/leaderboard?exam_type_id={}", exam_type))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(board["total"], 1);
    assert_eq!(board["data"][0]["student_id"], student);
    assert_eq!(board["data"][0]["score"], 0);
}

#[tokio::test]
async fn correct_answers_build_the_score() {
    let app = spawn_app().await;
    let (exam_type, student, questions) = seed_pool(&app, 3).await;
    let rival = app.seed_student(exam_type).await;

    let (code, first) = answer(&app, student, questions[0].id, questions[0].correct).await;
    assert_eq!(code, 200);
    assert_eq!(first["type"], 1);
    assert_eq!(first["strike"], 0);

    let (code, _) = answer(&app, student, questions[1].id, questions[1].correct).await;
    assert_eq!(code, 200);

    let (code, _) = answer(&app, rival, questions[0].id, questions[0].wrong).await;
    assert_eq!(code, 200);

    let status: Value = app.get(student, "/api/pool/status").await.json().await.unwrap();
    assert_eq!(status["state"], "in_progress");
    assert_eq!(status["score"], 2);

    // Defaults to the caller's exam type
    let board: Value = app
        .get(student, "/api/pool/leaderboard")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(board["total"], 2);
    assert_eq!(board["data"][0]["student_id"], student);
    assert_eq!(board["data"][0]["score"], 2);
    assert_eq!(board["data"][1]["student_id"], rival);
    assert_eq!(board["data"][1]["score"], 0);
}

#[tokio::test]
async fn option_from_another_question_is_rejected() {
    let app = spawn_app().await;
    let (_, student, questions) = seed_pool(&app, 2).await;

    let (code, _) = answer(&app, student, questions[0].id, questions[1].correct).await;
    assert_eq!(code, 400);
    assert_eq!(entry_count(&app, student).await, 0);

    let status: Value = app.get(student, "/api/pool/status").await.json().await.unwrap();
    assert_eq!(status["state"], "not_started");
}

async fn strike_of(app: &TestApp, student: i64) -> i16 {
    sqlx::query_scalar("SELECT strike FROM student_pools WHERE student_id = $1")
        .bind(student)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn question_from_another_exam_type_is_rejected() {
    let app = spawn_app().await;
    let (_, student, _) = seed_pool(&app, 1).await;
    let other_type = app.seed_exam_type().await;
    let (_, foreign) = app.seed_exam(other_type, false, Decimal::ZERO, 1).await;

    let (code, body) = answer(&app, student, foreign[0].id, foreign[0].correct).await;
    assert_eq!(code, 400);
    assert_eq!(body["error"], "Question is not part of your pool");
    assert_eq!(entry_count(&app, student).await, 0);

    let status: Value = app.get(student, "/api/pool/status").await.json().await.unwrap();
    assert_eq!(status["state"], "not_started");
    assert_eq!(status["score"], 0);
}

#[tokio::test]
async fn concurrent_wrong_answers_stop_at_three_strikes() {
    let app = spawn_app().await;
    let (_, student, questions) = seed_pool(&app, 5).await;

    let requests = questions
        .iter()
        .map(|q| {
            app.post_request(
                student,
                "/api/pool/answer",
                &json!({ "question_id": q.id, "option_id": q.wrong }),
            )
        })
        .collect();
    let statuses = TestApp::send_all(requests).await;

    // Strikes 1 and 2 succeed; the third is game over and the rest hit the limit
    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 2);
    assert_eq!(statuses.iter().filter(|s| **s == 400).count(), 3);
    assert_eq!(strike_of(&app, student).await, 3);
    assert_eq!(entry_count(&app, student).await, 3);
}

#[tokio::test]
async fn concurrent_answers_to_one_question_record_once() {
    let app = spawn_app().await;
    let (_, student, questions) = seed_pool(&app, 1).await;
    let q = questions[0];

    let requests = (0..5)
        .map(|_| {
            app.post_request(
                student,
                "/api/pool/answer",
                &json!({ "question_id": q.id, "option_id": q.wrong }),
            )
        })
        .collect();
    let statuses = TestApp::send_all(requests).await;

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 400).count(), 4);
    assert_eq!(strike_of(&app, student).await, 1);
    assert_eq!(entry_count(&app, student).await, 1);
}
