// tests/exam_flow_tests.rs

use chrono::{Duration, Utc};
use exam_portal::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

async fn spawn_app() -> (String, SqlitePool) {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "exam_flow_test_secret".to_string(),
        jwt_expiration: 600,
        port: 0,
        rust_log: "error".to_string(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    prefix: &str,
    role: &str,
) -> String {
    let username = unique_name(prefix);
    let response = client
        .post(format!("{}/api/v1/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "role": role
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .post(format!("{}/api/v1/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_question(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    text: &str,
    answer: &str,
    max_marks: i64,
) -> i64 {
    let response = client
        .post(format!("{}/api/v1/questions", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "text": text,
            "option_a": "Option A",
            "option_b": "Option B",
            "option_c": "Option C",
            "option_d": "Option D",
            "answer": answer,
            "max_marks": max_marks
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn create_paper(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    total_marks: i64,
    question_ids: &[i64],
) -> i64 {
    let response = client
        .post(format!("{}/api/v1/papers", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "title": "Midterm paper",
            "total_marks": total_marks,
            "question_ids": question_ids
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn create_exam(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    paper_id: i64,
    start: chrono::DateTime<Utc>,
    end: chrono::DateTime<Utc>,
) -> i64 {
    let response = client
        .post(format!("{}/api/v1/exams", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "name": "Midterm",
            "paper_id": paper_id,
            "start_time": start.to_rfc3339(),
            "end_time": end.to_rfc3339()
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn full_exam_lifecycle() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let faculty = register_and_login(&client, &address, "fac", "faculty").await;
    let student = register_and_login(&client, &address, "stu", "student").await;

    // Faculty builds a 10-mark paper out of two questions.
    let q1 = create_question(&client, &address, &faculty, "Q1", "A", 5).await;
    let q2 = create_question(&client, &address, &faculty, "Q2", "B", 5).await;
    let paper_id = create_paper(&client, &address, &faculty, 10, &[q1, q2]).await;

    let now = Utc::now();
    let exam_id = create_exam(
        &client,
        &address,
        &faculty,
        paper_id,
        now - Duration::hours(1),
        now + Duration::hours(1),
    )
    .await;

    // The student sees the exam as upcoming.
    let response = client
        .get(format!("{}/api/v1/exams", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["upcoming"].as_array().unwrap().len(), 1);
    assert!(body["completed"].as_array().unwrap().is_empty());
    assert_eq!(body["upcoming"][0]["question_count"], 2);

    // The student view of the exam must not leak answers.
    let response = client
        .get(format!("{}/api/v1/exams/{}", address, exam_id))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total_marks"], 10);
    assert_eq!(body["duration_minutes"], 120);
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    for q in questions {
        assert!(q.get("answer").is_none());
    }

    // Correct answer may be lowercase; the second answer is wrong.
    let response = client
        .post(format!("{}/api/v1/exams/{}/submit", address, exam_id))
        .bearer_auth(&student)
        .json(&serde_json::json!({
            "answers": { (q1.to_string()): "a", (q2.to_string()): "C" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 5);
    assert_eq!(body["total_marks"], 10);
    assert_eq!(body["percentage"], 50.0);

    // A second submission is rejected.
    let response = client
        .post(format!("{}/api/v1/exams/{}/submit", address, exam_id))
        .bearer_auth(&student)
        .json(&serde_json::json!({
            "answers": { (q1.to_string()): "A", (q2.to_string()): "B" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // The exam moved to the student's completed list.
    let response = client
        .get(format!("{}/api/v1/exams", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["upcoming"].as_array().unwrap().is_empty());
    assert_eq!(body["completed"].as_array().unwrap().len(), 1);

    // Results: the student sees their single attempt.
    let response = client
        .get(format!("{}/api/v1/exams/{}/results", address, exam_id))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["score"], 5);
    assert_eq!(results[0]["percentage"], 50.0);

    // Analytics for the owning professor.
    let response = client
        .get(format!("{}/api/v1/exams/{}/analytics", address, exam_id))
        .bearer_auth(&faculty)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["attempted_students"], 1);
    assert_eq!(body["total_students"], 1);
    assert_eq!(body["average_score"], 5.0);
    assert_eq!(body["median_score"], 5);
    assert_eq!(body["highest_score"], 5);
    assert_eq!(body["lowest_score"], 5);
    // 5 out of 10 meets the 50% pass mark.
    assert_eq!(body["pass_percentage"], 100.0);
    let stats = body["question_statistics"].as_array().unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0]["correct_answers"], 1);
    assert_eq!(stats[0]["accuracy_percentage"], 100.0);
    assert_eq!(stats[1]["correct_answers"], 0);

    // Student progress: one of one exam completed, ranked first.
    let response = client
        .get(format!("{}/api/v1/student/progress", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total_exams"], 1);
    assert_eq!(body["completed_exams"], 1);
    assert_eq!(body["total_score"], 5);
    assert_eq!(body["average_percentage"], 50.0);
    assert_eq!(body["rank"], 1);

    // Result notification eventually shows up.
    let mut found = false;
    for _ in 0..50 {
        let response = client
            .get(format!("{}/api/v1/notifications", address))
            .bearer_auth(&student)
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        if body
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["kind"] == "RESULT_READY")
        {
            found = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    assert!(found, "RESULT_READY notification was never delivered");
}

#[tokio::test]
async fn submission_is_rejected_outside_the_window() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let faculty = register_and_login(&client, &address, "fac", "faculty").await;
    let student = register_and_login(&client, &address, "stu", "student").await;

    let q = create_question(&client, &address, &faculty, "Q", "A", 5).await;
    let paper_id = create_paper(&client, &address, &faculty, 5, &[q]).await;

    let now = Utc::now();

    // Not started yet
    let early = create_exam(
        &client,
        &address,
        &faculty,
        paper_id,
        now + Duration::hours(1),
        now + Duration::hours(2),
    )
    .await;
    let response = client
        .post(format!("{}/api/v1/exams/{}/submit", address, early))
        .bearer_auth(&student)
        .json(&serde_json::json!({ "answers": { (q.to_string()): "A" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Exam has not started yet");

    // Already over
    let late = create_exam(
        &client,
        &address,
        &faculty,
        paper_id,
        now - Duration::hours(2),
        now - Duration::hours(1),
    )
    .await;
    let response = client
        .post(format!("{}/api/v1/exams/{}/submit", address, late))
        .bearer_auth(&student)
        .json(&serde_json::json!({ "answers": { (q.to_string()): "A" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Exam time has expired");
}

#[tokio::test]
async fn wizard_validates_marks_sum() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let faculty = register_and_login(&client, &address, "fac", "faculty").await;

    let question = serde_json::json!({
        "text": "Pick one",
        "option_a": "A", "option_b": "B", "option_c": "C", "option_d": "D",
        "answer": "D",
        "max_marks": 4
    });

    // 4 + 4 != 10
    let response = client
        .post(format!("{}/api/v1/papers/wizard", address))
        .bearer_auth(&faculty)
        .json(&serde_json::json!({
            "title": "Bad paper",
            "total_marks": 10,
            "questions": [question, question]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Nothing was persisted.
    let response = client
        .get(format!("{}/api/v1/papers", address))
        .bearer_auth(&faculty)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.as_array().unwrap().is_empty());

    // 4 + 4 == 8
    let response = client
        .post(format!("{}/api/v1/papers/wizard", address))
        .bearer_auth(&faculty)
        .json(&serde_json::json!({
            "title": "Good paper",
            "total_marks": 8,
            "questions": [question, question]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .get(format!("{}/api/v1/papers", address))
        .bearer_auth(&faculty)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let papers = body.as_array().unwrap();
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0]["question_count"], 2);
}

#[tokio::test]
async fn faculty_cannot_touch_each_others_resources() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_a = register_and_login(&client, &address, "fa", "faculty").await;
    let prof_b = register_and_login(&client, &address, "fb", "faculty").await;

    let q = create_question(&client, &address, &prof_a, "Q", "A", 5).await;
    let paper_id = create_paper(&client, &address, &prof_a, 5, &[q]).await;

    let now = Utc::now();
    let exam_id = create_exam(
        &client,
        &address,
        &prof_a,
        paper_id,
        now,
        now + Duration::hours(1),
    )
    .await;

    // B cannot edit or delete A's exam.
    let response = client
        .put(format!("{}/api/v1/exams/{}", address, exam_id))
        .bearer_auth(&prof_b)
        .json(&serde_json::json!({ "name": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .delete(format!("{}/api/v1/exams/{}", address, exam_id))
        .bearer_auth(&prof_b)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // B cannot build a paper from A's questions.
    let response = client
        .post(format!("{}/api/v1/papers", address))
        .bearer_auth(&prof_b)
        .json(&serde_json::json!({
            "title": "Stolen",
            "total_marks": 5,
            "question_ids": [q]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // B's analytics view of A's exam is denied.
    let response = client
        .get(format!("{}/api/v1/exams/{}/analytics", address, exam_id))
        .bearer_auth(&prof_b)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // B cannot see A's question bank.
    let response = client
        .get(format!("{}/api/v1/questions", address))
        .bearer_auth(&prof_b)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn question_crud_and_exam_update() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let faculty = register_and_login(&client, &address, "fac", "faculty").await;

    let q = create_question(&client, &address, &faculty, "Old text", "a", 3).await;

    // The answer letter was stored normalized.
    let response = client
        .get(format!("{}/api/v1/questions", address))
        .bearer_auth(&faculty)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body[0]["answer"], "A");

    // Partial update
    let response = client
        .put(format!("{}/api/v1/questions/{}", address, q))
        .bearer_auth(&faculty)
        .json(&serde_json::json!({ "text": "New text", "max_marks": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["text"], "New text");
    assert_eq!(body["max_marks"], 7);
    assert_eq!(body["answer"], "A");

    // Invalid answer letter on update
    let response = client
        .put(format!("{}/api/v1/questions/{}", address, q))
        .bearer_auth(&faculty)
        .json(&serde_json::json!({ "answer": "E" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Inverted exam window is rejected.
    let paper_id = create_paper(&client, &address, &faculty, 7, &[q]).await;
    let now = Utc::now();
    let response = client
        .post(format!("{}/api/v1/exams", address))
        .bearer_auth(&faculty)
        .json(&serde_json::json!({
            "name": "Backwards",
            "paper_id": paper_id,
            "start_time": now.to_rfc3339(),
            "end_time": (now - Duration::hours(1)).to_rfc3339()
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Delete the question, then the paper lists it no more.
    let response = client
        .delete(format!("{}/api/v1/questions/{}", address, q))
        .bearer_auth(&faculty)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/v1/papers/{}", address, paper_id))
        .bearer_auth(&faculty)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["questions"].as_array().unwrap().is_empty());
}
