mod common;

use axum::http::StatusCode;
use common::TestApp;
use schooldesk_models::StudentId;
use serde_json::{Value, json};

const DAY: &str = "2025-04-07";

fn marks(students: &[StudentId], absent: &[usize]) -> Value {
    students
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let status = if absent.contains(&i) { "absent" } else { "present" };
            json!({ "student_id": id.to_string(), "status": status })
        })
        .collect()
}

#[tokio::test]
async fn test_open_sheet_defaults_everyone_present() {
    let app = TestApp::new();
    let (class_id, _) = app.class("JSS1-A", 30).await;

    let (status, sheet) = app
        .get(&format!(
            "/api/attendance/sheet?date={DAY}&session=morning&class={class_id}"
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(sheet["state"], "unmarked");
    assert_eq!(sheet["counts"]["total"], 30);
    assert_eq!(sheet["counts"]["present"], 30);
    assert_eq!(sheet["counts"]["unmarked"], 0);
    let entries = sheet["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 30);
    assert_eq!(entries[0]["roll_number"], 1);
    assert!(entries.iter().all(|e| e["status"] == "present"));
}

#[tokio::test]
async fn test_saved_draft_overlays_defaults() {
    let app = TestApp::new();
    let (class_id, students) = app.class("JSS1-B", 5).await;

    let (status, sheet) = app
        .put(
            "/api/attendance/sheet",
            json!({
                "date": DAY,
                "session": "afternoon",
                "class": class_id.to_string(),
                "marks": [{ "student_id": students[2].to_string(), "status": "late", "reason": "bus" }]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(sheet["state"], "drafted");
    assert_eq!(sheet["counts"]["present"], 4);
    assert_eq!(sheet["counts"]["late"], 1);
    assert_eq!(sheet["entries"][2]["reason"], "bus");
    assert_eq!(app.attendance.record_count().await, 1);

    // The morning sheet of the same day is untouched.
    let (_, morning) = app
        .get(&format!(
            "/api/attendance/sheet?date={DAY}&session=morning&class={class_id}"
        ))
        .await;
    assert_eq!(morning["state"], "unmarked");
    assert_eq!(morning["counts"]["late"], 0);
}

#[tokio::test]
async fn test_submit_checks_manual_count() {
    let app = TestApp::new();
    let (class_id, students) = app.class("JSS2-A", 10).await;
    let body = |present: i32, absent: i32| {
        json!({
            "date": DAY,
            "session": "morning",
            "class": class_id.to_string(),
            "marks": marks(&students, &[0, 1]),
            "manual_count": { "present": present, "absent": absent }
        })
    };

    let (status, error) = app.post("/api/attendance/submit", body(9, 1)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error["error"].as_str().unwrap().contains("present"));
    assert_eq!(app.attendance.record_count().await, 0);

    let (status, summary) = app.post("/api/attendance/submit", body(8, 2)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["is_submitted"], true);
    assert_eq!(summary["total_students"], 10);
    assert_eq!(summary["present_count"], 8);
    assert_eq!(summary["absent_count"], 2);
    assert_eq!(app.attendance.record_count().await, 10);
}

#[tokio::test]
async fn test_submit_rejects_cleared_students() {
    let app = TestApp::new();
    let (class_id, students) = app.class("JSS2-B", 4).await;

    let (status, error) = app
        .post(
            "/api/attendance/submit",
            json!({
                "date": DAY,
                "session": "morning",
                "class": class_id.to_string(),
                "marks": marks(&students[..3], &[]),
                "unmarked": [students[3].to_string()]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error["error"].as_str().unwrap().starts_with('1'));
    assert_eq!(app.attendance.record_count().await, 0);
}

#[tokio::test]
async fn test_submit_counts_what_the_sheet_shows() {
    let app = TestApp::new();
    let (class_id, students) = app.class("JSS2-C", 3).await;
    let sheet_uri = format!("/api/attendance/sheet?date={DAY}&session=morning&class={class_id}");

    let (status, _) = app
        .put(
            "/api/attendance/sheet",
            json!({
                "date": DAY,
                "session": "morning",
                "class": class_id.to_string(),
                "marks": [{ "student_id": students[0].to_string(), "status": "absent" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, sheet) = app.get(&sheet_uri).await;
    assert_eq!(sheet["counts"]["present"], 2);
    assert_eq!(sheet["counts"]["absent"], 1);
    assert_eq!(sheet["counts"]["unmarked"], 0);

    let (status, summary) = app
        .post(
            "/api/attendance/submit",
            json!({ "date": DAY, "session": "morning", "class": class_id.to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["present_count"], 2);
    assert_eq!(summary["absent_count"], 1);
    assert_eq!(app.attendance.record_count().await, 3);

    let (_, sheet) = app.get(&sheet_uri).await;
    assert_eq!(sheet["state"], "submitted");
    assert_eq!(sheet["entries"][0]["status"], "absent");
}

#[tokio::test]
async fn test_submit_for_all_classes_is_rejected() {
    let app = TestApp::new();
    let (_, first) = app.class("JSS3-A", 2).await;
    let (_, second) = app.class("JSS3-B", 2).await;
    let everyone: Vec<StudentId> = first.into_iter().chain(second).collect();

    let (status, error) = app
        .post(
            "/api/attendance/submit",
            json!({ "date": DAY, "session": "morning", "class": "all", "marks": marks(&everyone, &[]) }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error["error"].as_str().unwrap().contains("class"));
}

#[tokio::test]
async fn test_submitted_session_is_frozen() {
    let app = TestApp::new();
    let (class_id, students) = app.class("SS1-A", 3).await;
    let submit = json!({
        "date": DAY,
        "session": "morning",
        "class": class_id.to_string(),
        "marks": marks(&students, &[])
    });

    let (status, _) = app.post("/api/attendance/submit", submit.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/api/attendance/submit", submit).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .put(
            "/api/attendance/sheet",
            json!({
                "date": DAY,
                "session": "morning",
                "class": class_id.to_string(),
                "marks": marks(&students, &[0])
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, sheet) = app
        .get(&format!(
            "/api/attendance/sheet?date={DAY}&session=morning&class={class_id}"
        ))
        .await;
    assert_eq!(sheet["state"], "submitted");
    assert_eq!(sheet["summary"]["present_count"], 3);
}

#[tokio::test]
async fn test_daily_verification_needs_both_sessions() {
    let app = TestApp::new();
    let (class_id, students) = app.class("SS2-A", 4).await;
    let daily_uri = format!("/api/attendance/daily?date={DAY}&class_id={class_id}");

    app.post(
        "/api/attendance/submit",
        json!({ "date": DAY, "session": "morning", "class": class_id.to_string(), "marks": marks(&students, &[]) }),
    )
    .await;

    let (status, daily) = app.get(&daily_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(daily["is_verified"], false);
    assert_eq!(daily["pending_sessions"], json!(["afternoon"]));
    assert_eq!(daily["morning"]["present_count"], 4);
    assert!(daily["afternoon"].is_null());

    app.post(
        "/api/attendance/submit",
        json!({ "date": DAY, "session": "afternoon", "class": class_id.to_string(), "marks": marks(&students, &[3]) }),
    )
    .await;

    let (_, daily) = app.get(&daily_uri).await;
    assert_eq!(daily["is_verified"], true);
    assert_eq!(daily["pending_sessions"], json!([]));
    assert_eq!(daily["afternoon"]["absent_count"], 1);
}

#[tokio::test]
async fn test_marks_for_unknown_student_are_rejected() {
    let app = TestApp::new();
    let (class_id, _) = app.class("SS3-A", 2).await;

    let (status, _) = app
        .put(
            "/api/attendance/sheet",
            json!({
                "date": DAY,
                "session": "morning",
                "class": class_id.to_string(),
                "marks": [{ "student_id": StudentId::new().to_string(), "status": "present" }]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.attendance.record_count().await, 0);
}

#[tokio::test]
async fn test_invalid_class_selection_is_bad_request() {
    let app = TestApp::new();
    let (status, _) = app
        .get(&format!(
            "/api/attendance/sheet?date={DAY}&session=morning&class=not-a-class"
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
