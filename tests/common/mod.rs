#![allow(dead_code)]

pub mod db;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use schooldesk::modules::attendance::memory::InMemoryAttendanceRepository;
use schooldesk::modules::circulation::memory::InMemoryCirculationRepository;
use schooldesk::router::init_router;
use schooldesk::state::AppState;
use schooldesk_config::{CorsConfig, LibraryPolicy};
use schooldesk_models::library::{BookCopy, CopyStatus, Member, MemberType};
use schooldesk_models::roster::{RosterStudent, SchoolClass};
use schooldesk_models::{BookCopyId, ClassId, MemberId, SchoolId, StudentId};
use serde_json::Value;
use tower::ServiceExt;

/// One school wired to in-memory stores, with handles kept for seeding.
pub struct TestApp {
    pub school_id: SchoolId,
    pub library: Arc<InMemoryCirculationRepository>,
    pub attendance: Arc<InMemoryAttendanceRepository>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let library = Arc::new(InMemoryCirculationRepository::new());
        let attendance = Arc::new(InMemoryAttendanceRepository::new());
        let state = AppState {
            circulation_repo: library.clone(),
            attendance_repo: attendance.clone(),
            library_policy: LibraryPolicy::default(),
            cors_config: CorsConfig::from_vars(|_| None),
        };

        Self {
            school_id: SchoolId::new(),
            library,
            attendance,
            router: init_router(state),
        }
    }

    /// Same stores and router, acting as a different school.
    pub fn rescoped(&self) -> Self {
        Self {
            school_id: SchoolId::new(),
            library: self.library.clone(),
            attendance: self.attendance.clone(),
            router: self.router.clone(),
        }
    }

    pub async fn copy_status(&self, id: BookCopyId) -> Option<CopyStatus> {
        self.library.copy(id).await.map(|c| c.status)
    }

    pub async fn member(&self, member_type: MemberType) -> MemberId {
        let member = Member {
            id: MemberId::new(),
            school_id: self.school_id,
            full_name: "Chidi Okafor".into(),
            member_type,
            current_borrowed: 0,
            is_active: true,
            is_blocked: false,
        };
        let id = member.id;
        self.library.insert_member(member).await;
        id
    }

    pub async fn copy(&self, accession_number: i64) -> BookCopyId {
        let copy = BookCopy {
            id: BookCopyId::new(),
            school_id: self.school_id,
            accession_number,
            call_number: "966.9 ACH".into(),
            title: "There Was a Country".into(),
            status: CopyStatus::Available,
            is_reference: false,
        };
        let id = copy.id;
        self.library.insert_copy(copy).await;
        id
    }

    /// Creates a class with `size` students, roll numbers from 1.
    pub async fn class(&self, name: &str, size: usize) -> (ClassId, Vec<StudentId>) {
        let class = SchoolClass {
            id: ClassId::new(),
            school_id: self.school_id,
            name: name.into(),
        };
        let class_id = class.id;
        self.attendance.insert_class(class).await;

        let mut students = Vec::with_capacity(size);
        for roll in 1..=size {
            let student = RosterStudent {
                id: StudentId::new(),
                school_id: self.school_id,
                class_id,
                first_name: format!("Student{roll}"),
                last_name: name.into(),
                roll_number: Some(roll as i32),
            };
            students.push(student.id);
            self.attendance.insert_student(student).await;
        }
        (class_id, students)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(body)).await
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-school-id", self.school_id.to_string());
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Sends a request without the school header.
    pub async fn get_unscoped(&self, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap().status()
    }
}
