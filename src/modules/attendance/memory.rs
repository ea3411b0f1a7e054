//! In-memory attendance store for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use schooldesk_core::AppResult;
use schooldesk_models::attendance::{AttendanceRecord, ClassSelection, Session, SessionSummary};
use schooldesk_models::roster::{RosterStudent, SchoolClass};
use schooldesk_models::{ClassId, SchoolId, SessionSummaryId, StudentId};
use tokio::sync::RwLock;

use super::repository::{AttendanceRepository, NewAttendanceRecord, NewSessionSummary};

type SummaryKey = (SchoolId, ClassId, NaiveDate, Session);

#[derive(Debug, Default)]
struct Register {
    classes: HashMap<ClassId, SchoolClass>,
    students: Vec<RosterStudent>,
    records: HashMap<(StudentId, NaiveDate, Session), AttendanceRecord>,
    summaries: HashMap<SummaryKey, SessionSummary>,
}

#[derive(Debug, Default)]
pub struct InMemoryAttendanceRepository {
    inner: RwLock<Register>,
}

impl InMemoryAttendanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_class(&self, class: SchoolClass) {
        self.inner.write().await.classes.insert(class.id, class);
    }

    pub async fn insert_student(&self, student: RosterStudent) {
        self.inner.write().await.students.push(student);
    }

    pub async fn record_count(&self) -> usize {
        self.inner.read().await.records.len()
    }
}

#[async_trait]
impl AttendanceRepository for InMemoryAttendanceRepository {
    async fn roster(
        &self,
        school_id: SchoolId,
        selection: ClassSelection,
    ) -> AppResult<Vec<RosterStudent>> {
        let register = self.inner.read().await;
        let class_name = |id: ClassId| {
            register
                .classes
                .get(&id)
                .map(|c| c.name.clone())
                .unwrap_or_default()
        };

        let mut roster: Vec<RosterStudent> = register
            .students
            .iter()
            .filter(|s| s.school_id == school_id)
            .filter(|s| selection.class_id().is_none_or(|id| s.class_id == id))
            .cloned()
            .collect();
        roster.sort_by_key(|s| {
            (
                class_name(s.class_id),
                s.roll_number.is_none(),
                s.roll_number,
                s.last_name.clone(),
                s.first_name.clone(),
            )
        });
        Ok(roster)
    }

    async fn find_records(
        &self,
        school_id: SchoolId,
        date: NaiveDate,
        session: Session,
        student_ids: &[StudentId],
    ) -> AppResult<Vec<AttendanceRecord>> {
        let register = self.inner.read().await;
        Ok(student_ids
            .iter()
            .filter_map(|id| register.records.get(&(*id, date, session)))
            .filter(|r| r.school_id == school_id)
            .cloned()
            .collect())
    }

    async fn upsert_records(&self, records: &[NewAttendanceRecord]) -> AppResult<u64> {
        let mut register = self.inner.write().await;
        let now = Utc::now();
        for record in records {
            let key = (record.student_id, record.date, record.session);
            let id = register
                .records
                .get(&key)
                .map(|existing| existing.id)
                .unwrap_or_default();
            register.records.insert(
                key,
                AttendanceRecord {
                    id,
                    school_id: record.school_id,
                    class_id: record.class_id,
                    student_id: record.student_id,
                    date: record.date,
                    session: record.session,
                    status: record.status,
                    reason: record.reason.clone(),
                    notes: record.notes.clone(),
                    marked_by: record.marked_by,
                    updated_at: now,
                },
            );
        }
        Ok(records.len() as u64)
    }

    async fn find_summary(
        &self,
        school_id: SchoolId,
        class_id: ClassId,
        date: NaiveDate,
        session: Session,
    ) -> AppResult<Option<SessionSummary>> {
        let register = self.inner.read().await;
        Ok(register
            .summaries
            .get(&(school_id, class_id, date, session))
            .cloned())
    }

    async fn summaries_for_day(
        &self,
        school_id: SchoolId,
        class_id: ClassId,
        date: NaiveDate,
    ) -> AppResult<Vec<SessionSummary>> {
        let register = self.inner.read().await;
        Ok(Session::ALL
            .iter()
            .filter_map(|session| register.summaries.get(&(school_id, class_id, date, *session)))
            .cloned()
            .collect())
    }

    async fn submit_summary(
        &self,
        summary: NewSessionSummary,
    ) -> AppResult<Option<SessionSummary>> {
        let mut register = self.inner.write().await;
        let key = (summary.school_id, summary.class_id, summary.date, summary.session);

        let id = match register.summaries.get(&key) {
            Some(existing) if existing.is_submitted => return Ok(None),
            Some(existing) => existing.id,
            None => SessionSummaryId::new(),
        };

        let submitted = SessionSummary {
            id,
            school_id: summary.school_id,
            class_id: summary.class_id,
            date: summary.date,
            session: summary.session,
            total_students: summary.counts.total,
            present_count: summary.counts.present,
            absent_count: summary.counts.absent,
            late_count: summary.counts.late,
            is_submitted: true,
            submitted_at: Some(Utc::now()),
            submitted_by: summary.submitted_by,
        };
        register.summaries.insert(key, submitted.clone());
        Ok(Some(submitted))
    }
}
