use async_trait::async_trait;
use chrono::NaiveDate;
use schooldesk_core::AppResult;
use schooldesk_models::attendance::{
    AttendanceCounts, AttendanceRecord, AttendanceStatus, ClassSelection, Session, SessionSummary,
};
use schooldesk_models::roster::RosterStudent;
use schooldesk_models::{ClassId, SchoolId, StudentId, UserId};

/// One mark to insert or overwrite, keyed by (student, date, session).
#[derive(Debug, Clone)]
pub struct NewAttendanceRecord {
    pub school_id: SchoolId,
    pub class_id: ClassId,
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub session: Session,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub marked_by: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct NewSessionSummary {
    pub school_id: SchoolId,
    pub class_id: ClassId,
    pub date: NaiveDate,
    pub session: Session,
    pub counts: AttendanceCounts,
    pub submitted_by: Option<UserId>,
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Active students, by class then roll number.
    async fn roster(
        &self,
        school_id: SchoolId,
        selection: ClassSelection,
    ) -> AppResult<Vec<RosterStudent>>;

    async fn find_records(
        &self,
        school_id: SchoolId,
        date: NaiveDate,
        session: Session,
        student_ids: &[StudentId],
    ) -> AppResult<Vec<AttendanceRecord>>;

    /// Inserts or overwrites every record in one transaction.
    async fn upsert_records(&self, records: &[NewAttendanceRecord]) -> AppResult<u64>;

    async fn find_summary(
        &self,
        school_id: SchoolId,
        class_id: ClassId,
        date: NaiveDate,
        session: Session,
    ) -> AppResult<Option<SessionSummary>>;

    async fn summaries_for_day(
        &self,
        school_id: SchoolId,
        class_id: ClassId,
        date: NaiveDate,
    ) -> AppResult<Vec<SessionSummary>>;

    /// Writes the submitted summary. `None` when the key was already submitted.
    async fn submit_summary(&self, summary: NewSessionSummary)
    -> AppResult<Option<SessionSummary>>;
}
