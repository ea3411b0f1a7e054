use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use schooldesk_core::{AppError, AppResult};
use schooldesk_models::attendance::{AttendanceRecord, ClassSelection, Session, SessionSummary};
use schooldesk_models::roster::RosterStudent;
use schooldesk_models::{ClassId, SchoolId, StudentId};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::repository::{AttendanceRepository, NewAttendanceRecord, NewSessionSummary};

const SUMMARY_COLUMNS: &str = "id, school_id, class_id, date, session, total_students, \
     present_count, absent_count, late_count, is_submitted, submitted_at, submitted_by";

#[derive(Clone, Debug)]
pub struct PgAttendanceRepository {
    pool: PgPool,
}

impl PgAttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    #[instrument(skip(self))]
    async fn roster(
        &self,
        school_id: SchoolId,
        selection: ClassSelection,
    ) -> AppResult<Vec<RosterStudent>> {
        sqlx::query_as::<_, RosterStudent>(
            r#"
            SELECT s.id, s.school_id, s.class_id, s.first_name, s.last_name, s.roll_number
            FROM students s
            JOIN classes c ON c.id = s.class_id
            WHERE s.school_id = $1 AND s.is_active
              AND ($2::uuid IS NULL OR s.class_id = $2)
            ORDER BY c.name, s.roll_number NULLS LAST, s.last_name, s.first_name
            "#,
        )
        .bind(school_id)
        .bind(selection.class_id())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch roster")
        .map_err(AppError::database)
    }

    #[instrument(skip(self, student_ids), fields(students = student_ids.len()))]
    async fn find_records(
        &self,
        school_id: SchoolId,
        date: NaiveDate,
        session: Session,
        student_ids: &[StudentId],
    ) -> AppResult<Vec<AttendanceRecord>> {
        let ids: Vec<Uuid> = student_ids.iter().map(|id| id.into_inner()).collect();
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, school_id, class_id, student_id, date, session, status, reason, notes,
                   marked_by, updated_at
            FROM attendance_records
            WHERE school_id = $1 AND date = $2 AND session = $3 AND student_id = ANY($4)
            "#,
        )
        .bind(school_id)
        .bind(date)
        .bind(session)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch attendance records")
        .map_err(AppError::database)
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    async fn upsert_records(&self, records: &[NewAttendanceRecord]) -> AppResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let mut written = 0;
        for record in records {
            written += sqlx::query(
                r#"
                INSERT INTO attendance_records
                    (school_id, class_id, student_id, date, session, status, reason, notes, marked_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (student_id, date, session) DO UPDATE
                SET class_id = EXCLUDED.class_id,
                    status = EXCLUDED.status,
                    reason = EXCLUDED.reason,
                    notes = EXCLUDED.notes,
                    marked_by = EXCLUDED.marked_by,
                    updated_at = NOW()
                "#,
            )
            .bind(record.school_id)
            .bind(record.class_id)
            .bind(record.student_id)
            .bind(record.date)
            .bind(record.session)
            .bind(record.status)
            .bind(&record.reason)
            .bind(&record.notes)
            .bind(record.marked_by)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert attendance record")
            .map_err(AppError::database)?
            .rows_affected();
        }

        tx.commit()
            .await
            .context("Failed to commit attendance records")
            .map_err(AppError::database)?;

        Ok(written)
    }

    #[instrument(skip(self))]
    async fn find_summary(
        &self,
        school_id: SchoolId,
        class_id: ClassId,
        date: NaiveDate,
        session: Session,
    ) -> AppResult<Option<SessionSummary>> {
        let sql = format!(
            "SELECT {} FROM attendance_session_summaries \
             WHERE school_id = $1 AND class_id = $2 AND date = $3 AND session = $4",
            SUMMARY_COLUMNS
        );
        sqlx::query_as::<_, SessionSummary>(&sql)
            .bind(school_id)
            .bind(class_id)
            .bind(date)
            .bind(session)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch session summary")
            .map_err(AppError::database)
    }

    #[instrument(skip(self))]
    async fn summaries_for_day(
        &self,
        school_id: SchoolId,
        class_id: ClassId,
        date: NaiveDate,
    ) -> AppResult<Vec<SessionSummary>> {
        let sql = format!(
            "SELECT {} FROM attendance_session_summaries \
             WHERE school_id = $1 AND class_id = $2 AND date = $3",
            SUMMARY_COLUMNS
        );
        sqlx::query_as::<_, SessionSummary>(&sql)
            .bind(school_id)
            .bind(class_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch session summaries")
            .map_err(AppError::database)
    }

    #[instrument(skip(self))]
    async fn submit_summary(
        &self,
        summary: NewSessionSummary,
    ) -> AppResult<Option<SessionSummary>> {
        let sql = format!(
            "INSERT INTO attendance_session_summaries \
                 (school_id, class_id, date, session, total_students, present_count, \
                  absent_count, late_count, is_submitted, submitted_at, submitted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, NOW(), $9) \
             ON CONFLICT (school_id, class_id, date, session) DO UPDATE \
             SET total_students = EXCLUDED.total_students, \
                 present_count = EXCLUDED.present_count, \
                 absent_count = EXCLUDED.absent_count, \
                 late_count = EXCLUDED.late_count, \
                 is_submitted = TRUE, \
                 submitted_at = EXCLUDED.submitted_at, \
                 submitted_by = EXCLUDED.submitted_by \
             WHERE attendance_session_summaries.is_submitted = FALSE \
             RETURNING {}",
            SUMMARY_COLUMNS
        );
        sqlx::query_as::<_, SessionSummary>(&sql)
            .bind(summary.school_id)
            .bind(summary.class_id)
            .bind(summary.date)
            .bind(summary.session)
            .bind(summary.counts.total)
            .bind(summary.counts.present)
            .bind(summary.counts.absent)
            .bind(summary.counts.late)
            .bind(summary.submitted_by)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to submit session summary")
            .map_err(AppError::database)
    }
}
