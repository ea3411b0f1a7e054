//! Attendance models.
//!
//! Attendance is recorded per (date, session, class). Individual marks live in
//! `attendance_records`; the submitted tally for a class lives in
//! `attendance_session_summaries` and is frozen once `is_submitted` is set.

use chrono::{DateTime, NaiveDate, Utc};
use schooldesk_core::{ErrorStatus, StatusCode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{AttendanceRecordId, ClassId, SchoolId, SessionSummaryId, StudentId, UserId};
use crate::text_enum;

text_enum!(
    Session {
        Morning => "morning",
        Afternoon => "afternoon",
    }
);

text_enum!(
    /// `LeftEarly` counts towards present in every tally.
    AttendanceStatus {
        Present => "present",
        Absent => "absent",
        Late => "late",
        LeftEarly => "left_early",
    }
);

/// Which part of the roster a sheet covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassSelection {
    All,
    Class(ClassId),
}

impl ClassSelection {
    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            Self::All => None,
            Self::Class(id) => Some(*id),
        }
    }
}

impl fmt::Display for ClassSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Class(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for ClassSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<ClassId>()
            .map(Self::Class)
            .map_err(|_| format!("'{}' is neither 'all' nor a class id", s))
    }
}

impl Serialize for ClassSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClassSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle of one (date, session, class) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unmarked,
    Drafted,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: AttendanceRecordId,
    pub school_id: SchoolId,
    pub class_id: ClassId,
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub session: Session,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub marked_by: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SessionSummary {
    pub id: SessionSummaryId,
    pub school_id: SchoolId,
    pub class_id: ClassId,
    pub date: NaiveDate,
    pub session: Session,
    pub total_students: i32,
    pub present_count: i32,
    pub absent_count: i32,
    pub late_count: i32,
    pub is_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submitted_by: Option<UserId>,
}

/// Derived tally for a sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceCounts {
    pub total: i32,
    pub present: i32,
    pub absent: i32,
    pub late: i32,
    pub unmarked: i32,
}

impl AttendanceCounts {
    /// Tallies `marks` against a roster of `total` students. `None` entries
    /// are students with no mark.
    pub fn tally<I>(total: usize, marks: I) -> Self
    where
        I: IntoIterator<Item = Option<AttendanceStatus>>,
    {
        let mut counts = Self {
            total: total as i32,
            ..Self::default()
        };
        for status in marks.into_iter().flatten() {
            match status {
                AttendanceStatus::Present | AttendanceStatus::LeftEarly => counts.present += 1,
                AttendanceStatus::Absent => counts.absent += 1,
                AttendanceStatus::Late => counts.late += 1,
            }
        }
        counts.unmarked = (counts.total - counts.present - counts.absent - counts.late).max(0);
        counts
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttendanceError {
    #[error("Select a single class before submitting")]
    NoClassSelected,

    #[error("{unmarked} student(s) have not been marked")]
    UnmarkedStudentsRemain { unmarked: i32 },

    #[error("Manual {label} count {entered} does not match the {computed} marked")]
    SummaryMismatch {
        label: &'static str,
        entered: i32,
        computed: i32,
    },

    #[error("Attendance for this session has already been submitted")]
    AlreadySubmitted,

    #[error("Student {student_id} is not on the selected roster")]
    StudentNotInRoster { student_id: StudentId },

    #[error("Student {student_id} is marked more than once")]
    DuplicateMark { student_id: StudentId },
}

impl ErrorStatus for AttendanceError {
    fn status(&self) -> StatusCode {
        match self {
            Self::AlreadySubmitted => StatusCode::CONFLICT,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MarkDto {
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SheetQuery {
    pub date: NaiveDate,
    pub session: Session,
    /// `all` or a class id
    #[param(value_type = String)]
    pub class: ClassSelection,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaveAttendanceDto {
    pub date: NaiveDate,
    pub session: Session,
    /// `all` or a class id
    #[schema(value_type = String)]
    pub class: ClassSelection,
    #[validate(nested)]
    pub marks: Vec<MarkDto>,
}

/// Head-count entered by hand, cross-checked against the marks.
#[derive(Debug, Clone, Copy, Default, Deserialize, Validate, ToSchema)]
pub struct ManualCount {
    #[validate(range(min = 0))]
    pub present: Option<i32>,
    #[validate(range(min = 0))]
    pub absent: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitAttendanceDto {
    pub date: NaiveDate,
    pub session: Session,
    /// `all` or a class id
    #[schema(value_type = String)]
    pub class: ClassSelection,
    #[validate(nested)]
    #[serde(default)]
    pub marks: Vec<MarkDto>,
    /// Students whose default mark was cleared on the desk
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub unmarked: Vec<StudentId>,
    #[validate(nested)]
    pub manual_count: Option<ManualCount>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyQuery {
    pub date: NaiveDate,
    #[param(value_type = String, format = "uuid")]
    pub class_id: ClassId,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SheetEntry {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub full_name: String,
    pub roll_number: Option<i32>,
    pub status: Option<AttendanceStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceSheetResponse {
    pub date: NaiveDate,
    pub session: Session,
    #[schema(value_type = String)]
    pub class: ClassSelection,
    pub state: SessionState,
    pub entries: Vec<SheetEntry>,
    pub counts: AttendanceCounts,
    pub summary: Option<SessionSummary>,
}

/// Both sessions of one day for one class.
#[derive(Debug, Serialize, ToSchema)]
pub struct DailyVerification {
    pub date: NaiveDate,
    pub class_id: ClassId,
    pub morning: Option<SessionSummary>,
    pub afternoon: Option<SessionSummary>,
    pub is_verified: bool,
    pub pending_sessions: Vec<Session>,
}
