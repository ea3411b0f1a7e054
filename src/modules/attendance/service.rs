use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use schooldesk_core::{AppError, AppResult};
use schooldesk_models::attendance::{
    AttendanceError, AttendanceSheetResponse, ClassSelection, DailyVerification, ManualCount,
    SaveAttendanceDto, Session, SessionState, SessionSummary, SheetQuery, SubmitAttendanceDto,
};
use schooldesk_models::{ClassId, SchoolId, StudentId, UserId};
use tracing::{info, instrument, warn};

use super::repository::{AttendanceRepository, NewAttendanceRecord, NewSessionSummary};
use super::sheet::{AttendanceSheet, SheetKey};
use crate::metrics;

pub struct AttendanceService;

impl AttendanceService {
    /// Sheet for a key: everyone present unless saved otherwise.
    #[instrument(skip(repo))]
    pub async fn open_sheet(
        repo: &dyn AttendanceRepository,
        school_id: SchoolId,
        query: SheetQuery,
    ) -> AppResult<AttendanceSheetResponse> {
        let key = SheetKey {
            date: query.date,
            session: query.session,
            class: query.class,
        };
        let roster = repo.roster(school_id, key.class).await?;
        let ids: Vec<StudentId> = roster.iter().map(|s| s.id).collect();
        let saved = repo
            .find_records(school_id, key.date, key.session, &ids)
            .await?;

        let summary = match key.class {
            ClassSelection::Class(class_id) => {
                repo.find_summary(school_id, class_id, key.date, key.session)
                    .await?
            }
            ClassSelection::All => None,
        };
        let state = match &summary {
            Some(s) if s.is_submitted => SessionState::Submitted,
            _ if !saved.is_empty() => SessionState::Drafted,
            _ => SessionState::Unmarked,
        };

        let sheet = AttendanceSheet::initialize(key, roster, &saved);
        Ok(AttendanceSheetResponse {
            date: key.date,
            session: key.session,
            class: key.class,
            state,
            entries: sheet.entries(),
            counts: sheet.counts(),
            summary,
        })
    }

    /// Persists draft marks. Never touches the session summary.
    #[instrument(skip(repo, dto), fields(marks = dto.marks.len()))]
    pub async fn save(
        repo: &dyn AttendanceRepository,
        school_id: SchoolId,
        marked_by: Option<UserId>,
        dto: SaveAttendanceDto,
    ) -> AppResult<AttendanceSheetResponse> {
        let key = SheetKey {
            date: dto.date,
            session: dto.session,
            class: dto.class,
        };
        let roster = repo.roster(school_id, key.class).await?;
        let mut sheet = AttendanceSheet::initialize(key, roster, &[]);
        sheet.apply(&dto.marks).map_err(AppError::domain)?;

        let touched: BTreeSet<ClassId> = dto
            .marks
            .iter()
            .filter_map(|m| sheet.student(m.student_id).map(|s| s.class_id))
            .collect();
        for class_id in touched {
            Self::ensure_open(repo, school_id, class_id, key).await?;
        }

        let marked: Vec<StudentId> = dto.marks.iter().map(|m| m.student_id).collect();
        let records = Self::records_for(&sheet, school_id, marked_by, &marked);
        let written = repo.upsert_records(&records).await?;
        info!(written, date = %key.date, session = %key.session, class = %key.class, "Attendance saved");
        metrics::track_attendance_saved(written);

        Self::open_sheet(
            repo,
            school_id,
            SheetQuery {
                date: key.date,
                session: key.session,
                class: key.class,
            },
        )
        .await
    }

    /// Gates, then commits the marks and the frozen summary.
    ///
    /// The sheet is the one `open_sheet` shows: everyone present by default,
    /// saved drafts on top, then the request's marks and clears. Gate order:
    /// unmarked students, single class, manual head-count.
    #[instrument(skip(repo, dto), fields(marks = dto.marks.len()))]
    pub async fn submit(
        repo: &dyn AttendanceRepository,
        school_id: SchoolId,
        submitted_by: Option<UserId>,
        dto: SubmitAttendanceDto,
    ) -> AppResult<SessionSummary> {
        let key = SheetKey {
            date: dto.date,
            session: dto.session,
            class: dto.class,
        };
        let roster = repo.roster(school_id, key.class).await?;
        let ids: Vec<StudentId> = roster.iter().map(|s| s.id).collect();
        let saved = repo
            .find_records(school_id, key.date, key.session, &ids)
            .await?;

        let mut sheet = AttendanceSheet::initialize(key, roster, &saved);
        sheet.apply(&dto.marks).map_err(AppError::domain)?;
        sheet.clear(&dto.unmarked).map_err(AppError::domain)?;
        let counts = sheet.counts();

        let gate = if counts.unmarked > 0 {
            Err(AttendanceError::UnmarkedStudentsRemain {
                unmarked: counts.unmarked,
            })
        } else {
            match key.class {
                ClassSelection::All => Err(AttendanceError::NoClassSelected),
                ClassSelection::Class(class_id) => {
                    check_manual_count(dto.manual_count, counts.present, counts.absent)
                        .map(|_| class_id)
                }
            }
        };
        let class_id = match gate {
            Ok(class_id) => class_id,
            Err(err) => {
                warn!(error = %err, date = %key.date, session = %key.session, "Submission rejected");
                metrics::track_attendance_rejected(rejection_label(&err));
                return Err(AppError::domain(err));
            }
        };

        Self::ensure_open(repo, school_id, class_id, key).await?;

        // Defaults and fresh marks are stored so the records match the summary.
        // Saved drafts the request did not touch keep their original marker.
        let already_saved: HashSet<StudentId> = saved.iter().map(|r| r.student_id).collect();
        let requested: HashSet<StudentId> = dto.marks.iter().map(|m| m.student_id).collect();
        let to_write: Vec<StudentId> = sheet
            .roster()
            .iter()
            .map(|s| s.id)
            .filter(|id| requested.contains(id) || !already_saved.contains(id))
            .collect();
        let records = Self::records_for(&sheet, school_id, submitted_by, &to_write);
        if !records.is_empty() {
            repo.upsert_records(&records).await?;
        }

        let summary = repo
            .submit_summary(NewSessionSummary {
                school_id,
                class_id,
                date: key.date,
                session: key.session,
                counts,
                submitted_by,
            })
            .await?
            .ok_or_else(|| AppError::domain(AttendanceError::AlreadySubmitted))?;

        info!(
            class_id = %class_id,
            date = %key.date,
            session = %key.session,
            present = counts.present,
            absent = counts.absent,
            late = counts.late,
            "Attendance submitted"
        );
        metrics::track_attendance_submitted(key.session);
        Ok(summary)
    }

    /// Morning and afternoon summaries for one class on one day.
    #[instrument(skip(repo))]
    pub async fn daily(
        repo: &dyn AttendanceRepository,
        school_id: SchoolId,
        class_id: ClassId,
        date: NaiveDate,
    ) -> AppResult<DailyVerification> {
        let summaries = repo.summaries_for_day(school_id, class_id, date).await?;
        let submitted = |session: Session| {
            summaries
                .iter()
                .find(|s| s.session == session && s.is_submitted)
                .cloned()
        };

        let morning = submitted(Session::Morning);
        let afternoon = submitted(Session::Afternoon);
        let pending_sessions: Vec<Session> = [(Session::Morning, &morning), (Session::Afternoon, &afternoon)]
            .into_iter()
            .filter(|(_, summary)| summary.is_none())
            .map(|(session, _)| session)
            .collect();

        Ok(DailyVerification {
            date,
            class_id,
            is_verified: pending_sessions.is_empty(),
            pending_sessions,
            morning,
            afternoon,
        })
    }

    async fn ensure_open(
        repo: &dyn AttendanceRepository,
        school_id: SchoolId,
        class_id: ClassId,
        key: SheetKey,
    ) -> AppResult<()> {
        let summary = repo
            .find_summary(school_id, class_id, key.date, key.session)
            .await?;
        if summary.is_some_and(|s| s.is_submitted) {
            return Err(AppError::domain(AttendanceError::AlreadySubmitted));
        }
        Ok(())
    }

    fn records_for(
        sheet: &AttendanceSheet,
        school_id: SchoolId,
        marked_by: Option<UserId>,
        students: &[StudentId],
    ) -> Vec<NewAttendanceRecord> {
        let key = sheet.key();
        students
            .iter()
            .filter_map(|&id| {
                let student = sheet.student(id)?;
                let mark = sheet.mark_of(id)?;
                Some(NewAttendanceRecord {
                    school_id,
                    class_id: student.class_id,
                    student_id: student.id,
                    date: key.date,
                    session: key.session,
                    status: mark.status,
                    reason: mark.reason.clone(),
                    notes: mark.notes.clone(),
                    marked_by,
                })
            })
            .collect()
    }
}

/// Compares a hand count with the computed tally. Omitted figures are not checked.
pub fn check_manual_count(
    manual: Option<ManualCount>,
    present: i32,
    absent: i32,
) -> Result<(), AttendanceError> {
    let Some(manual) = manual else {
        return Ok(());
    };
    for (label, entered, computed) in [
        ("present", manual.present, present),
        ("absent", manual.absent, absent),
    ] {
        if let Some(entered) = entered {
            if entered != computed {
                return Err(AttendanceError::SummaryMismatch {
                    label,
                    entered,
                    computed,
                });
            }
        }
    }
    Ok(())
}

fn rejection_label(err: &AttendanceError) -> &'static str {
    match err {
        AttendanceError::NoClassSelected => "no_class_selected",
        AttendanceError::UnmarkedStudentsRemain { .. } => "unmarked_students",
        AttendanceError::SummaryMismatch { .. } => "summary_mismatch",
        AttendanceError::AlreadySubmitted => "already_submitted",
        AttendanceError::StudentNotInRoster { .. } => "student_not_in_roster",
        AttendanceError::DuplicateMark { .. } => "duplicate_mark",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::attendance::memory::InMemoryAttendanceRepository;
    use schooldesk_core::StatusCode;
    use schooldesk_models::attendance::{AttendanceStatus, MarkDto};
    use schooldesk_models::roster::{RosterStudent, SchoolClass};

    struct Register {
        repo: InMemoryAttendanceRepository,
        school_id: SchoolId,
        class_id: ClassId,
        students: Vec<StudentId>,
    }

    impl Register {
        async fn with_class_of(size: usize) -> Self {
            let repo = InMemoryAttendanceRepository::new();
            let school_id = SchoolId::new();
            let class_id = ClassId::new();
            repo.insert_class(SchoolClass {
                id: class_id,
                school_id,
                name: "JSS 1A".into(),
            })
            .await;

            let mut students = Vec::with_capacity(size);
            for i in 0..size {
                let student = RosterStudent {
                    id: StudentId::new(),
                    school_id,
                    class_id,
                    first_name: format!("Pupil{}", i),
                    last_name: "Bello".into(),
                    roll_number: Some(i as i32 + 1),
                };
                students.push(student.id);
                repo.insert_student(student).await;
            }

            Self {
                repo,
                school_id,
                class_id,
                students,
            }
        }

        fn marks(&self, statuses: &[AttendanceStatus]) -> Vec<MarkDto> {
            self.students
                .iter()
                .zip(statuses)
                .map(|(id, status)| MarkDto {
                    student_id: *id,
                    status: *status,
                    reason: None,
                    notes: None,
                })
                .collect()
        }

        fn submission(
            &self,
            class: ClassSelection,
            marks: Vec<MarkDto>,
            manual_count: Option<ManualCount>,
        ) -> SubmitAttendanceDto {
            SubmitAttendanceDto {
                date: day(),
                session: Session::Morning,
                class,
                marks,
                unmarked: vec![],
                manual_count,
            }
        }

        async fn submit(&self, dto: SubmitAttendanceDto) -> AppResult<SessionSummary> {
            AttendanceService::submit(&self.repo, self.school_id, None, dto).await
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 16).unwrap()
    }

    fn attendance_error(err: &AppError) -> Option<&AttendanceError> {
        err.downcast_ref::<AttendanceError>()
    }

    #[tokio::test]
    async fn test_open_unseen_key_is_all_present() {
        let register = Register::with_class_of(30).await;
        let sheet = AttendanceService::open_sheet(
            &register.repo,
            register.school_id,
            SheetQuery {
                date: day(),
                session: Session::Morning,
                class: ClassSelection::Class(register.class_id),
            },
        )
        .await
        .unwrap();

        assert_eq!(sheet.state, SessionState::Unmarked);
        assert_eq!(sheet.counts.present, 30);
        assert_eq!(sheet.counts.unmarked, 0);
        assert!(sheet.summary.is_none());
    }

    #[tokio::test]
    async fn test_save_drafts_without_summary() {
        let register = Register::with_class_of(2).await;
        let dto = SaveAttendanceDto {
            date: day(),
            session: Session::Afternoon,
            class: ClassSelection::All,
            marks: register.marks(&[AttendanceStatus::Absent]),
        };
        let sheet = AttendanceService::save(&register.repo, register.school_id, None, dto)
            .await
            .unwrap();

        assert_eq!(sheet.state, SessionState::Drafted);
        assert_eq!(sheet.counts.absent, 1);
        assert_eq!(sheet.counts.present, 1);
        assert_eq!(register.repo.record_count().await, 1);
        let daily = AttendanceService::daily(&register.repo, register.school_id, register.class_id, day())
            .await
            .unwrap();
        assert!(daily.afternoon.is_none());
    }

    #[tokio::test]
    async fn test_a_b_c_submission() {
        let register = Register::with_class_of(3).await;
        let marks = register.marks(&[
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
            AttendanceStatus::Late,
        ]);
        let summary = register
            .submit(register.submission(ClassSelection::Class(register.class_id), marks, None))
            .await
            .unwrap();

        assert!(summary.is_submitted);
        assert!(summary.submitted_at.is_some());
        assert_eq!(
            (summary.present_count, summary.absent_count, summary.late_count),
            (1, 1, 1)
        );
        assert_eq!(summary.total_students, 3);
    }

    #[tokio::test]
    async fn test_manual_count_mismatch_is_rejected() {
        let register = Register::with_class_of(25).await;
        let mut statuses = vec![AttendanceStatus::Present; 24];
        statuses.push(AttendanceStatus::Absent);
        let manual = ManualCount {
            present: Some(25),
            absent: None,
        };
        let err = register
            .submit(register.submission(
                ClassSelection::Class(register.class_id),
                register.marks(&statuses),
                Some(manual),
            ))
            .await
            .unwrap_err();

        assert_eq!(
            attendance_error(&err),
            Some(&AttendanceError::SummaryMismatch {
                label: "present",
                entered: 25,
                computed: 24,
            })
        );
        assert_eq!(register.repo.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_matching_manual_count_submits() {
        let register = Register::with_class_of(4).await;
        let statuses = [
            AttendanceStatus::Present,
            AttendanceStatus::LeftEarly,
            AttendanceStatus::Absent,
            AttendanceStatus::Late,
        ];
        let manual = ManualCount {
            present: Some(2),
            absent: Some(1),
        };
        let summary = register
            .submit(register.submission(
                ClassSelection::Class(register.class_id),
                register.marks(&statuses),
                Some(manual),
            ))
            .await
            .unwrap();
        assert_eq!(summary.present_count, 2);
    }

    #[tokio::test]
    async fn test_unmarked_rejected_regardless_of_class() {
        let register = Register::with_class_of(3).await;
        for class in [ClassSelection::All, ClassSelection::Class(register.class_id)] {
            let marks = register.marks(&[AttendanceStatus::Present, AttendanceStatus::Present]);
            let mut dto = register.submission(class, marks, None);
            dto.unmarked = vec![register.students[2]];
            let err = register.submit(dto).await.unwrap_err();
            assert_eq!(
                attendance_error(&err),
                Some(&AttendanceError::UnmarkedStudentsRemain { unmarked: 1 })
            );
        }
    }

    #[tokio::test]
    async fn test_all_classes_cannot_be_submitted() {
        let register = Register::with_class_of(1).await;
        let marks = register.marks(&[AttendanceStatus::Present]);
        let err = register
            .submit(register.submission(ClassSelection::All, marks, None))
            .await
            .unwrap_err();
        assert_eq!(attendance_error(&err), Some(&AttendanceError::NoClassSelected));
    }

    #[tokio::test]
    async fn test_resubmission_conflicts() {
        let register = Register::with_class_of(1).await;
        let class = ClassSelection::Class(register.class_id);
        register
            .submit(register.submission(class, register.marks(&[AttendanceStatus::Present]), None))
            .await
            .unwrap();

        let err = register
            .submit(register.submission(class, register.marks(&[AttendanceStatus::Absent]), None))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(attendance_error(&err), Some(&AttendanceError::AlreadySubmitted));
    }

    #[tokio::test]
    async fn test_saved_drafts_count_at_submit() {
        let register = Register::with_class_of(2).await;
        let save = SaveAttendanceDto {
            date: day(),
            session: Session::Morning,
            class: ClassSelection::Class(register.class_id),
            marks: register.marks(&[AttendanceStatus::Late, AttendanceStatus::Absent]),
        };
        AttendanceService::save(&register.repo, register.school_id, None, save)
            .await
            .unwrap();

        let summary = register
            .submit(register.submission(ClassSelection::Class(register.class_id), vec![], None))
            .await
            .unwrap();
        assert_eq!((summary.late_count, summary.absent_count), (1, 1));
    }

    #[tokio::test]
    async fn test_submit_after_saving_only_exceptions() {
        let register = Register::with_class_of(3).await;
        let class = ClassSelection::Class(register.class_id);
        let query = || SheetQuery {
            date: day(),
            session: Session::Morning,
            class,
        };

        let opened = AttendanceService::open_sheet(&register.repo, register.school_id, query())
            .await
            .unwrap();
        assert_eq!((opened.counts.present, opened.counts.unmarked), (3, 0));

        let save = SaveAttendanceDto {
            date: day(),
            session: Session::Morning,
            class,
            marks: vec![MarkDto {
                student_id: register.students[1],
                status: AttendanceStatus::Absent,
                reason: Some("sick".into()),
                notes: None,
            }],
        };
        let drafted = AttendanceService::save(&register.repo, register.school_id, None, save)
            .await
            .unwrap();
        assert_eq!(
            (drafted.counts.present, drafted.counts.absent, drafted.counts.unmarked),
            (2, 1, 0)
        );

        let summary = register
            .submit(register.submission(class, vec![], None))
            .await
            .unwrap();
        assert_eq!((summary.present_count, summary.absent_count), (2, 1));
        assert_eq!(register.repo.record_count().await, 3);

        let submitted = AttendanceService::open_sheet(&register.repo, register.school_id, query())
            .await
            .unwrap();
        assert_eq!(submitted.state, SessionState::Submitted);
        assert_eq!(submitted.entries[1].reason.as_deref(), Some("sick"));
    }

    #[tokio::test]
    async fn test_clearing_unknown_student_is_rejected() {
        let register = Register::with_class_of(1).await;
        let mut dto = register.submission(ClassSelection::Class(register.class_id), vec![], None);
        let stranger = StudentId::new();
        dto.unmarked = vec![stranger];

        let err = register.submit(dto).await.unwrap_err();
        assert_eq!(
            attendance_error(&err),
            Some(&AttendanceError::StudentNotInRoster { student_id: stranger })
        );
        assert_eq!(register.repo.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_daily_verified_only_with_both_sessions() {
        let register = Register::with_class_of(1).await;
        let class = ClassSelection::Class(register.class_id);
        register
            .submit(register.submission(class, register.marks(&[AttendanceStatus::Present]), None))
            .await
            .unwrap();

        let daily = AttendanceService::daily(&register.repo, register.school_id, register.class_id, day())
            .await
            .unwrap();
        assert!(!daily.is_verified);
        assert_eq!(daily.pending_sessions, vec![Session::Afternoon]);

        let mut afternoon = register.submission(class, register.marks(&[AttendanceStatus::Absent]), None);
        afternoon.session = Session::Afternoon;
        register.submit(afternoon).await.unwrap();

        let daily = AttendanceService::daily(&register.repo, register.school_id, register.class_id, day())
            .await
            .unwrap();
        assert!(daily.is_verified);
        assert!(daily.pending_sessions.is_empty());
        assert_eq!(daily.morning.map(|s| s.present_count), Some(1));
        assert_eq!(daily.afternoon.map(|s| s.absent_count), Some(1));
    }

    #[test]
    fn test_check_manual_count() {
        assert!(check_manual_count(None, 24, 1).is_ok());
        assert!(check_manual_count(Some(ManualCount::default()), 24, 1).is_ok());
        assert!(
            check_manual_count(
                Some(ManualCount {
                    present: Some(24),
                    absent: Some(1)
                }),
                24,
                1
            )
            .is_ok()
        );
        assert_eq!(
            check_manual_count(
                Some(ManualCount {
                    present: None,
                    absent: Some(2)
                }),
                24,
                1
            ),
            Err(AttendanceError::SummaryMismatch {
                label: "absent",
                entered: 2,
                computed: 1
            })
        );
    }
}
