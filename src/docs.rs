use schooldesk_core::{ErrorResponse, PaginationMeta};
use utoipa::OpenApi;

use crate::modules::attendance::model::{
    AttendanceCounts, AttendanceRecord, AttendanceSheetResponse, AttendanceStatus,
    DailyVerification, ManualCount, MarkDto, SaveAttendanceDto, Session, SessionState,
    SessionSummary, SheetEntry, SubmitAttendanceDto,
};
use crate::modules::circulation::model::{
    BookCopy, Circulation, CirculationStatus, CopyStatus, Ineligibility, IssueBookDto,
    LoanPreview, Member, MemberType, PaginatedCirculationsResponse, QuickFind, RenewBookDto,
    ReturnBookDto, ReturnCondition,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::circulation::controller::issue_book,
        crate::modules::circulation::controller::list_circulations,
        crate::modules::circulation::controller::preview_circulation,
        crate::modules::circulation::controller::renew_circulation,
        crate::modules::circulation::controller::return_circulation,
        crate::modules::circulation::controller::pay_fine,
        crate::modules::circulation::controller::quick_find,
        crate::modules::attendance::controller::open_sheet,
        crate::modules::attendance::controller::save_attendance,
        crate::modules::attendance::controller::submit_attendance,
        crate::modules::attendance::controller::daily_verification,
    ),
    components(
        schemas(
            Member,
            MemberType,
            BookCopy,
            CopyStatus,
            Circulation,
            CirculationStatus,
            ReturnCondition,
            Ineligibility,
            IssueBookDto,
            RenewBookDto,
            ReturnBookDto,
            LoanPreview,
            QuickFind,
            PaginatedCirculationsResponse,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceCounts,
            Session,
            SessionState,
            SessionSummary,
            MarkDto,
            SaveAttendanceDto,
            SubmitAttendanceDto,
            ManualCount,
            SheetEntry,
            AttendanceSheetResponse,
            DailyVerification,
            PaginationMeta,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Library", description = "Issue, renew and return books, fines and accession lookup"),
        (name = "Attendance", description = "Session marking, submission and daily verification")
    ),
    info(
        title = "SchoolDesk API",
        version = "0.1.0",
        description = "Library circulation and class attendance for schools. Every request is scoped by the X-School-Id header.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;
