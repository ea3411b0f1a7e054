use crate::middleware::school::SchoolContext;
use crate::modules::attendance::model::{
    AttendanceSheetResponse, DailyQuery, DailyVerification, SaveAttendanceDto, SessionSummary,
    SheetQuery, SubmitAttendanceDto,
};
use crate::modules::attendance::service::AttendanceService;
use crate::state::AppState;
use crate::validator::ValidatedJson;
use axum::{
    Json,
    extract::{Query, State},
};
use schooldesk_core::{AppError, ErrorResponse};
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/api/attendance/sheet",
    params(
        ("X-School-Id" = String, Header, description = "School ID"),
        SheetQuery
    ),
    responses(
        (status = 200, description = "Sheet with default-present marks and counts", body = AttendanceSheetResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Attendance"
)]
#[instrument(skip(state))]
pub async fn open_sheet(
    State(state): State<AppState>,
    ctx: SchoolContext,
    Query(query): Query<SheetQuery>,
) -> Result<Json<AttendanceSheetResponse>, AppError> {
    let sheet =
        AttendanceService::open_sheet(state.attendance_repo.as_ref(), ctx.school_id, query).await?;
    Ok(Json(sheet))
}

#[utoipa::path(
    put,
    path = "/api/attendance/sheet",
    params(
        ("X-School-Id" = String, Header, description = "School ID"),
        ("X-User-Id" = Option<String>, Header, description = "User recording the marks")
    ),
    request_body = SaveAttendanceDto,
    responses(
        (status = 200, description = "Draft saved", body = AttendanceSheetResponse),
        (status = 409, description = "Session already submitted", body = ErrorResponse),
        (status = 422, description = "Student not on roster or marked twice", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Attendance"
)]
#[instrument(skip(state, dto))]
pub async fn save_attendance(
    State(state): State<AppState>,
    ctx: SchoolContext,
    ValidatedJson(dto): ValidatedJson<SaveAttendanceDto>,
) -> Result<Json<AttendanceSheetResponse>, AppError> {
    let sheet = AttendanceService::save(
        state.attendance_repo.as_ref(),
        ctx.school_id,
        ctx.user_id,
        dto,
    )
    .await?;
    Ok(Json(sheet))
}

#[utoipa::path(
    post,
    path = "/api/attendance/submit",
    params(
        ("X-School-Id" = String, Header, description = "School ID"),
        ("X-User-Id" = Option<String>, Header, description = "User submitting the session")
    ),
    request_body = SubmitAttendanceDto,
    responses(
        (status = 200, description = "Session submitted", body = SessionSummary),
        (status = 409, description = "Session already submitted", body = ErrorResponse),
        (status = 422, description = "Unmarked students, no class selected or head-count mismatch", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Attendance"
)]
#[instrument(skip(state, dto))]
pub async fn submit_attendance(
    State(state): State<AppState>,
    ctx: SchoolContext,
    ValidatedJson(dto): ValidatedJson<SubmitAttendanceDto>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = AttendanceService::submit(
        state.attendance_repo.as_ref(),
        ctx.school_id,
        ctx.user_id,
        dto,
    )
    .await?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/attendance/daily",
    params(
        ("X-School-Id" = String, Header, description = "School ID"),
        DailyQuery
    ),
    responses(
        (status = 200, description = "Both sessions side by side", body = DailyVerification),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Attendance"
)]
#[instrument(skip(state))]
pub async fn daily_verification(
    State(state): State<AppState>,
    ctx: SchoolContext,
    Query(query): Query<DailyQuery>,
) -> Result<Json<DailyVerification>, AppError> {
    let daily = AttendanceService::daily(
        state.attendance_repo.as_ref(),
        ctx.school_id,
        query.class_id,
        query.date,
    )
    .await?;
    Ok(Json(daily))
}
