use crate::middleware::school::SchoolContext;
use crate::modules::circulation::model::{
    Circulation, CirculationFilterParams, IssueBookDto, LoanPreview, PaginatedCirculationsResponse,
    PreviewQuery, QuickFind, RenewBookDto, ReturnBookDto,
};
use crate::modules::circulation::service::CirculationService;
use crate::modules::today;
use crate::state::AppState;
use crate::validator::ValidatedJson;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use schooldesk_core::{AppError, ErrorResponse};
use schooldesk_models::CirculationId;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/api/library/circulations",
    request_body = IssueBookDto,
    params(
        ("X-School-Id" = String, Header, description = "School ID")
    ),
    responses(
        (status = 201, description = "Book issued", body = Circulation),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Member or copy not found", body = ErrorResponse),
        (status = 422, description = "Member ineligible or copy unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Library"
)]
#[instrument(skip(state))]
pub async fn issue_book(
    State(state): State<AppState>,
    ctx: SchoolContext,
    ValidatedJson(dto): ValidatedJson<IssueBookDto>,
) -> Result<(StatusCode, Json<Circulation>), AppError> {
    let circulation = CirculationService::issue(
        state.circulation_repo.as_ref(),
        &state.library_policy,
        ctx.school_id,
        dto,
        today(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(circulation)))
}

#[utoipa::path(
    get,
    path = "/api/library/circulations",
    params(
        ("X-School-Id" = String, Header, description = "School ID"),
        CirculationFilterParams
    ),
    responses(
        (status = 200, description = "Circulation ledger page", body = PaginatedCirculationsResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Library"
)]
#[instrument(skip(state))]
pub async fn list_circulations(
    State(state): State<AppState>,
    ctx: SchoolContext,
    Query(filter): Query<CirculationFilterParams>,
) -> Result<Json<PaginatedCirculationsResponse>, AppError> {
    let page =
        CirculationService::list(state.circulation_repo.as_ref(), ctx.school_id, filter).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/library/circulations/{id}",
    params(
        ("id" = String, Path, description = "Circulation ID"),
        ("X-School-Id" = String, Header, description = "School ID"),
        PreviewQuery
    ),
    responses(
        (status = 200, description = "Loan with overdue days and projected fine", body = LoanPreview),
        (status = 404, description = "Circulation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Library"
)]
#[instrument(skip(state))]
pub async fn preview_circulation(
    State(state): State<AppState>,
    ctx: SchoolContext,
    Path(id): Path<CirculationId>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<LoanPreview>, AppError> {
    let preview = CirculationService::preview(
        state.circulation_repo.as_ref(),
        &state.library_policy,
        ctx.school_id,
        id,
        query.as_of.unwrap_or_else(today),
    )
    .await?;
    Ok(Json(preview))
}

#[utoipa::path(
    post,
    path = "/api/library/circulations/{id}/renew",
    params(
        ("id" = String, Path, description = "Circulation ID"),
        ("X-School-Id" = String, Header, description = "School ID")
    ),
    request_body = RenewBookDto,
    responses(
        (status = 200, description = "Loan renewed", body = Circulation),
        (status = 404, description = "Circulation not found", body = ErrorResponse),
        (status = 422, description = "Renewal limit reached or loan already returned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Library"
)]
#[instrument(skip(state))]
pub async fn renew_circulation(
    State(state): State<AppState>,
    ctx: SchoolContext,
    Path(id): Path<CirculationId>,
    ValidatedJson(dto): ValidatedJson<RenewBookDto>,
) -> Result<Json<Circulation>, AppError> {
    let renewed = CirculationService::renew(
        state.circulation_repo.as_ref(),
        &state.library_policy,
        ctx.school_id,
        id,
        dto.renewal_date.unwrap_or_else(today),
    )
    .await?;
    Ok(Json(renewed))
}

#[utoipa::path(
    post,
    path = "/api/library/circulations/{id}/return",
    params(
        ("id" = String, Path, description = "Circulation ID"),
        ("X-School-Id" = String, Header, description = "School ID")
    ),
    request_body = ReturnBookDto,
    responses(
        (status = 200, description = "Book returned, fine recorded", body = Circulation),
        (status = 404, description = "Circulation not found", body = ErrorResponse),
        (status = 422, description = "Loan already returned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Library"
)]
#[instrument(skip(state))]
pub async fn return_circulation(
    State(state): State<AppState>,
    ctx: SchoolContext,
    Path(id): Path<CirculationId>,
    ValidatedJson(dto): ValidatedJson<ReturnBookDto>,
) -> Result<Json<Circulation>, AppError> {
    let returned = CirculationService::return_book(
        state.circulation_repo.as_ref(),
        &state.library_policy,
        ctx.school_id,
        id,
        dto,
        today(),
    )
    .await?;
    Ok(Json(returned))
}

#[utoipa::path(
    post,
    path = "/api/library/circulations/{id}/pay-fine",
    params(
        ("id" = String, Path, description = "Circulation ID"),
        ("X-School-Id" = String, Header, description = "School ID")
    ),
    responses(
        (status = 200, description = "Fine marked as paid", body = Circulation),
        (status = 404, description = "Circulation not found", body = ErrorResponse),
        (status = 422, description = "No unpaid fine", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Library"
)]
#[instrument(skip(state))]
pub async fn pay_fine(
    State(state): State<AppState>,
    ctx: SchoolContext,
    Path(id): Path<CirculationId>,
) -> Result<Json<Circulation>, AppError> {
    let paid =
        CirculationService::pay_fine(state.circulation_repo.as_ref(), ctx.school_id, id).await?;
    Ok(Json(paid))
}

#[utoipa::path(
    get,
    path = "/api/library/lookup/{accession}",
    params(
        ("accession" = String, Path, description = "Accession number as scanned"),
        ("X-School-Id" = String, Header, description = "School ID")
    ),
    responses(
        (status = 200, description = "Issue or return route for the copy", body = QuickFind),
        (status = 404, description = "No copy with that accession number", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Library"
)]
#[instrument(skip(state))]
pub async fn quick_find(
    State(state): State<AppState>,
    ctx: SchoolContext,
    Path(accession): Path<String>,
) -> Result<Json<QuickFind>, AppError> {
    let found =
        CirculationService::quick_find(state.circulation_repo.as_ref(), ctx.school_id, &accession)
            .await?;
    Ok(Json(found))
}
