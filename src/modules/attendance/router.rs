use crate::modules::attendance::controller::{
    daily_verification, open_sheet, save_attendance, submit_attendance,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/sheet", get(open_sheet).put(save_attendance))
        .route("/submit", post(submit_attendance))
        .route("/daily", get(daily_verification))
}
