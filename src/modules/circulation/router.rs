use crate::modules::circulation::controller::{
    issue_book, list_circulations, pay_fine, preview_circulation, quick_find, renew_circulation,
    return_circulation,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn init_library_router() -> Router<AppState> {
    Router::new()
        .route("/circulations", post(issue_book).get(list_circulations))
        .route("/circulations/{id}", get(preview_circulation))
        .route("/circulations/{id}/renew", post(renew_circulation))
        .route("/circulations/{id}/return", post(return_circulation))
        .route("/circulations/{id}/pay-fine", post(pay_fine))
        .route("/lookup/{accession}", get(quick_find))
}
