use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use schooldesk_core::AppError;
use schooldesk_models::{SchoolId, UserId};

pub const SCHOOL_ID_HEADER: &str = "x-school-id";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Tenant and actor for a request.
///
/// `X-School-Id` is required on every library and attendance route;
/// `X-User-Id` is optional and recorded as `marked_by` / `submitted_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchoolContext {
    pub school_id: SchoolId,
    pub user_id: Option<UserId>,
}

impl SchoolContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let school_id = headers
            .get(SCHOOL_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::bad_request(anyhow::anyhow!("Missing X-School-Id header")))?
            .trim()
            .parse::<SchoolId>()
            .map_err(|_| AppError::bad_request(anyhow::anyhow!("Invalid X-School-Id header")))?;

        let user_id = match headers.get(USER_ID_HEADER) {
            None => None,
            Some(value) => Some(
                value
                    .to_str()
                    .ok()
                    .and_then(|v| v.trim().parse::<UserId>().ok())
                    .ok_or_else(|| {
                        AppError::bad_request(anyhow::anyhow!("Invalid X-User-Id header"))
                    })?,
            ),
        };

        Ok(Self { school_id, user_id })
    }
}

impl<S> FromRequestParts<S> for SchoolContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
