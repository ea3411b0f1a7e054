//! Library circulation models.
//!
//! A [`Member`] borrows a [`BookCopy`] through a [`Circulation`]. The
//! circulation is the only record the engine writes; member counters and copy
//! status move in the same transaction as the circulation row.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use schooldesk_core::{ErrorStatus, PaginationMeta, PaginationParams, StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{BookCopyId, CirculationId, MemberId, SchoolId};
use crate::text_enum;

text_enum!(
    /// Borrower category; selects the loan rules applied.
    MemberType {
        Student => "student",
        Staff => "staff",
    }
);

text_enum!(
    CopyStatus {
        Available => "available",
        Issued => "issued",
        Withdrawn => "withdrawn",
        Reference => "reference",
    }
);

text_enum!(
    CirculationStatus {
        Issued => "issued",
        Returned => "returned",
    }
);

text_enum!(
    ReturnCondition {
        Good => "good",
        Damaged => "damaged",
        Lost => "lost",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: MemberId,
    pub school_id: SchoolId,
    pub full_name: String,
    pub member_type: MemberType,
    pub current_borrowed: i32,
    pub is_active: bool,
    pub is_blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: BookCopyId,
    pub school_id: SchoolId,
    pub accession_number: i64,
    pub call_number: String,
    pub title: String,
    pub status: CopyStatus,
    pub is_reference: bool,
}

impl BookCopy {
    /// Reference copies never circulate, whatever their status says.
    pub fn is_loanable(&self) -> bool {
        !self.is_reference && self.status == CopyStatus::Available
    }
}

/// One loan, from issue to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Circulation {
    pub id: CirculationId,
    pub school_id: SchoolId,
    pub copy_id: BookCopyId,
    pub member_id: MemberId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: CirculationStatus,
    pub renewal_count: i32,
    pub return_date: Option<NaiveDate>,
    pub return_condition: Option<ReturnCondition>,
    pub remarks: Option<String>,
    pub fine_amount: Decimal,
    pub fine_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Circulation {
    pub fn is_open(&self) -> bool {
        self.status == CirculationStatus::Issued
    }

    /// Whole days past `due_date` on `today`, never negative.
    pub fn overdue_days(&self, today: NaiveDate) -> i64 {
        (today - self.due_date).num_days().max(0)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligibility {
    Inactive,
    Blocked,
    LimitReached { max_books: i32 },
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "membership is inactive"),
            Self::Blocked => write!(f, "membership is blocked"),
            Self::LimitReached { max_books } => {
                write!(f, "already holding the maximum of {} books", max_books)
            }
        }
    }
}

/// Rule violations raised by the circulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CirculationError {
    #[error("Member cannot borrow: {0}")]
    IneligibleMember(Ineligibility),

    #[error("Copy {accession_number} is not available for loan (status: {status}{})", if *.is_reference { ", reference only" } else { "" })]
    CopyUnavailable {
        accession_number: i64,
        status: CopyStatus,
        is_reference: bool,
    },

    #[error("Renewal limit of {max_renewals} reached")]
    RenewalLimitExceeded { max_renewals: i32 },

    #[error("Circulation has already been returned")]
    NotIssued,

    #[error("No unpaid fine on this circulation")]
    NoOutstandingFine,

    #[error("Cannot {action} on {date}: the loan was issued on {issue_date}")]
    DatedBeforeIssue {
        action: &'static str,
        date: NaiveDate,
        issue_date: NaiveDate,
    },

    #[error("Renewing on {renewal_date} would bring the due date forward from {due_date}")]
    RenewalShortensLoan {
        renewal_date: NaiveDate,
        due_date: NaiveDate,
    },
}

impl ErrorStatus for CirculationError {
    fn status(&self) -> StatusCode {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueBookDto {
    pub copy_id: BookCopyId,
    pub member_id: MemberId,
    /// Defaults to today
    pub issue_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RenewBookDto {
    /// Defaults to today
    pub renewal_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnBookDto {
    pub condition: ReturnCondition,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
    /// Defaults to today
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CirculationFilterParams {
    pub member_id: Option<MemberId>,
    pub status: Option<CirculationStatus>,
    /// Only open loans whose due date is before this date
    pub overdue_on: Option<NaiveDate>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedCirculationsResponse {
    pub data: Vec<Circulation>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// Defaults to today
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanPreview {
    pub circulation: Circulation,
    pub as_of: NaiveDate,
    pub overdue_days: i64,
    /// Fine a return on `as_of` would record
    pub fine_if_returned: Decimal,
    pub renewals_remaining: i32,
    pub can_renew: bool,
}

/// Where an accession-number scan should take the librarian.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum QuickFind {
    Issue { copy: BookCopy },
    Return { copy: BookCopy, circulation: Circulation },
}
