use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schooldesk_core::AppResult;
use schooldesk_models::library::{
    BookCopy, Circulation, CirculationFilterParams, Member, ReturnCondition,
};
use schooldesk_models::{BookCopyId, CirculationId, MemberId, SchoolId};

/// Row to insert when a copy is issued.
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub school_id: SchoolId,
    pub copy_id: BookCopyId,
    pub member_id: MemberId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Member limit enforced by the conditional counter increment
    pub max_books: i32,
}

#[derive(Debug)]
pub enum IssueOutcome {
    Issued(Circulation),
    /// Member row was inactive, blocked or at `max_books` when the update ran.
    MemberRejected,
    /// Copy row was no longer available when the update ran.
    CopyRejected,
}

#[derive(Debug, Clone)]
pub struct LoanRenewal {
    pub school_id: SchoolId,
    pub circulation_id: CirculationId,
    pub due_date: NaiveDate,
    pub max_renewals: i32,
}

#[derive(Debug, Clone)]
pub struct LoanClosing {
    pub school_id: SchoolId,
    pub circulation_id: CirculationId,
    pub return_date: NaiveDate,
    pub condition: ReturnCondition,
    pub remarks: Option<String>,
    pub fine_amount: Decimal,
}

/// Record store behind the circulation engine.
///
/// Mutating methods return `None` (or a rejected [`IssueOutcome`]) when the
/// row no longer satisfies the precondition at write time. They never partially
/// apply: circulation row, copy status and member counter move together.
#[async_trait]
pub trait CirculationRepository: Send + Sync {
    async fn find_member(&self, school_id: SchoolId, id: MemberId) -> AppResult<Option<Member>>;

    async fn find_copy(&self, school_id: SchoolId, id: BookCopyId) -> AppResult<Option<BookCopy>>;

    async fn find_copy_by_accession(
        &self,
        school_id: SchoolId,
        accession_number: i64,
    ) -> AppResult<Option<BookCopy>>;

    async fn find_circulation(
        &self,
        school_id: SchoolId,
        id: CirculationId,
    ) -> AppResult<Option<Circulation>>;

    async fn find_open_circulation_for_copy(
        &self,
        school_id: SchoolId,
        copy_id: BookCopyId,
    ) -> AppResult<Option<Circulation>>;

    /// One page of the ledger, newest issue first, plus the unpaged total.
    async fn list_circulations(
        &self,
        school_id: SchoolId,
        filter: &CirculationFilterParams,
    ) -> AppResult<(Vec<Circulation>, i64)>;

    async fn create_loan(&self, loan: NewLoan) -> AppResult<IssueOutcome>;

    /// Applies only while the loan is open and under `max_renewals`.
    async fn renew_loan(&self, renewal: LoanRenewal) -> AppResult<Option<Circulation>>;

    /// Applies only while the loan is open.
    async fn close_loan(&self, closing: LoanClosing) -> AppResult<Option<Circulation>>;

    /// Applies only to a returned loan with an unpaid, positive fine.
    async fn mark_fine_paid(
        &self,
        school_id: SchoolId,
        id: CirculationId,
    ) -> AppResult<Option<Circulation>>;
}
