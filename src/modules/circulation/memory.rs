//! In-memory circulation store for tests.
//!
//! Mirrors the conditional updates of [`super::postgres::PgCirculationRepository`]
//! under a single lock so each mutation is applied whole or not at all.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use schooldesk_core::AppResult;
use schooldesk_models::library::{
    BookCopy, Circulation, CirculationFilterParams, CirculationStatus, CopyStatus, Member,
};
use schooldesk_models::{BookCopyId, CirculationId, MemberId, SchoolId};
use tokio::sync::RwLock;

use super::repository::{CirculationRepository, IssueOutcome, LoanClosing, LoanRenewal, NewLoan};

#[derive(Debug, Default)]
struct Library {
    members: HashMap<MemberId, Member>,
    copies: HashMap<BookCopyId, BookCopy>,
    circulations: HashMap<CirculationId, Circulation>,
}

#[derive(Debug, Default)]
pub struct InMemoryCirculationRepository {
    inner: RwLock<Library>,
}

impl InMemoryCirculationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_member(&self, member: Member) {
        self.inner.write().await.members.insert(member.id, member);
    }

    pub async fn insert_copy(&self, copy: BookCopy) {
        self.inner.write().await.copies.insert(copy.id, copy);
    }

    pub async fn member(&self, id: MemberId) -> Option<Member> {
        self.inner.read().await.members.get(&id).cloned()
    }

    pub async fn copy(&self, id: BookCopyId) -> Option<BookCopy> {
        self.inner.read().await.copies.get(&id).cloned()
    }

    pub async fn open_loans_for(&self, member_id: MemberId) -> usize {
        self.inner
            .read()
            .await
            .circulations
            .values()
            .filter(|c| c.member_id == member_id && c.is_open())
            .count()
    }
}

#[async_trait]
impl CirculationRepository for InMemoryCirculationRepository {
    async fn find_member(&self, school_id: SchoolId, id: MemberId) -> AppResult<Option<Member>> {
        let library = self.inner.read().await;
        Ok(library
            .members
            .get(&id)
            .filter(|m| m.school_id == school_id)
            .cloned())
    }

    async fn find_copy(&self, school_id: SchoolId, id: BookCopyId) -> AppResult<Option<BookCopy>> {
        let library = self.inner.read().await;
        Ok(library
            .copies
            .get(&id)
            .filter(|c| c.school_id == school_id)
            .cloned())
    }

    async fn find_copy_by_accession(
        &self,
        school_id: SchoolId,
        accession_number: i64,
    ) -> AppResult<Option<BookCopy>> {
        let library = self.inner.read().await;
        Ok(library
            .copies
            .values()
            .find(|c| c.school_id == school_id && c.accession_number == accession_number)
            .cloned())
    }

    async fn find_circulation(
        &self,
        school_id: SchoolId,
        id: CirculationId,
    ) -> AppResult<Option<Circulation>> {
        let library = self.inner.read().await;
        Ok(library
            .circulations
            .get(&id)
            .filter(|c| c.school_id == school_id)
            .cloned())
    }

    async fn find_open_circulation_for_copy(
        &self,
        school_id: SchoolId,
        copy_id: BookCopyId,
    ) -> AppResult<Option<Circulation>> {
        let library = self.inner.read().await;
        Ok(library
            .circulations
            .values()
            .find(|c| c.school_id == school_id && c.copy_id == copy_id && c.is_open())
            .cloned())
    }

    async fn list_circulations(
        &self,
        school_id: SchoolId,
        filter: &CirculationFilterParams,
    ) -> AppResult<(Vec<Circulation>, i64)> {
        let library = self.inner.read().await;
        let mut matching: Vec<Circulation> = library
            .circulations
            .values()
            .filter(|c| c.school_id == school_id)
            .filter(|c| filter.member_id.is_none_or(|id| c.member_id == id))
            .filter(|c| filter.status.is_none_or(|status| c.status == status))
            .filter(|c| {
                filter
                    .overdue_on
                    .is_none_or(|date| c.is_open() && c.due_date < date)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.issue_date
                .cmp(&a.issue_date)
                .then(b.created_at.cmp(&a.created_at))
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.pagination.offset() as usize)
            .take(filter.pagination.limit() as usize)
            .collect();
        Ok((page, total))
    }

    async fn create_loan(&self, loan: NewLoan) -> AppResult<IssueOutcome> {
        let mut library = self.inner.write().await;

        let member_ok = library.members.get(&loan.member_id).is_some_and(|m| {
            m.school_id == loan.school_id
                && m.is_active
                && !m.is_blocked
                && m.current_borrowed < loan.max_books
        });
        if !member_ok {
            return Ok(IssueOutcome::MemberRejected);
        }

        let copy_ok = library
            .copies
            .get(&loan.copy_id)
            .is_some_and(|c| c.school_id == loan.school_id && c.is_loanable());
        let already_open = library
            .circulations
            .values()
            .any(|c| c.copy_id == loan.copy_id && c.is_open());
        if !copy_ok || already_open {
            return Ok(IssueOutcome::CopyRejected);
        }

        if let Some(member) = library.members.get_mut(&loan.member_id) {
            member.current_borrowed += 1;
        }
        if let Some(copy) = library.copies.get_mut(&loan.copy_id) {
            copy.status = CopyStatus::Issued;
        }

        let now = Utc::now();
        let circulation = Circulation {
            id: CirculationId::new(),
            school_id: loan.school_id,
            copy_id: loan.copy_id,
            member_id: loan.member_id,
            issue_date: loan.issue_date,
            due_date: loan.due_date,
            status: CirculationStatus::Issued,
            renewal_count: 0,
            return_date: None,
            return_condition: None,
            remarks: None,
            fine_amount: Decimal::ZERO,
            fine_paid: false,
            created_at: now,
            updated_at: now,
        };
        library
            .circulations
            .insert(circulation.id, circulation.clone());

        Ok(IssueOutcome::Issued(circulation))
    }

    async fn renew_loan(&self, renewal: LoanRenewal) -> AppResult<Option<Circulation>> {
        let mut library = self.inner.write().await;
        let Some(circulation) = library
            .circulations
            .get_mut(&renewal.circulation_id)
            .filter(|c| c.school_id == renewal.school_id)
        else {
            return Ok(None);
        };
        if !circulation.is_open() || circulation.renewal_count >= renewal.max_renewals {
            return Ok(None);
        }

        circulation.due_date = renewal.due_date;
        circulation.renewal_count += 1;
        circulation.updated_at = Utc::now();
        Ok(Some(circulation.clone()))
    }

    async fn close_loan(&self, closing: LoanClosing) -> AppResult<Option<Circulation>> {
        let mut library = self.inner.write().await;
        let Some(circulation) = library
            .circulations
            .get_mut(&closing.circulation_id)
            .filter(|c| c.school_id == closing.school_id && c.is_open())
        else {
            return Ok(None);
        };

        circulation.status = CirculationStatus::Returned;
        circulation.return_date = Some(closing.return_date);
        circulation.return_condition = Some(closing.condition);
        circulation.remarks = closing.remarks;
        circulation.fine_amount = closing.fine_amount;
        circulation.fine_paid = false;
        circulation.updated_at = Utc::now();
        let closed = circulation.clone();

        if let Some(copy) = library.copies.get_mut(&closed.copy_id) {
            copy.status = CopyStatus::Available;
        }
        if let Some(member) = library.members.get_mut(&closed.member_id) {
            member.current_borrowed = (member.current_borrowed - 1).max(0);
        }

        Ok(Some(closed))
    }

    async fn mark_fine_paid(
        &self,
        school_id: SchoolId,
        id: CirculationId,
    ) -> AppResult<Option<Circulation>> {
        let mut library = self.inner.write().await;
        let Some(circulation) = library.circulations.get_mut(&id).filter(|c| {
            c.school_id == school_id
                && c.status == CirculationStatus::Returned
                && c.fine_amount > Decimal::ZERO
                && !c.fine_paid
        }) else {
            return Ok(None);
        };

        circulation.fine_paid = true;
        circulation.updated_at = Utc::now();
        Ok(Some(circulation.clone()))
    }
}
