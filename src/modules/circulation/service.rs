use anyhow::anyhow;
use chrono::NaiveDate;
use schooldesk_config::LibraryPolicy;
use schooldesk_core::{AppError, AppResult, PaginationMeta};
use schooldesk_models::library::{
    BookCopy, Circulation, CirculationError, CirculationFilterParams, Ineligibility, IssueBookDto,
    LoanPreview, Member, PaginatedCirculationsResponse, QuickFind, ReturnBookDto,
};
use schooldesk_models::{BookCopyId, CirculationId, MemberId, SchoolId};
use tracing::{info, instrument, warn};

use super::repository::{CirculationRepository, IssueOutcome, LoanClosing, LoanRenewal, NewLoan};
use super::rules;
use crate::metrics;

pub struct CirculationService;

impl CirculationService {
    #[instrument(skip(repo, policy))]
    pub async fn issue(
        repo: &dyn CirculationRepository,
        policy: &LibraryPolicy,
        school_id: SchoolId,
        dto: IssueBookDto,
        today: NaiveDate,
    ) -> AppResult<Circulation> {
        let member = Self::member(repo, school_id, dto.member_id).await?;
        let copy = Self::copy(repo, school_id, dto.copy_id).await?;
        let issue_date = dto.issue_date.unwrap_or(today);

        let loan_rules = rules::rules_for(policy, member.member_type);
        rules::ensure_member_can_borrow(&member, loan_rules).map_err(AppError::domain)?;
        rules::ensure_copy_loanable(&copy).map_err(AppError::domain)?;

        let loan = NewLoan {
            school_id,
            copy_id: copy.id,
            member_id: member.id,
            issue_date,
            due_date: rules::due_date(issue_date, loan_rules),
            max_books: loan_rules.max_books,
        };

        match repo.create_loan(loan).await? {
            IssueOutcome::Issued(circulation) => {
                info!(
                    circulation_id = %circulation.id,
                    accession_number = copy.accession_number,
                    member_id = %member.id,
                    due_date = %circulation.due_date,
                    "Book issued"
                );
                metrics::track_book_issued(member.member_type);
                Ok(circulation)
            }
            IssueOutcome::MemberRejected => {
                // State moved between the read and the write; report it as it is now.
                let current = Self::member(repo, school_id, member.id).await?;
                let err = rules::ensure_member_can_borrow(&current, loan_rules)
                    .err()
                    .unwrap_or(CirculationError::IneligibleMember(
                        Ineligibility::LimitReached {
                            max_books: loan_rules.max_books,
                        },
                    ));
                warn!(member_id = %member.id, error = %err, "Issue rejected at write time");
                Err(AppError::domain(err))
            }
            IssueOutcome::CopyRejected => {
                let current = Self::copy(repo, school_id, copy.id).await?;
                warn!(copy_id = %copy.id, status = %current.status, "Issue rejected at write time");
                Err(AppError::domain(CirculationError::CopyUnavailable {
                    accession_number: current.accession_number,
                    status: current.status,
                    is_reference: current.is_reference,
                }))
            }
        }
    }

    #[instrument(skip(repo, policy))]
    pub async fn renew(
        repo: &dyn CirculationRepository,
        policy: &LibraryPolicy,
        school_id: SchoolId,
        id: CirculationId,
        today: NaiveDate,
    ) -> AppResult<Circulation> {
        let circulation = Self::circulation(repo, school_id, id).await?;
        let member = Self::member(repo, school_id, circulation.member_id).await?;
        let loan_rules = rules::rules_for(policy, member.member_type);
        rules::ensure_renewable(&circulation, loan_rules).map_err(AppError::domain)?;
        let due_date =
            rules::renewed_due_date(&circulation, today, loan_rules).map_err(AppError::domain)?;

        let renewal = LoanRenewal {
            school_id,
            circulation_id: id,
            due_date,
            max_renewals: loan_rules.max_renewals,
        };

        match repo.renew_loan(renewal).await? {
            Some(renewed) => {
                info!(
                    circulation_id = %renewed.id,
                    renewal_count = renewed.renewal_count,
                    due_date = %renewed.due_date,
                    "Loan renewed"
                );
                metrics::track_book_renewed();
                Ok(renewed)
            }
            None => {
                let current = Self::circulation(repo, school_id, id).await?;
                let err = rules::ensure_renewable(&current, loan_rules).err().unwrap_or(
                    CirculationError::RenewalLimitExceeded {
                        max_renewals: loan_rules.max_renewals,
                    },
                );
                Err(AppError::domain(err))
            }
        }
    }

    #[instrument(skip(repo, policy, dto))]
    pub async fn return_book(
        repo: &dyn CirculationRepository,
        policy: &LibraryPolicy,
        school_id: SchoolId,
        id: CirculationId,
        dto: ReturnBookDto,
        today: NaiveDate,
    ) -> AppResult<Circulation> {
        let circulation = Self::circulation(repo, school_id, id).await?;
        if !circulation.is_open() {
            return Err(AppError::domain(CirculationError::NotIssued));
        }

        let member = Self::member(repo, school_id, circulation.member_id).await?;
        let loan_rules = rules::rules_for(policy, member.member_type);
        let return_date = dto.return_date.unwrap_or(today);
        rules::ensure_not_before_issue(&circulation, "return", return_date)
            .map_err(AppError::domain)?;
        let fine = rules::fine_for(&circulation, return_date, loan_rules);

        let closing = LoanClosing {
            school_id,
            circulation_id: id,
            return_date,
            condition: dto.condition,
            remarks: dto.remarks.filter(|r| !r.trim().is_empty()),
            fine_amount: fine,
        };

        let returned = repo
            .close_loan(closing)
            .await?
            .ok_or_else(|| AppError::domain(CirculationError::NotIssued))?;

        info!(
            circulation_id = %returned.id,
            condition = %dto.condition,
            overdue_days = circulation.overdue_days(return_date),
            fine = %fine,
            "Book returned"
        );
        metrics::track_book_returned(dto.condition);
        if fine > rust_decimal::Decimal::ZERO {
            metrics::track_fine_assessed(fine);
        }

        Ok(returned)
    }

    #[instrument(skip(repo))]
    pub async fn pay_fine(
        repo: &dyn CirculationRepository,
        school_id: SchoolId,
        id: CirculationId,
    ) -> AppResult<Circulation> {
        Self::circulation(repo, school_id, id).await?;

        let paid = repo
            .mark_fine_paid(school_id, id)
            .await?
            .ok_or_else(|| AppError::domain(CirculationError::NoOutstandingFine))?;

        info!(circulation_id = %paid.id, fine = %paid.fine_amount, "Fine paid");
        metrics::track_fine_paid();
        Ok(paid)
    }

    #[instrument(skip(repo, policy))]
    pub async fn preview(
        repo: &dyn CirculationRepository,
        policy: &LibraryPolicy,
        school_id: SchoolId,
        id: CirculationId,
        as_of: NaiveDate,
    ) -> AppResult<LoanPreview> {
        let circulation = Self::circulation(repo, school_id, id).await?;
        let member = Self::member(repo, school_id, circulation.member_id).await?;
        let loan_rules = rules::rules_for(policy, member.member_type);

        let (overdue_days, fine_if_returned) = match circulation.return_date {
            Some(returned_on) if !circulation.is_open() => (
                circulation.overdue_days(returned_on),
                circulation.fine_amount,
            ),
            _ => (
                circulation.overdue_days(as_of),
                rules::fine_for(&circulation, as_of, loan_rules),
            ),
        };

        Ok(LoanPreview {
            as_of,
            overdue_days,
            fine_if_returned,
            renewals_remaining: rules::renewals_remaining(&circulation, loan_rules),
            can_renew: rules::ensure_renewable(&circulation, loan_rules).is_ok(),
            circulation,
        })
    }

    #[instrument(skip(repo))]
    pub async fn list(
        repo: &dyn CirculationRepository,
        school_id: SchoolId,
        filter: CirculationFilterParams,
    ) -> AppResult<PaginatedCirculationsResponse> {
        let (data, total) = repo.list_circulations(school_id, &filter).await?;
        Ok(PaginatedCirculationsResponse {
            data,
            meta: PaginationMeta::new(&filter.pagination, total),
        })
    }

    /// Resolves a scanned accession number to the action the desk should take.
    #[instrument(skip(repo))]
    pub async fn quick_find(
        repo: &dyn CirculationRepository,
        school_id: SchoolId,
        accession: &str,
    ) -> AppResult<QuickFind> {
        let not_found = || AppError::not_found(anyhow!("No copy with accession number {}", accession));

        let accession_number = accession
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(not_found)?;

        let copy = repo
            .find_copy_by_accession(school_id, accession_number)
            .await?
            .ok_or_else(not_found)?;

        match repo.find_open_circulation_for_copy(school_id, copy.id).await? {
            Some(circulation) => Ok(QuickFind::Return { copy, circulation }),
            None => Ok(QuickFind::Issue { copy }),
        }
    }

    async fn member(
        repo: &dyn CirculationRepository,
        school_id: SchoolId,
        id: MemberId,
    ) -> AppResult<Member> {
        repo.find_member(school_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Member not found")))
    }

    async fn copy(
        repo: &dyn CirculationRepository,
        school_id: SchoolId,
        id: BookCopyId,
    ) -> AppResult<BookCopy> {
        repo.find_copy(school_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Book copy not found")))
    }

    async fn circulation(
        repo: &dyn CirculationRepository,
        school_id: SchoolId,
        id: CirculationId,
    ) -> AppResult<Circulation> {
        repo.find_circulation(school_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Circulation not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::circulation::memory::InMemoryCirculationRepository;
    use rust_decimal::Decimal;
    use schooldesk_core::StatusCode;
    use schooldesk_models::library::{CirculationStatus, CopyStatus, MemberType, ReturnCondition};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Desk {
        repo: InMemoryCirculationRepository,
        policy: LibraryPolicy,
        school_id: SchoolId,
    }

    impl Desk {
        fn new() -> Self {
            Self {
                repo: InMemoryCirculationRepository::new(),
                policy: LibraryPolicy::default(),
                school_id: SchoolId::new(),
            }
        }

        async fn member(&self, member_type: MemberType, current_borrowed: i32) -> MemberId {
            let member = Member {
                id: MemberId::new(),
                school_id: self.school_id,
                full_name: "Amaka Eze".into(),
                member_type,
                current_borrowed,
                is_active: true,
                is_blocked: false,
            };
            let id = member.id;
            self.repo.insert_member(member).await;
            id
        }

        async fn copy(&self, accession_number: i64) -> BookCopyId {
            let copy = BookCopy {
                id: BookCopyId::new(),
                school_id: self.school_id,
                accession_number,
                call_number: "823 ACH".into(),
                title: "Things Fall Apart".into(),
                status: CopyStatus::Available,
                is_reference: false,
            };
            let id = copy.id;
            self.repo.insert_copy(copy).await;
            id
        }

        async fn issue(
            &self,
            member_id: MemberId,
            copy_id: BookCopyId,
            on: NaiveDate,
        ) -> AppResult<Circulation> {
            let dto = IssueBookDto {
                copy_id,
                member_id,
                issue_date: None,
            };
            CirculationService::issue(&self.repo, &self.policy, self.school_id, dto, on).await
        }

        async fn return_on(&self, id: CirculationId, on: NaiveDate) -> AppResult<Circulation> {
            let dto = ReturnBookDto {
                condition: ReturnCondition::Good,
                remarks: None,
                return_date: None,
            };
            CirculationService::return_book(&self.repo, &self.policy, self.school_id, id, dto, on)
                .await
        }
    }

    fn circulation_error(err: &AppError) -> Option<&CirculationError> {
        err.downcast_ref::<CirculationError>()
    }

    #[tokio::test]
    async fn test_issue_then_return_with_fine() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(1001).await;

        let loan = desk.issue(member_id, copy_id, date(2024, 1, 1)).await.unwrap();
        assert_eq!(loan.due_date, date(2024, 1, 15));
        assert_eq!(loan.status, CirculationStatus::Issued);
        assert_eq!(loan.renewal_count, 0);
        assert_eq!(desk.repo.copy(copy_id).await.unwrap().status, CopyStatus::Issued);
        assert_eq!(desk.repo.member(member_id).await.unwrap().current_borrowed, 1);

        let returned = desk.return_on(loan.id, date(2024, 1, 20)).await.unwrap();
        assert_eq!(returned.status, CirculationStatus::Returned);
        assert_eq!(returned.return_date, Some(date(2024, 1, 20)));
        assert_eq!(returned.fine_amount, Decimal::from(5) * desk.policy.student.fine_per_day);
        assert!(!returned.fine_paid);
        assert_eq!(desk.repo.copy(copy_id).await.unwrap().status, CopyStatus::Available);
        assert_eq!(desk.repo.member(member_id).await.unwrap().current_borrowed, 0);
    }

    #[tokio::test]
    async fn test_on_time_return_has_no_fine() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(1002).await;

        let loan = desk.issue(member_id, copy_id, date(2024, 1, 1)).await.unwrap();
        let returned = desk.return_on(loan.id, date(2024, 1, 15)).await.unwrap();
        assert_eq!(returned.fine_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_issue_limit_boundary() {
        let desk = Desk::new();
        let max_books = desk.policy.student.max_books;

        let below = desk.member(MemberType::Student, max_books - 1).await;
        let copy_id = desk.copy(2001).await;
        assert!(desk.issue(below, copy_id, date(2024, 2, 1)).await.is_ok());

        let at_limit = desk.member(MemberType::Student, max_books).await;
        let other_copy = desk.copy(2002).await;
        let err = desk.issue(at_limit, other_copy, date(2024, 2, 1)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            circulation_error(&err),
            Some(&CirculationError::IneligibleMember(
                Ineligibility::LimitReached { max_books }
            ))
        );
        assert_eq!(
            desk.repo.copy(other_copy).await.unwrap().status,
            CopyStatus::Available
        );
    }

    #[tokio::test]
    async fn test_issued_copy_cannot_be_issued_again() {
        let desk = Desk::new();
        let first = desk.member(MemberType::Student, 0).await;
        let second = desk.member(MemberType::Staff, 0).await;
        let copy_id = desk.copy(3001).await;

        desk.issue(first, copy_id, date(2024, 3, 1)).await.unwrap();
        let err = desk.issue(second, copy_id, date(2024, 3, 2)).await.unwrap_err();
        assert!(matches!(
            circulation_error(&err),
            Some(CirculationError::CopyUnavailable {
                status: CopyStatus::Issued,
                ..
            })
        ));
        assert_eq!(desk.repo.member(second).await.unwrap().current_borrowed, 0);
    }

    #[tokio::test]
    async fn test_renew_until_cap() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(4001).await;
        let loan = desk.issue(member_id, copy_id, date(2024, 1, 1)).await.unwrap();

        let renewed = CirculationService::renew(
            &desk.repo,
            &desk.policy,
            desk.school_id,
            loan.id,
            date(2024, 1, 10),
        )
        .await
        .unwrap();
        assert_eq!(renewed.renewal_count, 1);
        assert_eq!(renewed.due_date, date(2024, 1, 24));

        let renewed = CirculationService::renew(
            &desk.repo,
            &desk.policy,
            desk.school_id,
            loan.id,
            date(2024, 1, 30),
        )
        .await
        .unwrap();
        assert_eq!(renewed.renewal_count, 2);
        assert_eq!(renewed.due_date, date(2024, 2, 13));
        assert_eq!(renewed.fine_amount, Decimal::ZERO);

        let err = CirculationService::renew(
            &desk.repo,
            &desk.policy,
            desk.school_id,
            loan.id,
            date(2024, 2, 1),
        )
        .await
        .unwrap_err();
        assert_eq!(
            circulation_error(&err),
            Some(&CirculationError::RenewalLimitExceeded { max_renewals: 2 })
        );
    }

    #[tokio::test]
    async fn test_backdated_renewal_leaves_loan_untouched() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(4101).await;
        let loan = desk.issue(member_id, copy_id, date(2024, 3, 1)).await.unwrap();

        let err = CirculationService::renew(
            &desk.repo,
            &desk.policy,
            desk.school_id,
            loan.id,
            date(2023, 1, 1),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            circulation_error(&err),
            Some(&CirculationError::DatedBeforeIssue {
                action: "renew",
                date: date(2023, 1, 1),
                issue_date: date(2024, 3, 1),
            })
        );

        let current = desk
            .repo
            .find_circulation(desk.school_id, loan.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.due_date, date(2024, 3, 15));
        assert_eq!(current.renewal_count, 0);
    }

    #[tokio::test]
    async fn test_backdated_return_keeps_loan_open() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(4102).await;
        let loan = desk.issue(member_id, copy_id, date(2024, 3, 1)).await.unwrap();

        let dto = ReturnBookDto {
            condition: ReturnCondition::Good,
            remarks: None,
            return_date: Some(date(2020, 1, 1)),
        };
        let err = CirculationService::return_book(
            &desk.repo,
            &desk.policy,
            desk.school_id,
            loan.id,
            dto,
            date(2024, 4, 1),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(matches!(
            circulation_error(&err),
            Some(CirculationError::DatedBeforeIssue { action: "return", .. })
        ));

        let current = desk
            .repo
            .find_circulation(desk.school_id, loan.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.status, CirculationStatus::Issued);
        assert_eq!(desk.repo.copy(copy_id).await.unwrap().status, CopyStatus::Issued);

        // The fine still accrues when the book actually comes back.
        let returned = desk.return_on(loan.id, date(2024, 4, 1)).await.unwrap();
        assert_eq!(returned.fine_amount, Decimal::from(17) * desk.policy.student.fine_per_day);
    }

    #[tokio::test]
    async fn test_double_return_is_not_issued() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Staff, 0).await;
        let copy_id = desk.copy(5001).await;
        let loan = desk.issue(member_id, copy_id, date(2024, 1, 1)).await.unwrap();

        desk.return_on(loan.id, date(2024, 1, 5)).await.unwrap();
        let err = desk.return_on(loan.id, date(2024, 1, 6)).await.unwrap_err();
        assert_eq!(circulation_error(&err), Some(&CirculationError::NotIssued));
        assert_eq!(desk.repo.member(member_id).await.unwrap().current_borrowed, 0);
    }

    #[tokio::test]
    async fn test_borrow_count_tracks_open_loans() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Staff, 0).await;
        let mut loans = Vec::new();
        for accession in 6001..6004 {
            let copy_id = desk.copy(accession).await;
            loans.push(desk.issue(member_id, copy_id, date(2024, 4, 1)).await.unwrap());
        }
        desk.return_on(loans[1].id, date(2024, 4, 3)).await.unwrap();

        let member = desk.repo.member(member_id).await.unwrap();
        assert_eq!(member.current_borrowed, 2);
        assert_eq!(desk.repo.open_loans_for(member_id).await, 2);
    }

    #[tokio::test]
    async fn test_pay_fine_only_after_return_with_fine() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(7001).await;
        let loan = desk.issue(member_id, copy_id, date(2024, 1, 1)).await.unwrap();

        let err = CirculationService::pay_fine(&desk.repo, desk.school_id, loan.id)
            .await
            .unwrap_err();
        assert_eq!(circulation_error(&err), Some(&CirculationError::NoOutstandingFine));

        desk.return_on(loan.id, date(2024, 1, 18)).await.unwrap();
        let paid = CirculationService::pay_fine(&desk.repo, desk.school_id, loan.id)
            .await
            .unwrap();
        assert!(paid.fine_paid);

        let err = CirculationService::pay_fine(&desk.repo, desk.school_id, loan.id)
            .await
            .unwrap_err();
        assert_eq!(circulation_error(&err), Some(&CirculationError::NoOutstandingFine));
    }

    #[tokio::test]
    async fn test_preview_reports_fine_and_renewals() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(8001).await;
        let loan = desk.issue(member_id, copy_id, date(2024, 1, 1)).await.unwrap();

        let preview = CirculationService::preview(
            &desk.repo,
            &desk.policy,
            desk.school_id,
            loan.id,
            date(2024, 1, 18),
        )
        .await
        .unwrap();
        assert_eq!(preview.overdue_days, 3);
        assert_eq!(preview.fine_if_returned, Decimal::from(3) * desk.policy.student.fine_per_day);
        assert_eq!(preview.renewals_remaining, 2);
        assert!(preview.can_renew);
    }

    #[tokio::test]
    async fn test_quick_find_routes_by_copy_state() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(9001).await;

        let found = CirculationService::quick_find(&desk.repo, desk.school_id, "9001")
            .await
            .unwrap();
        assert!(matches!(found, QuickFind::Issue { copy } if copy.id == copy_id));

        let loan = desk.issue(member_id, copy_id, date(2024, 1, 1)).await.unwrap();
        let found = CirculationService::quick_find(&desk.repo, desk.school_id, " 9001 ")
            .await
            .unwrap();
        assert!(matches!(found, QuickFind::Return { circulation, .. } if circulation.id == loan.id));

        for bad in ["9999", "abc", "-3", ""] {
            let err = CirculationService::quick_find(&desk.repo, desk.school_id, bad)
                .await
                .unwrap_err();
            assert!(err.is_not_found(), "{bad} should be not found");
        }
    }

    #[tokio::test]
    async fn test_other_school_cannot_see_circulation() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Student, 0).await;
        let copy_id = desk.copy(9101).await;
        let loan = desk.issue(member_id, copy_id, date(2024, 1, 1)).await.unwrap();

        let err = CirculationService::renew(
            &desk.repo,
            &desk.policy,
            SchoolId::new(),
            loan.id,
            date(2024, 1, 2),
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_overdue() {
        let desk = Desk::new();
        let member_id = desk.member(MemberType::Staff, 0).await;
        let early = desk.copy(9201).await;
        let late = desk.copy(9202).await;
        desk.issue(member_id, early, date(2024, 1, 1)).await.unwrap();
        desk.issue(member_id, late, date(2024, 2, 1)).await.unwrap();

        let filter = CirculationFilterParams {
            overdue_on: Some(date(2024, 2, 5)),
            ..Default::default()
        };
        let page = CirculationService::list(&desk.repo, desk.school_id, filter)
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].copy_id, early);
    }
}
