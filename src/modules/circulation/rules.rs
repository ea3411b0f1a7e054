//! Lending rules with no I/O.
//!
//! The service runs these checks before touching the store. The store repeats
//! the member limit and copy availability checks as conditional updates so a
//! concurrent request cannot slip past them.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use schooldesk_config::{LibraryPolicy, LoanRules};
use schooldesk_models::library::{
    BookCopy, Circulation, CirculationError, Ineligibility, Member, MemberType,
};

pub fn rules_for(policy: &LibraryPolicy, member_type: MemberType) -> &LoanRules {
    match member_type {
        MemberType::Student => &policy.student,
        MemberType::Staff => &policy.staff,
    }
}

pub fn ensure_member_can_borrow(member: &Member, rules: &LoanRules) -> Result<(), CirculationError> {
    let reason = if !member.is_active {
        Ineligibility::Inactive
    } else if member.is_blocked {
        Ineligibility::Blocked
    } else if member.current_borrowed >= rules.max_books {
        Ineligibility::LimitReached {
            max_books: rules.max_books,
        }
    } else {
        return Ok(());
    };
    Err(CirculationError::IneligibleMember(reason))
}

pub fn ensure_copy_loanable(copy: &BookCopy) -> Result<(), CirculationError> {
    if copy.is_loanable() {
        Ok(())
    } else {
        Err(CirculationError::CopyUnavailable {
            accession_number: copy.accession_number,
            status: copy.status,
            is_reference: copy.is_reference,
        })
    }
}

/// Due date for a loan starting (or renewed) on `from`.
pub fn due_date(from: NaiveDate, rules: &LoanRules) -> NaiveDate {
    let days = Days::new(rules.loan_days.max(0) as u64);
    from.checked_add_days(days).unwrap_or(NaiveDate::MAX)
}

pub fn ensure_renewable(circulation: &Circulation, rules: &LoanRules) -> Result<(), CirculationError> {
    if !circulation.is_open() {
        return Err(CirculationError::NotIssued);
    }
    if circulation.renewal_count >= rules.max_renewals {
        return Err(CirculationError::RenewalLimitExceeded {
            max_renewals: rules.max_renewals,
        });
    }
    Ok(())
}

/// Renewals and returns cannot be dated before the loan started.
pub fn ensure_not_before_issue(
    circulation: &Circulation,
    action: &'static str,
    date: NaiveDate,
) -> Result<(), CirculationError> {
    if date < circulation.issue_date {
        return Err(CirculationError::DatedBeforeIssue {
            action,
            date,
            issue_date: circulation.issue_date,
        });
    }
    Ok(())
}

/// New due date for a renewal on `renewal_date`. Never earlier than the current one.
pub fn renewed_due_date(
    circulation: &Circulation,
    renewal_date: NaiveDate,
    rules: &LoanRules,
) -> Result<NaiveDate, CirculationError> {
    ensure_not_before_issue(circulation, "renew", renewal_date)?;
    let renewed = due_date(renewal_date, rules);
    if renewed < circulation.due_date {
        return Err(CirculationError::RenewalShortensLoan {
            renewal_date,
            due_date: circulation.due_date,
        });
    }
    Ok(renewed)
}

pub fn renewals_remaining(circulation: &Circulation, rules: &LoanRules) -> i32 {
    (rules.max_renewals - circulation.renewal_count).max(0)
}

/// Fine recorded when `circulation` comes back on `returned_on`.
pub fn fine_for(circulation: &Circulation, returned_on: NaiveDate, rules: &LoanRules) -> Decimal {
    Decimal::from(circulation.overdue_days(returned_on)) * rules.fine_per_day
}
