//! Overdue loan report.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schooldesk_config::LibraryPolicy;
use schooldesk_models::library::MemberType;
use schooldesk_models::{CirculationId, SchoolId};
use sqlx::{FromRow, PgPool};

/// An open loan whose due date has passed, as printed by `overdue`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OverdueLoan {
    pub circulation_id: CirculationId,
    pub school_name: String,
    pub accession_number: i64,
    pub title: String,
    pub member_name: String,
    pub member_type: MemberType,
    pub due_date: NaiveDate,
}

impl OverdueLoan {
    pub fn overdue_days(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.due_date).num_days().max(0)
    }

    /// The fine a return on `as_of` would record.
    pub fn fine(&self, as_of: NaiveDate, policy: &LibraryPolicy) -> Decimal {
        let rules = match self.member_type {
            MemberType::Student => &policy.student,
            MemberType::Staff => &policy.staff,
        };
        Decimal::from(self.overdue_days(as_of)) * rules.fine_per_day
    }
}

/// Open loans due strictly before `as_of`, oldest first.
pub async fn find_overdue(
    db: &PgPool,
    as_of: NaiveDate,
    school_id: Option<SchoolId>,
) -> Result<Vec<OverdueLoan>, sqlx::Error> {
    sqlx::query_as::<_, OverdueLoan>(
        r#"
        SELECT c.id AS circulation_id, s.name AS school_name, b.accession_number, b.title,
               m.full_name AS member_name, m.member_type, c.due_date
        FROM circulations c
        JOIN book_copies b ON b.id = c.copy_id
        JOIN members m ON m.id = c.member_id
        JOIN schools s ON s.id = c.school_id
        WHERE c.status = 'issued'
          AND c.due_date < $1
          AND ($2::uuid IS NULL OR c.school_id = $2)
        ORDER BY c.due_date, b.accession_number
        "#,
    )
    .bind(as_of)
    .bind(school_id)
    .fetch_all(db)
    .await
}

/// Renders the report as fixed-width text lines, ending with a total.
pub fn render(loans: &[OverdueLoan], as_of: NaiveDate, policy: &LibraryPolicy) -> Vec<String> {
    let mut lines = Vec::with_capacity(loans.len() + 2);
    lines.push(format!(
        "{:<10} {:<30} {:<24} {:>10} {:>5} {:>8}",
        "Accession", "Title", "Member", "Due", "Days", "Fine"
    ));

    let mut total = Decimal::ZERO;
    for loan in loans {
        let fine = loan.fine(as_of, policy);
        total += fine;
        lines.push(format!(
            "{:<10} {:<30} {:<24} {:>10} {:>5} {:>8}",
            loan.accession_number,
            truncate(&loan.title, 30),
            truncate(&loan.member_name, 24),
            loan.due_date,
            loan.overdue_days(as_of),
            fine.round_dp(2)
        ));
    }

    lines.push(format!(
        "{} overdue loan(s) as of {}, fines if returned today: {}",
        loans.len(),
        as_of,
        total.round_dp(2)
    ));
    lines
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}
