use anyhow::Context;
use async_trait::async_trait;
use schooldesk_core::{AppError, AppResult};
use schooldesk_models::library::{BookCopy, Circulation, CirculationFilterParams, Member};
use schooldesk_models::{BookCopyId, CirculationId, MemberId, SchoolId};
use sqlx::PgPool;
use tracing::instrument;

use super::repository::{CirculationRepository, IssueOutcome, LoanClosing, LoanRenewal, NewLoan};

const CIRCULATION_COLUMNS: &str = "id, school_id, copy_id, member_id, issue_date, due_date, \
     status, renewal_count, return_date, return_condition, remarks, fine_amount, fine_paid, \
     created_at, updated_at";

const LEDGER_FILTER: &str = "WHERE school_id = $1
       AND ($2::uuid IS NULL OR member_id = $2)
       AND ($3::text IS NULL OR status = $3)
       AND ($4::date IS NULL OR (status = 'issued' AND due_date < $4))";

#[derive(Clone, Debug)]
pub struct PgCirculationRepository {
    pool: PgPool,
}

impl PgCirculationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CirculationRepository for PgCirculationRepository {
    #[instrument(skip(self))]
    async fn find_member(&self, school_id: SchoolId, id: MemberId) -> AppResult<Option<Member>> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, school_id, full_name, member_type, current_borrowed, is_active, is_blocked
            FROM members
            WHERE id = $1 AND school_id = $2
            "#,
        )
        .bind(id)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch member")
        .map_err(AppError::database)
    }

    #[instrument(skip(self))]
    async fn find_copy(&self, school_id: SchoolId, id: BookCopyId) -> AppResult<Option<BookCopy>> {
        sqlx::query_as::<_, BookCopy>(
            r#"
            SELECT id, school_id, accession_number, call_number, title, status, is_reference
            FROM book_copies
            WHERE id = $1 AND school_id = $2
            "#,
        )
        .bind(id)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch book copy")
        .map_err(AppError::database)
    }

    #[instrument(skip(self))]
    async fn find_copy_by_accession(
        &self,
        school_id: SchoolId,
        accession_number: i64,
    ) -> AppResult<Option<BookCopy>> {
        sqlx::query_as::<_, BookCopy>(
            r#"
            SELECT id, school_id, accession_number, call_number, title, status, is_reference
            FROM book_copies
            WHERE accession_number = $1 AND school_id = $2
            "#,
        )
        .bind(accession_number)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch book copy by accession number")
        .map_err(AppError::database)
    }

    #[instrument(skip(self))]
    async fn find_circulation(
        &self,
        school_id: SchoolId,
        id: CirculationId,
    ) -> AppResult<Option<Circulation>> {
        let sql = format!(
            "SELECT {} FROM circulations WHERE id = $1 AND school_id = $2",
            CIRCULATION_COLUMNS
        );
        sqlx::query_as::<_, Circulation>(&sql)
            .bind(id)
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch circulation")
            .map_err(AppError::database)
    }

    #[instrument(skip(self))]
    async fn find_open_circulation_for_copy(
        &self,
        school_id: SchoolId,
        copy_id: BookCopyId,
    ) -> AppResult<Option<Circulation>> {
        let sql = format!(
            "SELECT {} FROM circulations \
             WHERE copy_id = $1 AND school_id = $2 AND status = 'issued'",
            CIRCULATION_COLUMNS
        );
        sqlx::query_as::<_, Circulation>(&sql)
            .bind(copy_id)
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch open circulation for copy")
            .map_err(AppError::database)
    }

    #[instrument(skip(self))]
    async fn list_circulations(
        &self,
        school_id: SchoolId,
        filter: &CirculationFilterParams,
    ) -> AppResult<(Vec<Circulation>, i64)> {
        let count_sql = format!("SELECT COUNT(*) FROM circulations {}", LEDGER_FILTER);
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(school_id)
            .bind(filter.member_id)
            .bind(filter.status)
            .bind(filter.overdue_on)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count circulations")
            .map_err(AppError::database)?;

        let page_sql = format!(
            "SELECT {} FROM circulations {} \
             ORDER BY issue_date DESC, created_at DESC LIMIT $5 OFFSET $6",
            CIRCULATION_COLUMNS, LEDGER_FILTER
        );
        let circulations = sqlx::query_as::<_, Circulation>(&page_sql)
            .bind(school_id)
            .bind(filter.member_id)
            .bind(filter.status)
            .bind(filter.overdue_on)
            .bind(filter.pagination.limit())
            .bind(filter.pagination.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list circulations")
            .map_err(AppError::database)?;

        Ok((circulations, total))
    }

    #[instrument(skip(self))]
    async fn create_loan(&self, loan: NewLoan) -> AppResult<IssueOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let member_updated = sqlx::query(
            r#"
            UPDATE members
            SET current_borrowed = current_borrowed + 1, updated_at = NOW()
            WHERE id = $1 AND school_id = $2
              AND is_active AND NOT is_blocked
              AND current_borrowed < $3
            "#,
        )
        .bind(loan.member_id)
        .bind(loan.school_id)
        .bind(loan.max_books)
        .execute(&mut *tx)
        .await
        .context("Failed to update member borrow count")
        .map_err(AppError::database)?
        .rows_affected();

        if member_updated == 0 {
            return Ok(IssueOutcome::MemberRejected);
        }

        let copy_updated = sqlx::query(
            r#"
            UPDATE book_copies
            SET status = 'issued', updated_at = NOW()
            WHERE id = $1 AND school_id = $2
              AND status = 'available' AND NOT is_reference
            "#,
        )
        .bind(loan.copy_id)
        .bind(loan.school_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update copy status")
        .map_err(AppError::database)?
        .rows_affected();

        if copy_updated == 0 {
            return Ok(IssueOutcome::CopyRejected);
        }

        let sql = format!(
            "INSERT INTO circulations (school_id, copy_id, member_id, issue_date, due_date) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            CIRCULATION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Circulation>(&sql)
            .bind(loan.school_id)
            .bind(loan.copy_id)
            .bind(loan.member_id)
            .bind(loan.issue_date)
            .bind(loan.due_date)
            .fetch_one(&mut *tx)
            .await;

        let circulation = match inserted {
            Ok(circulation) => circulation,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Ok(IssueOutcome::CopyRejected);
            }
            Err(e) => {
                return Err(AppError::database(
                    anyhow::Error::from(e).context("Failed to insert circulation"),
                ));
            }
        };

        tx.commit()
            .await
            .context("Failed to commit issue")
            .map_err(AppError::database)?;

        Ok(IssueOutcome::Issued(circulation))
    }

    #[instrument(skip(self))]
    async fn renew_loan(&self, renewal: LoanRenewal) -> AppResult<Option<Circulation>> {
        let sql = format!(
            "UPDATE circulations \
             SET due_date = $3, renewal_count = renewal_count + 1, updated_at = NOW() \
             WHERE id = $1 AND school_id = $2 AND status = 'issued' AND renewal_count < $4 \
             RETURNING {}",
            CIRCULATION_COLUMNS
        );
        sqlx::query_as::<_, Circulation>(&sql)
            .bind(renewal.circulation_id)
            .bind(renewal.school_id)
            .bind(renewal.due_date)
            .bind(renewal.max_renewals)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to renew circulation")
            .map_err(AppError::database)
    }

    #[instrument(skip(self))]
    async fn close_loan(&self, closing: LoanClosing) -> AppResult<Option<Circulation>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let sql = format!(
            "UPDATE circulations \
             SET status = 'returned', return_date = $3, return_condition = $4, remarks = $5, \
                 fine_amount = $6, fine_paid = FALSE, updated_at = NOW() \
             WHERE id = $1 AND school_id = $2 AND status = 'issued' \
             RETURNING {}",
            CIRCULATION_COLUMNS
        );
        let Some(circulation) = sqlx::query_as::<_, Circulation>(&sql)
            .bind(closing.circulation_id)
            .bind(closing.school_id)
            .bind(closing.return_date)
            .bind(closing.condition)
            .bind(&closing.remarks)
            .bind(closing.fine_amount)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to close circulation")
            .map_err(AppError::database)?
        else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE book_copies SET status = 'available', updated_at = NOW() \
             WHERE id = $1 AND school_id = $2",
        )
        .bind(circulation.copy_id)
        .bind(circulation.school_id)
        .execute(&mut *tx)
        .await
        .context("Failed to release copy")
        .map_err(AppError::database)?;

        sqlx::query(
            "UPDATE members \
             SET current_borrowed = GREATEST(current_borrowed - 1, 0), updated_at = NOW() \
             WHERE id = $1 AND school_id = $2",
        )
        .bind(circulation.member_id)
        .bind(circulation.school_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update member borrow count")
        .map_err(AppError::database)?;

        tx.commit()
            .await
            .context("Failed to commit return")
            .map_err(AppError::database)?;

        Ok(Some(circulation))
    }

    #[instrument(skip(self))]
    async fn mark_fine_paid(
        &self,
        school_id: SchoolId,
        id: CirculationId,
    ) -> AppResult<Option<Circulation>> {
        let sql = format!(
            "UPDATE circulations SET fine_paid = TRUE, updated_at = NOW() \
             WHERE id = $1 AND school_id = $2 \
               AND status = 'returned' AND fine_amount > 0 AND NOT fine_paid \
             RETURNING {}",
            CIRCULATION_COLUMNS
        );
        sqlx::query_as::<_, Circulation>(&sql)
            .bind(id)
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to record fine payment")
            .map_err(AppError::database)
    }
}
