//! Library circulation policy.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LIBRARY_STUDENT_LOAN_DAYS` | 14 |
//! | `LIBRARY_STUDENT_MAX_BOOKS` | 3 |
//! | `LIBRARY_STUDENT_MAX_RENEWALS` | 2 |
//! | `LIBRARY_STUDENT_FINE_PER_DAY` | 1.00 |
//! | `LIBRARY_STAFF_LOAN_DAYS` | 30 |
//! | `LIBRARY_STAFF_MAX_BOOKS` | 5 |
//! | `LIBRARY_STAFF_MAX_RENEWALS` | 3 |
//! | `LIBRARY_STAFF_FINE_PER_DAY` | 0 |

use rust_decimal::Decimal;

use crate::parse_or;

/// Lending rules for one member type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoanRules {
    pub loan_days: i64,
    pub max_books: i32,
    pub max_renewals: i32,
    pub fine_per_day: Decimal,
}

impl LoanRules {
    fn from_vars<F>(lookup: &F, prefix: &str, default: LoanRules) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |name: &str| format!("LIBRARY_{}_{}", prefix, name);
        Self {
            loan_days: parse_or(lookup, &key("LOAN_DAYS"), default.loan_days).max(1),
            max_books: parse_or(lookup, &key("MAX_BOOKS"), default.max_books).max(0),
            max_renewals: parse_or(lookup, &key("MAX_RENEWALS"), default.max_renewals).max(0),
            fine_per_day: parse_or(lookup, &key("FINE_PER_DAY"), default.fine_per_day)
                .max(Decimal::ZERO),
        }
    }
}

/// Read-only policy handed to the circulation engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibraryPolicy {
    pub student: LoanRules,
    pub staff: LoanRules,
}

impl Default for LibraryPolicy {
    fn default() -> Self {
        Self {
            student: LoanRules {
                loan_days: 14,
                max_books: 3,
                max_renewals: 2,
                fine_per_day: Decimal::new(100, 2),
            },
            staff: LoanRules {
                loan_days: 30,
                max_books: 5,
                max_renewals: 3,
                fine_per_day: Decimal::ZERO,
            },
        }
    }
}

impl LibraryPolicy {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            student: LoanRules::from_vars(&lookup, "STUDENT", defaults.student),
            staff: LoanRules::from_vars(&lookup, "STAFF", defaults.staff),
        }
    }
}
