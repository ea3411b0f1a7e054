//! # SchoolDesk Models
//!
//! Domain entities, request/response DTOs and typed domain errors.
//!
//! - [`ids`]: UUID newtypes per entity
//! - [`library`]: members, book copies, circulations
//! - [`attendance`]: attendance records, session summaries, sheet DTOs
//! - [`roster`]: classes and students
//!
//! Enumerations stored as `TEXT` columns (member type, copy status, session,
//! attendance status...) are declared with [`text_enum!`] so they share one
//! string form across JSON, SQL and the CLI.

use thiserror::Error;

pub mod attendance;
pub mod ids;
pub mod library;
pub mod roster;

pub use ids::{
    AttendanceRecordId, BookCopyId, CirculationId, ClassId, MemberId, SchoolId, SessionSummaryId,
    StudentId, UserId,
};

/// Returned when a string does not name a variant of a [`text_enum!`] type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a unit enum persisted as lowercase text.
///
/// Generates serde (snake_case), `as_str`, `Display`, case-insensitive
/// `FromStr`, and the sqlx `Type`/`Encode`/`Decode` impls delegating to `&str`.
#[macro_export]
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize, utoipa::ToSchema,
        )]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_ascii_lowercase();
                $(
                    if lowered == $text {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::UnknownVariant {
                    kind: stringify!($name),
                    value: s.to_string(),
                })
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$name>()?)
            }
        }
    };
}
