use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::{ClassId, SchoolId, StudentId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SchoolClass {
    pub id: ClassId,
    pub school_id: SchoolId,
    pub name: String,
}

/// An active student as listed on an attendance sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RosterStudent {
    pub id: StudentId,
    pub school_id: SchoolId,
    pub class_id: ClassId,
    pub first_name: String,
    pub last_name: String,
    pub roll_number: Option<i32>,
}

impl RosterStudent {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
