//! Seed rows and the knobs that size a seeding run.

use schooldesk_models::{ClassId, SchoolId, StudentId};
use schooldesk_models::library::MemberType;

pub struct SchoolSeed {
    pub name: String,
    pub address: String,
}

pub struct ClassSeed {
    pub school_id: SchoolId,
    pub name: String,
}

pub struct StudentSeed {
    pub school_id: SchoolId,
    pub class_id: ClassId,
    pub first_name: String,
    pub last_name: String,
    pub roll_number: i32,
}

pub struct MemberSeed {
    pub school_id: SchoolId,
    pub full_name: String,
    pub member_type: MemberType,
    pub student_id: Option<StudentId>,
}

pub struct CopySeed {
    pub school_id: SchoolId,
    pub accession_number: i64,
    pub call_number: String,
    pub title: String,
    pub is_reference: bool,
}

/// Sizes of the roster seeded for each school.
#[derive(Clone, Debug)]
pub struct RosterPerSchool {
    pub classes: usize,
    pub students_per_class: usize,
}

impl Default for RosterPerSchool {
    fn default() -> Self {
        Self {
            classes: 6,
            students_per_class: 30,
        }
    }
}

/// Sizes of the library seeded for each school.
#[derive(Clone, Debug)]
pub struct LibraryPerSchool {
    pub staff_members: usize,
    pub copies: usize,
    /// Every n-th copy is shelved as reference-only; 0 disables.
    pub reference_every: usize,
}

impl Default for LibraryPerSchool {
    fn default() -> Self {
        Self {
            staff_members: 10,
            copies: 200,
            reference_every: 20,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SeedConfig {
    pub num_schools: usize,
    pub roster: RosterPerSchool,
    pub library: LibraryPerSchool,
}

impl SeedConfig {
    pub fn new(num_schools: usize) -> Self {
        Self {
            num_schools,
            ..Default::default()
        }
    }

    pub fn with_roster(mut self, roster: RosterPerSchool) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_library(mut self, library: LibraryPerSchool) -> Self {
        self.library = library;
        self
    }

    pub fn students_per_school(&self) -> usize {
        self.roster.classes * self.roster.students_per_class
    }

    /// Every student becomes a member, plus the staff members.
    pub fn members_per_school(&self) -> usize {
        self.students_per_school() + self.library.staff_members
    }
}
