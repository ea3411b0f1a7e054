//! Database seeding for local development and demos.
//!
//! - [`schools`]: school rows
//! - [`roster`]: classes and students with roll numbers
//! - [`library`]: members (one per student plus staff) and book copies
//! - [`models`]: seed rows and sizing configuration
//!
//! Data is generated in parallel with Rayon and written with multi-value
//! `INSERT` statements, one transaction per table.

pub mod library;
pub mod models;
pub mod roster;
pub mod schools;

pub use models::{LibraryPerSchool, RosterPerSchool, SeedConfig};

use sqlx::PgPool;
use std::time::Instant;

pub type SeedResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Rows per multi-value INSERT; the largest row binds 6 parameters.
pub(crate) const BATCH_SIZE: usize = 500;

/// Seeds schools, classes, students, library members and book copies.
pub async fn seed_all(db: &PgPool, config: SeedConfig) -> SeedResult<()> {
    let start_time = Instant::now();

    println!("🌱 Starting database seeding...");
    println!("   - Schools: {}", config.num_schools);
    println!(
        "   - Per school: {} classes x {} students, {} staff members, {} copies",
        config.roster.classes,
        config.roster.students_per_class,
        config.library.staff_members,
        config.library.copies
    );

    let school_ids = schools::seed_schools(db, config.num_schools).await?;
    let classes = roster::seed_classes(db, &school_ids, config.roster.classes).await?;
    let students = roster::seed_students(db, &classes, config.roster.students_per_class).await?;

    let members = library::generate_members(&students, &school_ids, config.library.staff_members);
    let member_count = library::seed_members(db, &members).await?;

    let copies = library::generate_copies(&school_ids, &config.library);
    let copy_count = library::seed_copies(db, &copies).await?;

    println!(
        "\n✅ Seeding complete! {} schools, {} classes, {} students, {} members, {} copies in {:?}",
        school_ids.len(),
        classes.len(),
        students.len(),
        member_count,
        copy_count,
        start_time.elapsed()
    );

    Ok(())
}

/// Removes all seeded data. Loans go first because they hold restricting
/// references to copies and members.
pub async fn clear_all(db: &PgPool) -> SeedResult<()> {
    let start_time = Instant::now();
    println!("🗑️  Clearing all seeded data...");

    let loans = sqlx::query("DELETE FROM circulations")
        .execute(db)
        .await?
        .rows_affected();
    println!("   ✓ Deleted {} circulations", loans);

    schools::clear_schools(db).await?;

    println!("✅ All seeded data cleared in {:?}", start_time.elapsed());
    Ok(())
}
