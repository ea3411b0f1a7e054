//! Library member and book copy seeding.

use fake::Fake;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use rayon::prelude::*;
use schooldesk_models::library::MemberType;
use schooldesk_models::{SchoolId, StudentId};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{CopySeed, LibraryPerSchool, MemberSeed};
use super::{BATCH_SIZE, SeedResult};

/// Dewey classes used for generated call numbers.
const DEWEY_CLASSES: [u16; 10] = [0, 100, 200, 300, 400, 500, 600, 700, 800, 900];

/// One student member per seeded student plus `staff_per_school` staff members.
pub fn generate_members(
    students: &[(StudentId, SchoolId, String)],
    school_ids: &[SchoolId],
    staff_per_school: usize,
) -> Vec<MemberSeed> {
    let mut members: Vec<MemberSeed> = students
        .iter()
        .map(|(student_id, school_id, full_name)| MemberSeed {
            school_id: *school_id,
            full_name: full_name.clone(),
            member_type: MemberType::Student,
            student_id: Some(*student_id),
        })
        .collect();

    members.par_extend(school_ids.par_iter().flat_map(|&school_id| {
        (0..staff_per_school)
            .map(|_| MemberSeed {
                school_id,
                full_name: Name().fake(),
                member_type: MemberType::Staff,
                student_id: None,
            })
            .collect::<Vec<_>>()
    }));

    members
}

/// Accession numbers run from 1 within each school.
pub fn generate_copies(school_ids: &[SchoolId], library: &LibraryPerSchool) -> Vec<CopySeed> {
    school_ids
        .par_iter()
        .flat_map(|&school_id| {
            (1..=library.copies)
                .map(|n| {
                    let words: Vec<String> = Words(2..5).fake();
                    let dewey = DEWEY_CLASSES[n % DEWEY_CLASSES.len()] + (n % 100) as u16;
                    let is_reference =
                        library.reference_every > 0 && n % library.reference_every == 0;
                    CopySeed {
                        school_id,
                        accession_number: n as i64,
                        call_number: format!("{:03}.{:02}", dewey, n % 100),
                        title: title_case(&words),
                        is_reference,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn title_case(words: &[String]) -> String {
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub async fn seed_members(db: &PgPool, members: &[MemberSeed]) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("🪪 Seeding {} library members...", members.len());

    let mut tx = db.begin().await?;
    let mut inserted = 0;
    for chunk in members.chunks(BATCH_SIZE) {
        inserted += insert_members_chunk(&mut tx, chunk).await?;
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} members in {:?}",
        inserted,
        start_time.elapsed()
    );
    Ok(inserted)
}

async fn insert_members_chunk(
    tx: &mut Transaction<'_, Postgres>,
    members: &[MemberSeed],
) -> SeedResult<u64> {
    if members.is_empty() {
        return Ok(0);
    }

    let mut query =
        String::from("INSERT INTO members (school_id, full_name, member_type, student_id) VALUES ");
    for i in 0..members.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 4;
        query.push_str(&format!("(${}, ${}, ${}, ${})", p + 1, p + 2, p + 3, p + 4));
    }

    let mut q = sqlx::query(&query);
    for member in members {
        q = q
            .bind(member.school_id)
            .bind(&member.full_name)
            .bind(member.member_type)
            .bind(member.student_id);
    }

    Ok(q.execute(&mut **tx).await?.rows_affected())
}

pub async fn seed_copies(db: &PgPool, copies: &[CopySeed]) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("📚 Seeding {} book copies...", copies.len());

    let mut tx = db.begin().await?;
    let mut inserted = 0;
    for chunk in copies.chunks(BATCH_SIZE) {
        inserted += insert_copies_chunk(&mut tx, chunk).await?;
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} copies in {:?}",
        inserted,
        start_time.elapsed()
    );
    Ok(inserted)
}

async fn insert_copies_chunk(
    tx: &mut Transaction<'_, Postgres>,
    copies: &[CopySeed],
) -> SeedResult<u64> {
    if copies.is_empty() {
        return Ok(0);
    }

    let mut query = String::from(
        "INSERT INTO book_copies (school_id, accession_number, call_number, title, status, is_reference) VALUES ",
    );
    for i in 0..copies.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 6;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5,
            p + 6
        ));
    }

    let mut q = sqlx::query(&query);
    for copy in copies {
        let status = if copy.is_reference {
            "reference"
        } else {
            "available"
        };
        q = q
            .bind(copy.school_id)
            .bind(copy.accession_number)
            .bind(&copy.call_number)
            .bind(&copy.title)
            .bind(status)
            .bind(copy.is_reference);
    }

    Ok(q.execute(&mut **tx).await?.rows_affected())
}
