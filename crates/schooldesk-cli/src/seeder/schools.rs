//! School seeding.

use fake::Fake;
use fake::faker::address::en::*;
use rayon::prelude::*;
use schooldesk_models::SchoolId;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::SchoolSeed;
use super::{BATCH_SIZE, SeedResult};

const SUFFIXES: [&str; 5] = ["Academy", "High School", "College", "Grammar School", "School"];

/// Generates school data in parallel using Rayon. Names carry the index so
/// they stay unique within one run.
pub fn generate_schools(count: usize) -> Vec<SchoolSeed> {
    (0..count)
        .into_par_iter()
        .map(|i| {
            let city: String = CityName().fake();
            let street: String = StreetName().fake();
            let building: String = BuildingNumber().fake();
            let zip: String = ZipCode().fake();

            SchoolSeed {
                name: format!("{} {} #{}", city, SUFFIXES[i % SUFFIXES.len()], i + 1),
                address: format!("{} {}, {} {}", building, street, city, zip),
            }
        })
        .collect()
}

pub async fn seed_schools(db: &PgPool, count: usize) -> SeedResult<Vec<SchoolId>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} schools...", count);

    let schools = generate_schools(count);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(schools.len());
    for chunk in schools.chunks(BATCH_SIZE) {
        ids.extend(insert_schools_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} schools in {:?}",
        ids.len(),
        start_time.elapsed()
    );
    Ok(ids)
}

async fn insert_schools_chunk(
    tx: &mut Transaction<'_, Postgres>,
    schools: &[SchoolSeed],
) -> SeedResult<Vec<SchoolId>> {
    if schools.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from("INSERT INTO schools (name, address) VALUES ");
    for i in 0..schools.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 2;
        query.push_str(&format!("(${}, ${})", p + 1, p + 2));
    }
    query.push_str(" ON CONFLICT (name) DO NOTHING RETURNING id");

    let mut q = sqlx::query_scalar::<_, SchoolId>(&query);
    for school in schools {
        q = q.bind(&school.name).bind(&school.address);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}

/// Deletes every school; classes, students, members and loans cascade.
pub async fn clear_schools(db: &PgPool) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("🗑️  Clearing schools...");

    let deleted = sqlx::query("DELETE FROM schools")
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} schools in {:?}",
        deleted,
        start_time.elapsed()
    );
    Ok(deleted)
}
