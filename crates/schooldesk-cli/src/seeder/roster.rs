//! Class and student seeding.

use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use schooldesk_models::{ClassId, SchoolId, StudentId};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{ClassSeed, StudentSeed};
use super::{BATCH_SIZE, SeedResult};

const SECTIONS: [&str; 3] = ["A", "B", "C"];

/// Class names run `Grade 1-A, Grade 1-B, Grade 1-C, Grade 2-A, ...`.
pub fn class_name(index: usize) -> String {
    format!(
        "Grade {}-{}",
        index / SECTIONS.len() + 1,
        SECTIONS[index % SECTIONS.len()]
    )
}

pub fn generate_classes(school_ids: &[SchoolId], per_school: usize) -> Vec<ClassSeed> {
    school_ids
        .iter()
        .flat_map(|&school_id| {
            (0..per_school).map(move |i| ClassSeed {
                school_id,
                name: class_name(i),
            })
        })
        .collect()
}

/// Generates students in parallel; roll numbers restart at 1 in every class.
pub fn generate_students(
    classes: &[(ClassId, SchoolId)],
    per_class: usize,
) -> Vec<StudentSeed> {
    classes
        .par_iter()
        .flat_map(|&(class_id, school_id)| {
            (0..per_class)
                .map(|i| StudentSeed {
                    school_id,
                    class_id,
                    first_name: FirstName().fake(),
                    last_name: LastName().fake(),
                    roll_number: i as i32 + 1,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn seed_classes(
    db: &PgPool,
    school_ids: &[SchoolId],
    per_school: usize,
) -> SeedResult<Vec<(ClassId, SchoolId)>> {
    let start_time = Instant::now();
    println!(
        "📊 Seeding {} classes ({} per school)...",
        school_ids.len() * per_school,
        per_school
    );

    let classes = generate_classes(school_ids, per_school);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(classes.len());
    for chunk in classes.chunks(BATCH_SIZE) {
        ids.extend(insert_classes_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} classes in {:?}",
        ids.len(),
        start_time.elapsed()
    );
    Ok(ids)
}

async fn insert_classes_chunk(
    tx: &mut Transaction<'_, Postgres>,
    classes: &[ClassSeed],
) -> SeedResult<Vec<(ClassId, SchoolId)>> {
    if classes.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from("INSERT INTO classes (school_id, name) VALUES ");
    for i in 0..classes.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 2;
        query.push_str(&format!("(${}, ${})", p + 1, p + 2));
    }
    query.push_str(" RETURNING id, school_id");

    let mut q = sqlx::query_as::<_, (ClassId, SchoolId)>(&query);
    for class in classes {
        q = q.bind(class.school_id).bind(&class.name);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}

pub async fn seed_students(
    db: &PgPool,
    classes: &[(ClassId, SchoolId)],
    per_class: usize,
) -> SeedResult<Vec<(StudentId, SchoolId, String)>> {
    let start_time = Instant::now();
    println!(
        "🎒 Seeding {} students ({} per class)...",
        classes.len() * per_class,
        per_class
    );

    let students = generate_students(classes, per_class);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(students.len());
    for chunk in students.chunks(BATCH_SIZE) {
        ids.extend(insert_students_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} students in {:?}",
        ids.len(),
        start_time.elapsed()
    );
    Ok(ids)
}

async fn insert_students_chunk(
    tx: &mut Transaction<'_, Postgres>,
    students: &[StudentSeed],
) -> SeedResult<Vec<(StudentId, SchoolId, String)>> {
    if students.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from(
        "INSERT INTO students (school_id, class_id, first_name, last_name, roll_number) VALUES ",
    );
    for i in 0..students.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 5;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5
        ));
    }
    query.push_str(" RETURNING id, school_id, first_name || ' ' || last_name");

    let mut q = sqlx::query_as::<_, (StudentId, SchoolId, String)>(&query);
    for student in students {
        q = q
            .bind(student.school_id)
            .bind(student.class_id)
            .bind(&student.first_name)
            .bind(&student.last_name)
            .bind(student.roll_number);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}
