//! Row seeding for the `#[sqlx::test]` suites.

use schooldesk_models::library::MemberType;
use schooldesk_models::{BookCopyId, ClassId, MemberId, SchoolId, StudentId};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_school(pool: &PgPool) -> SchoolId {
    sqlx::query_scalar::<_, SchoolId>(
        "INSERT INTO schools (name, address) VALUES ($1, 'Test Address') RETURNING id",
    )
    .bind(format!("School {}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_member(
    pool: &PgPool,
    school_id: SchoolId,
    member_type: MemberType,
    current_borrowed: i32,
) -> MemberId {
    sqlx::query_scalar::<_, MemberId>(
        r#"
        INSERT INTO members (school_id, full_name, member_type, current_borrowed)
        VALUES ($1, 'Ngozi Adeyemi', $2, $3)
        RETURNING id
        "#,
    )
    .bind(school_id)
    .bind(member_type)
    .bind(current_borrowed)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_copy(
    pool: &PgPool,
    school_id: SchoolId,
    accession_number: i64,
    is_reference: bool,
) -> BookCopyId {
    sqlx::query_scalar::<_, BookCopyId>(
        r#"
        INSERT INTO book_copies (school_id, accession_number, call_number, title, status, is_reference)
        VALUES ($1, $2, '823 ACH', 'Arrow of God', $3, $4)
        RETURNING id
        "#,
    )
    .bind(school_id)
    .bind(accession_number)
    .bind(if is_reference { "reference" } else { "available" })
    .bind(is_reference)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_class(pool: &PgPool, school_id: SchoolId, name: &str) -> ClassId {
    sqlx::query_scalar::<_, ClassId>(
        "INSERT INTO classes (school_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(school_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Inserts `size` students with roll numbers counting down, so ordering is
/// only correct if the query sorts.
pub async fn create_students(
    pool: &PgPool,
    school_id: SchoolId,
    class_id: ClassId,
    size: i32,
) -> Vec<StudentId> {
    let mut ids = Vec::with_capacity(size as usize);
    for roll in (1..=size).rev() {
        let id = sqlx::query_scalar::<_, StudentId>(
            r#"
            INSERT INTO students (school_id, class_id, first_name, last_name, roll_number)
            VALUES ($1, $2, $3, 'Okonkwo', $4)
            RETURNING id
            "#,
        )
        .bind(school_id)
        .bind(class_id)
        .bind(format!("Pupil{roll}"))
        .bind(roll)
        .fetch_one(pool)
        .await
        .unwrap();
        ids.push(id);
    }
    ids.reverse();
    ids
}
