//! Member directory (read-only; members are managed elsewhere)

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::MemberDirectory;
use crate::{
    error::{AppError, AppResult},
    models::member::Member,
};

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberDirectory for MembersRepository {
    async fn get_member(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            "SELECT id, name, email, role, is_active, national_id, phone_number FROM members WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    async fn list_staff(&self) -> AppResult<Vec<Member>> {
        let staff = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, name, email, role, is_active, national_id, phone_number
            FROM members
            WHERE role IN ('Librarian', 'Admin') AND is_active
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(staff)
    }
}
