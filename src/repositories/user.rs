use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::user::{Role, User},
};

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password: row.try_get("password")?,
        role: row.try_get("role")?,
        is_active: row.try_get("is_active")?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Creates a new user in the database. New accounts always start as CUSTOMER;
/// role upgrades go through `update_role`.
pub async fn create_user(
    pool: &Pool,
    email: &str,
    first_name: &str,
    last_name: &str,
    password_hash: &str,
) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO users (email, first_name, last_name, password, role)
            VALUES ($1, $2, $3, $4, 'CUSTOMER')
            RETURNING id, email, first_name, last_name, password, role,
                      is_active, is_verified, created_at, updated_at
            "#,
            &[&email, &first_name, &last_name, &password_hash],
        )
        .await?;
    row_to_user(&row)
}

/// Finds a user by their email address.
///
/// Inactive and unverified users are returned too; the service layer decides
/// how to report them, so the caller can distinguish "wrong password" from
/// "account disabled".
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, email, first_name, last_name, password, role,
                   is_active, is_verified, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
            &[&email],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: &Uuid) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, email, first_name, last_name, password, role,
                   is_active, is_verified, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
            &[user_id],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Updates a user's role. Privileged operation; the admin guard in the
/// middleware layer is the only route to this.
pub async fn update_role(pool: &Pool, user_id: &Uuid, role: Role) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE users
            SET role = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, email, first_name, last_name, password, role,
                      is_active, is_verified, created_at, updated_at
            "#,
            &[&role, user_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_user(&row)
}
