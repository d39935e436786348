use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{Result as HashResult, SaltString, rand_core::OsRng},
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use tracing::debug;

use crate::{Error, error::Result};

fn hash_password(password: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, password_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let res = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    if let Err(e) = res {
        debug!("Invalid password, error {e}");
    }
    Ok(res.is_ok())
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(length(min = 3, max = 255))]
    pub email: String,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(length(min = 8, max = 255))]
    pub password: Option<String>,
    #[garde(inner(inner(length(min = 1, max = 64))))]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserInt {
    id: i64,
    name: String,
    email: String,
    roles: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Option<Vec<String>>,
}

impl From<UserInt> for User {
    fn from(value: UserInt) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            roles: value.roles.map(|s| {
                s.split(",")
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            }),
        }
    }
}

pub type UserRepository = UserRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        payload
            .validate()
            .map_err(|e| Error::InvalidData(e.to_string()))?;
        let password = payload.password.map(|p| hash_password(&p)).transpose()?;
        let roles = payload.roles.map(|roles| roles.join(","));
        let result =
            sqlx::query("INSERT INTO users (name, email, password, roles) VALUES (?, ?, ?, ?)")
                .bind(&payload.name)
                .bind(&payload.email)
                .bind(&password)
                .bind(&roles)
                .execute(&self.executor)
                .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let user: User =
            sqlx::query_as::<_, UserInt>("SELECT id, name, email, roles FROM users WHERE id = ?")
                .bind(id)
                .fetch_one(&self.executor)
                .await?
                .into();
        Ok(user)
    }

    pub async fn check_password(&self, email: &str, password: &str) -> Result<User> {
        let (id, hashed_password): (i64, Option<String>) =
            sqlx::query_as("SELECT id, password FROM users WHERE email = ?")
                .bind(email)
                .fetch_one(&self.executor)
                .await
                .map_err(|e| {
                    debug!("User check error: {e}");
                    Error::InvalidCredentials
                })?;
        if let Some(hashed_password) = hashed_password {
            if verify_password(password, &hashed_password).unwrap_or(false) {
                return self.get(id).await;
            }
        }
        Err(Error::InvalidCredentials)
    }
}
