use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{entities::user, retry::retry_on_sqlite_busy};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Username already taken")]
    DuplicateUsername,
    #[error("Email already registered")]
    DuplicateEmail,
}

/// Full credential record. The password hash stays inside the server; the
/// serializable outward view is [`UserProfile`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            password_hash: model.password_hash,
            created_at: model.created_at.into(),
        }
    }

    /// Insert a new user. The unique indexes are the source of truth for
    /// duplicate detection; callers may pre-check for friendlier errors but
    /// must treat the rejection here as authoritative.
    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateUser) -> Result<Self, UserError> {
        let now = Utc::now();
        let active = user::ActiveModel {
            username: Set(data.username.clone()),
            email: Set(data.email.clone()),
            password_hash: Set(data.password_hash.clone()),
            created_at: Set(now.into()),
            ..Default::default()
        };

        let model = match active.insert(db).await {
            Ok(model) => model,
            Err(err) => return Err(map_unique_violation(err)),
        };

        // Read-after-write so server-assigned defaults come back from the
        // row itself.
        Self::find_by_id(db, model.id)
            .await?
            .ok_or(UserError::Database(DbErr::RecordNotFound(
                "User not found after insert".to_string(),
            )))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_username<C: ConnectionTrait>(
        db: &C,
        username: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_email<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Remove a user row; the schema cascades the delete to the user's
    /// todos. Not reachable through the HTTP API.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = retry_on_sqlite_busy(|| {
            user::Entity::delete_many()
                .filter(user::Column::Id.eq(id))
                .exec(db)
        })
        .await?;
        Ok(result.rows_affected)
    }
}

fn map_unique_violation(err: DbErr) -> UserError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
        if message.contains("username") {
            return UserError::DuplicateUsername;
        }
        if message.contains("email") {
            return UserError::DuplicateEmail;
        }
    }
    UserError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::{CreateUser, User, UserError};
    use crate::test_support::test_db;

    fn new_user(username: &str, email: Option<&str>) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            email: email.map(str::to_string),
            password_hash: "argon2-hash".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let db = test_db().await;

        let created = User::create(&db.conn, &new_user("alice", Some("alice@example.com")))
            .await
            .unwrap();

        let by_id = User::find_by_id(&db.conn, created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.email.as_deref(), Some("alice@example.com"));
        assert_eq!(by_id.password_hash, "argon2-hash");

        let by_username = User::find_by_username(&db.conn, "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_username.id, created.id);

        let by_email = User::find_by_email(&db.conn, "alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn lookups_return_none_when_absent() {
        let db = test_db().await;

        assert!(User::find_by_id(&db.conn, 999).await.unwrap().is_none());
        assert!(
            User::find_by_username(&db.conn, "nobody")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            User::find_by_email(&db.conn, "nobody@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_regardless_of_email() {
        let db = test_db().await;

        User::create(&db.conn, &new_user("alice", Some("alice@example.com")))
            .await
            .unwrap();

        let err = User::create(&db.conn, &new_user("alice", Some("other@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::DuplicateUsername));

        let err = User::create(&db.conn, &new_user("alice", None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::DuplicateUsername));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = test_db().await;

        User::create(&db.conn, &new_user("alice", Some("shared@example.com")))
            .await
            .unwrap();

        let err = User::create(&db.conn, &new_user("bob", Some("shared@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::DuplicateEmail));
    }

    #[tokio::test]
    async fn missing_email_never_collides() {
        let db = test_db().await;

        User::create(&db.conn, &new_user("alice", None)).await.unwrap();
        User::create(&db.conn, &new_user("bob", None)).await.unwrap();
    }
}
