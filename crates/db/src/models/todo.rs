use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{entities::todo, retry::retry_on_sqlite_busy};
pub use crate::types::TodoStatus;

#[derive(Debug, Error)]
pub enum TodoError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Todo not found")]
    NotFound,
    #[error("{0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTodo {
    pub title: String,
    pub description: Option<String>,
}

/// Partial update; absent fields keep their stored value. Setting `status`
/// overwrites `completed`; setting `completed` alone moves status between
/// `pending` and `done`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub status: Option<TodoStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub done: u64,
}

impl Todo {
    fn from_model(model: todo::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            description: model.description,
            completed: model.completed,
            status: model.status,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        data: &CreateTodo,
    ) -> Result<Self, TodoError> {
        if data.title.trim().is_empty() {
            return Err(TodoError::ValidationError("Title is required".to_string()));
        }

        let now = Utc::now();
        let active = todo::ActiveModel {
            user_id: Set(user_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone().unwrap_or_default()),
            completed: Set(false),
            status: Set(TodoStatus::Pending),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = retry_on_sqlite_busy(|| active.clone().insert(db)).await?;

        // Read-after-write so callers see the row exactly as stored.
        Self::find_by_id(db, model.id).await?.ok_or(TodoError::NotFound)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = todo::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_user_id<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let models = todo::Entity::find()
            .filter(todo::Column::UserId.eq(user_id))
            .order_by_desc(todo::Column::CreatedAt)
            .order_by_desc(todo::Column::Id)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    /// Apply the fields present in `data` as a single UPDATE statement and
    /// return the row as stored afterwards.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        data: &UpdateTodo,
    ) -> Result<Self, TodoError> {
        if let Some(title) = &data.title
            && title.trim().is_empty()
        {
            return Err(TodoError::ValidationError("Title is required".to_string()));
        }

        // status wins over completed when both are present.
        let (status, completed) = match (data.status, data.completed) {
            (Some(status), _) => (Some(status), Some(status.implies_completed())),
            (None, Some(completed)) => (Some(TodoStatus::from_completed(completed)), Some(completed)),
            (None, None) => (None, None),
        };

        let now = Utc::now();
        let build = || {
            let mut update = todo::Entity::update_many()
                .col_expr(todo::Column::UpdatedAt, Expr::value(now));
            if let Some(title) = &data.title {
                update = update.col_expr(todo::Column::Title, Expr::value(title.clone()));
            }
            if let Some(description) = &data.description {
                update = update.col_expr(todo::Column::Description, Expr::value(description.clone()));
            }
            if let Some(completed) = completed {
                update = update.col_expr(todo::Column::Completed, Expr::value(completed));
            }
            if let Some(status) = status {
                update = update.col_expr(todo::Column::Status, Expr::value(status));
            }
            update.filter(todo::Column::Id.eq(id))
        };

        let result = retry_on_sqlite_busy(|| build().exec(db)).await?;
        if result.rows_affected == 0 {
            return Err(TodoError::NotFound);
        }

        Self::find_by_id(db, id).await?.ok_or(TodoError::NotFound)
    }

    /// Flip the completion flag and move status between `pending` and
    /// `done`. The write is guarded on the flag value it was computed from,
    /// so two racing toggles cannot both apply the same flip.
    pub async fn toggle<C: ConnectionTrait>(db: &C, id: i64) -> Result<Self, TodoError> {
        loop {
            let current = todo::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or(TodoError::NotFound)?;

            let completed = !current.completed;
            let status = TodoStatus::from_completed(completed);
            let now = Utc::now();

            let result = retry_on_sqlite_busy(|| {
                todo::Entity::update_many()
                    .col_expr(todo::Column::Completed, Expr::value(completed))
                    .col_expr(todo::Column::Status, Expr::value(status))
                    .col_expr(todo::Column::UpdatedAt, Expr::value(now))
                    .filter(todo::Column::Id.eq(id))
                    .filter(todo::Column::Completed.eq(current.completed))
                    .exec(db)
            })
            .await?;

            if result.rows_affected > 0 {
                break;
            }
            // Raced with another writer; re-read and recompute.
        }

        Self::find_by_id(db, id).await?.ok_or(TodoError::NotFound)
    }

    /// Idempotent delete; returns the number of rows removed.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = retry_on_sqlite_busy(|| {
            todo::Entity::delete_many()
                .filter(todo::Column::Id.eq(id))
                .exec(db)
        })
        .await?;
        Ok(result.rows_affected)
    }

    pub async fn belongs_to_user<C: ConnectionTrait>(
        db: &C,
        id: i64,
        user_id: i64,
    ) -> Result<bool, DbErr> {
        let count = todo::Entity::find()
            .filter(todo::Column::Id.eq(id))
            .filter(todo::Column::UserId.eq(user_id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn stats_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<TodoStats, DbErr> {
        let scoped = || todo::Entity::find().filter(todo::Column::UserId.eq(user_id));

        let total = scoped().count(db).await?;
        let pending = scoped()
            .filter(todo::Column::Status.eq(TodoStatus::Pending))
            .count(db)
            .await?;
        let in_progress = scoped()
            .filter(todo::Column::Status.eq(TodoStatus::InProgress))
            .count(db)
            .await?;
        let done = scoped()
            .filter(todo::Column::Status.eq(TodoStatus::Done))
            .count(db)
            .await?;

        Ok(TodoStats {
            total,
            pending,
            in_progress,
            done,
        })
    }
}
