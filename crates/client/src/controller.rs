use db::models::todo::{Todo, TodoStatus, UpdateTodo};

use crate::api::{ApiClient, ClientError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
}

/// Mirrors the signed-in user's todo list and keeps it in step with the
/// server after each mutation. Groupings are derived from the local list
/// alone; there is no second source of truth.
pub struct TodoListController {
    api: ApiClient,
    todos: Vec<Todo>,
}

impl TodoListController {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            todos: Vec::new(),
        }
    }

    pub fn api_mut(&mut self) -> &mut ApiClient {
        &mut self.api
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    /// Replace the local list with the server's.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.todos = self.api.list_todos().await?;
        Ok(())
    }

    /// Create then reload the whole list, so local state cannot drift from
    /// what the server actually stored.
    pub async fn create(
        &mut self,
        title: &str,
        description: Option<&str>,
    ) -> Result<(), ClientError> {
        self.api.create_todo(title, description).await?;
        self.refresh().await
    }

    /// Updates can move a todo between groupings, so reload rather than
    /// guess at the ordering.
    pub async fn update(&mut self, id: i64, updates: &UpdateTodo) -> Result<(), ClientError> {
        self.api.update_todo(id, updates).await?;
        self.refresh().await
    }

    /// Toggle patches the matching entry in place with the returned row.
    pub async fn toggle(&mut self, id: i64) -> Result<(), ClientError> {
        let row = self.api.toggle_todo(id).await?;
        patch_row(&mut self.todos, row);
        Ok(())
    }

    /// Deletion has no server-computed fields to reconcile, so the entry is
    /// dropped locally without a round trip.
    pub async fn delete(&mut self, id: i64) -> Result<(), ClientError> {
        self.api.delete_todo(id).await?;
        self.todos.retain(|todo| todo.id != id);
        Ok(())
    }

    pub fn status_counts(&self) -> StatusCounts {
        status_counts(&self.todos)
    }

    /// Split into (active, done) in list order.
    pub fn partition(&self) -> (Vec<&Todo>, Vec<&Todo>) {
        partition(&self.todos)
    }
}

fn patch_row(todos: &mut [Todo], row: Todo) {
    if let Some(slot) = todos.iter_mut().find(|todo| todo.id == row.id) {
        *slot = row;
    }
}

fn status_counts(todos: &[Todo]) -> StatusCounts {
    let mut counts = StatusCounts {
        total: todos.len(),
        ..Default::default()
    };
    for todo in todos {
        match todo.status {
            TodoStatus::Pending => counts.pending += 1,
            TodoStatus::InProgress => counts.in_progress += 1,
            TodoStatus::Done => counts.done += 1,
        }
    }
    counts
}

fn partition(todos: &[Todo]) -> (Vec<&Todo>, Vec<&Todo>) {
    todos
        .iter()
        .partition(|todo| todo.status != TodoStatus::Done)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::todo::{Todo, TodoStatus};

    use super::{StatusCounts, partition, patch_row, status_counts};

    fn todo(id: i64, status: TodoStatus) -> Todo {
        let now = Utc::now();
        Todo {
            id,
            user_id: 1,
            title: format!("todo {id}"),
            description: String::new(),
            completed: status == TodoStatus::Done,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn counts_are_derived_from_the_local_list() {
        let todos = vec![
            todo(1, TodoStatus::Pending),
            todo(2, TodoStatus::Pending),
            todo(3, TodoStatus::InProgress),
            todo(4, TodoStatus::Done),
        ];

        assert_eq!(
            status_counts(&todos),
            StatusCounts {
                total: 4,
                pending: 2,
                in_progress: 1,
                done: 1,
            }
        );
        assert_eq!(status_counts(&[]), StatusCounts::default());
    }

    #[test]
    fn partition_splits_active_from_done_in_order() {
        let todos = vec![
            todo(1, TodoStatus::Done),
            todo(2, TodoStatus::Pending),
            todo(3, TodoStatus::InProgress),
            todo(4, TodoStatus::Done),
        ];

        let (active, done) = partition(&todos);
        let active_ids: Vec<i64> = active.iter().map(|t| t.id).collect();
        let done_ids: Vec<i64> = done.iter().map(|t| t.id).collect();
        assert_eq!(active_ids, [2, 3]);
        assert_eq!(done_ids, [1, 4]);
    }

    #[test]
    fn patch_row_replaces_only_the_matching_entry() {
        let mut todos = vec![todo(1, TodoStatus::Pending), todo(2, TodoStatus::Pending)];

        let mut flipped = todo(2, TodoStatus::Done);
        flipped.title = "renamed".to_string();
        patch_row(&mut todos, flipped);

        assert_eq!(todos[0].status, TodoStatus::Pending);
        assert_eq!(todos[1].status, TodoStatus::Done);
        assert_eq!(todos[1].title, "renamed");

        // A row the list has never seen is ignored rather than appended.
        patch_row(&mut todos, todo(99, TodoStatus::Done));
        assert_eq!(todos.len(), 2);
    }
}
