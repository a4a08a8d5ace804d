mod api;
mod controller;

pub use api::{ApiClient, ClientError};
pub use controller::{StatusCounts, TodoListController};
