use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "done")]
    Done,
}

impl TodoStatus {
    /// The completion flag implied by this status. `done` is the only
    /// status that marks a todo completed.
    pub fn implies_completed(self) -> bool {
        matches!(self, TodoStatus::Done)
    }

    /// The status implied by a bare completion flag, used when an update
    /// or toggle touches `completed` without naming a status.
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            TodoStatus::Done
        } else {
            TodoStatus::Pending
        }
    }
}
