use thiserror::Error;

use super::state::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a nickname is required")]
    MissingNickname,
    #[error("select at least one table to practise")]
    NoTables,
    #[error("table {table} is outside 1..={max}")]
    TableOutOfRange { table: u32, max: u32 },
    #[error("the time limit must be positive")]
    InvalidTimeLimit,
    #[error("cannot start a session while in {0:?}")]
    NotInConfig(Phase),
}
