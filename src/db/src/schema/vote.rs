use super::{SolutionVote, TaskVote};
use crate::error::{Error, Result};

pub const MIN_STARS: i16 = 0;
pub const MAX_STARS: i16 = 5;

/// Closed-interval check, applied on insert and update alike. Out-of-range
/// values are rejected, never clamped.
pub(crate) fn check_stars(stars_count: i16) -> Result<()> {
    if stars_count < MIN_STARS || stars_count > MAX_STARS {
        return Err(Error::validation(
            "stars_count",
            stars_count,
            "must be between 0 and 5",
        ));
    }
    Ok(())
}

impl TaskVote {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> TaskVote {
        Self {
            id: row.get("id"),
            task_id: row.get("task_id"),
            user_id: row.get("user_id"),
            stars_count: row.get("stars_count"),
        }
    }
}

impl SolutionVote {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> SolutionVote {
        Self {
            id: row.get("id"),
            solution_id: row.get("solution_id"),
            user_id: row.get("user_id"),
            stars_count: row.get("stars_count"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stars_interval_is_closed() {
        assert!(check_stars(-1).is_err());
        assert!(check_stars(6).is_err());
        assert!(check_stars(MIN_STARS).is_ok());
        assert!(check_stars(MAX_STARS).is_ok());
    }
}
