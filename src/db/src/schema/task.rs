use super::{NewTask, Task, TaskPatch};
use crate::error::{Error, Result};
use std::convert::{TryFrom, TryInto};

#[derive(Copy, Clone, Debug, PartialEq, Eq, postgres_types::ToSql, postgres_types::FromSql)]
#[repr(i16)]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
    __Last,
}

impl DifficultyLevel {
    pub const fn as_int(self) -> i16 {
        self as i16
    }
}

impl From<DifficultyLevel> for i16 {
    fn from(level: DifficultyLevel) -> i16 {
        level.as_int()
    }
}

#[derive(Debug)]
pub struct UnknownDifficultyLevelError;

impl std::fmt::Display for UnknownDifficultyLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "unknown difficulty level")
    }
}

impl std::error::Error for UnknownDifficultyLevelError {}

impl TryFrom<i16> for DifficultyLevel {
    type Error = UnknownDifficultyLevelError;

    fn try_from(d: i16) -> Result<DifficultyLevel, UnknownDifficultyLevelError> {
        if d < 0 || d >= (DifficultyLevel::__Last as i16) {
            return Err(UnknownDifficultyLevelError);
        }
        Ok(unsafe { std::mem::transmute(d) })
    }
}

impl std::str::FromStr for DifficultyLevel {
    type Err = UnknownDifficultyLevelError;

    fn from_str(s: &str) -> Result<DifficultyLevel, UnknownDifficultyLevelError> {
        match s {
            "EASY" => Ok(DifficultyLevel::Easy),
            "MEDIUM" => Ok(DifficultyLevel::Medium),
            "HARD" => Ok(DifficultyLevel::Hard),
            _ => Err(UnknownDifficultyLevelError),
        }
    }
}

impl Task {
    pub fn difficulty_level(&self) -> DifficultyLevel {
        self.difficulty_level
            .try_into()
            .expect("invalid difficulty_level in tasks row")
    }

    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> Task {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            difficulty_level: row.get("difficulty_level"),
            create_date: row.get("create_date"),
            last_modified: row.get("last_modified"),
            author_id: row.get("author_id"),
        }
    }
}

impl NewTask {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation("name", &self.name, "must not be empty"));
        }
        Ok(())
    }
}

impl TaskPatch {
    pub fn name(&mut self, name: String) -> &mut Self {
        self.name = Some(name);
        self
    }

    pub fn difficulty_level(&mut self, level: DifficultyLevel) -> &mut Self {
        self.difficulty_level = Some(level.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.is_empty() {
                return Err(Error::validation("name", name, "must not be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_bounds() {
        assert!(DifficultyLevel::try_from(-1).is_err());
        assert!(DifficultyLevel::try_from(3).is_err());
        assert_eq!(DifficultyLevel::try_from(1).unwrap(), DifficultyLevel::Medium);
    }
}
