use super::{NewSolution, Solution, SolutionPatch};
use crate::error::{Error, Result};

impl Solution {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> Solution {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            task_id: row.get("task_id"),
            author_id: row.get("author_id"),
            content: row.get("content"),
            create_date: row.get("create_date"),
            last_modified: row.get("last_modified"),
        }
    }
}

impl NewSolution {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation("name", &self.name, "must not be empty"));
        }
        if self.content.is_empty() {
            return Err(Error::validation("content", "", "must not be empty"));
        }
        Ok(())
    }
}

impl SolutionPatch {
    pub fn name(&mut self, name: String) -> &mut Self {
        self.name = Some(name);
        self
    }

    pub fn content(&mut self, content: String) -> &mut Self {
        self.content = Some(content);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.is_empty() {
                return Err(Error::validation("name", name, "must not be empty"));
            }
        }
        if let Some(content) = &self.content {
            if content.is_empty() {
                return Err(Error::validation("content", "", "must not be empty"));
            }
        }
        Ok(())
    }
}
