use super::{
    DescriptionFields, NewSolutionDescription, NewTaskDescription, SolutionDescription,
    TaskDescription,
};
use crate::error::{Error, Result};

impl DescriptionFields {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(Error::validation("text", &self.text, "must not be empty"));
        }
        Ok(())
    }
}

impl TaskDescription {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> TaskDescription {
        Self {
            id: row.get("id"),
            task_id: row.get("task_id"),
            fields: DescriptionFields {
                text: row.get("text"),
                links: row.get("links"),
            },
        }
    }
}

impl NewTaskDescription {
    pub(crate) fn validate(&self) -> Result<()> {
        self.fields.validate()
    }
}

impl SolutionDescription {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> SolutionDescription {
        Self {
            id: row.get("id"),
            solution_id: row.get("solution_id"),
            fields: DescriptionFields {
                text: row.get("text"),
                links: row.get("links"),
            },
        }
    }
}

impl NewSolutionDescription {
    pub(crate) fn validate(&self) -> Result<()> {
        self.fields.validate()
    }
}
