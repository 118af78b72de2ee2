use super::{
    ImageFields, NewSolutionDescriptionImage, NewTaskDescriptionImage, SolutionDescriptionImage,
    TaskDescriptionImage,
};
use crate::error::{Error, Result};

impl ImageFields {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation("name", &self.name, "must not be empty"));
        }
        Ok(())
    }
}

impl TaskDescriptionImage {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> TaskDescriptionImage {
        Self {
            id: row.get("id"),
            task_description_id: row.get("task_description_id"),
            fields: ImageFields {
                name: row.get("name"),
                content: row.get("content"),
            },
            upload_date: row.get("upload_date"),
        }
    }
}

impl NewTaskDescriptionImage {
    pub(crate) fn validate(&self) -> Result<()> {
        self.fields.validate()
    }
}

impl SolutionDescriptionImage {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> SolutionDescriptionImage {
        Self {
            id: row.get("id"),
            solution_description_id: row.get("solution_description_id"),
            fields: ImageFields {
                name: row.get("name"),
                content: row.get("content"),
            },
            upload_date: row.get("upload_date"),
        }
    }
}

impl NewSolutionDescriptionImage {
    pub(crate) fn validate(&self) -> Result<()> {
        self.fields.validate()
    }
}
