use super::{NewTag, Tag};
use crate::error::{Error, Result};

impl Tag {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> Tag {
        Self {
            id: row.get("id"),
            text: row.get("text"),
        }
    }
}

impl NewTag {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(Error::validation("text", &self.text, "must not be empty"));
        }
        Ok(())
    }
}
