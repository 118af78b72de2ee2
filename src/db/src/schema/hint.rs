use super::Hint;

impl Hint {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> Hint {
        Self {
            id: row.get("id"),
            task_id: row.get("task_id"),
        }
    }
}
