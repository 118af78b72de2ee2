use super::{TestCase, TestData};

impl TestData {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> TestData {
        Self {
            id: row.get("id"),
            task_id: row.get("task_id"),
        }
    }
}

impl TestCase {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> TestCase {
        Self {
            id: row.get("id"),
            arguments: row.get("arguments"),
            expected_result: row.get("expected_result"),
            test_data_id: row.get("test_data_id"),
        }
    }
}
