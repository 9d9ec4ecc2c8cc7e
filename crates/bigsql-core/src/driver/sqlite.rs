use std::{fs, path::Path};

use fallible_iterator::FallibleIterator;
use rusqlite::{Batch, Connection, ErrorCode, OpenFlags};

use crate::SQLiteOptions;

use super::{DatabaseDriver, DatabaseSession, DriverError, ExecResp, validate_sql};

const MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Clone, Copy)]
pub struct SQLiteDriver;

struct SQLiteConnection {
    conn: Connection,
}

impl SQLiteConnection {
    fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl DatabaseSession for SQLiteConnection {
    fn exec(
        &mut self,
        sql: &str,
    ) -> Result<ExecResp, DriverError> {
        validate_sql(sql)?;

        // 批次内可能包含多条语句，逐条执行并累计影响行数
        let mut affected = 0u64;
        let mut batch = Batch::new(&self.conn, sql);
        while let Some(mut stmt) = batch.next().map_err(map_sqlite_err)? {
            if stmt.column_count() > 0 {
                let mut rows = stmt.query([]).map_err(map_sqlite_err)?;
                while rows.next().map_err(map_sqlite_err)?.is_some() {}
            } else {
                affected += stmt.execute([]).map_err(map_sqlite_err)? as u64;
            }
        }
        Ok(ExecResp { affected })
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.conn
            .close()
            .map_err(|(_, err)| DriverError::Other(format!("Failed to close SQLite: {}", err)))
    }
}

impl DatabaseDriver for SQLiteDriver {
    type Config = SQLiteOptions;

    fn create_connection(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let conn = open_conn(config)?;
        conn.query_row("SELECT 1", [], |_| Ok::<_, rusqlite::Error>(()))
            .map_err(|err| DriverError::Other(format!("Validation query failed: {}", err)))?;
        Ok(Box::new(SQLiteConnection::new(conn)))
    }
}

fn open_conn(config: &SQLiteOptions) -> Result<Connection, DriverError> {
    let path_str = config.filepath.trim();
    if path_str.is_empty() {
        return Err(DriverError::MissingField("file path".into()));
    }

    let path = Path::new(path_str);

    if path_str != MEMORY_PATH {
        if config.readonly {
            if !path.exists() {
                return Err(DriverError::InvalidField(format!("file path '{}' does not exist", path_str)));
            }
        } else if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|err| DriverError::Other(format!("Failed to create directory: {}", err)))?;
            }
        }
    }

    let flags = if config.readonly {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    };

    Connection::open_with_flags(path, flags).map_err(|err| DriverError::Other(format!("Failed to open SQLite: {}", err)))
}

/// 文件级故障（损坏、磁盘满、IO）终止执行，其余均视为语句错误
fn map_sqlite_err(err: rusqlite::Error) -> DriverError {
    match err.sqlite_error_code() {
        Some(
            ErrorCode::DatabaseCorrupt
            | ErrorCode::NotADatabase
            | ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull
            | ErrorCode::CannotOpen
            | ErrorCode::OutOfMemory,
        ) => DriverError::Other(err.to_string()),
        _ => DriverError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_session() -> Box<dyn DatabaseSession> {
        SQLiteDriver
            .create_connection(&SQLiteOptions {
                readonly: false,
                filepath: MEMORY_PATH.into(),
            })
            .unwrap()
    }

    #[test]
    fn exec_sums_affected_rows_across_statements() {
        let mut session = memory_session();
        let resp = session.exec("CREATE TABLE t(x INT)").unwrap();
        assert_eq!(resp.affected, 0);

        let resp = session
            .exec("INSERT INTO t VALUES(1); INSERT INTO t VALUES(2), (3);")
            .unwrap();
        assert_eq!(resp.affected, 3);

        let resp = session.exec("UPDATE t SET x = x + 1 WHERE x > 1").unwrap();
        assert_eq!(resp.affected, 2);
    }

    #[test]
    fn exec_drains_queries_without_counting() {
        let mut session = memory_session();
        session.exec("CREATE TABLE t(x INT); INSERT INTO t VALUES(1);").unwrap();
        let resp = session.exec("SELECT * FROM t").unwrap();
        assert_eq!(resp.affected, 0);
    }

    #[test]
    fn statement_errors_are_recoverable() {
        let mut session = memory_session();
        let err = session.exec("INSERT INTO missing VALUES(1)").unwrap_err();
        assert!(err.is_recoverable(), "{err}");

        let err = session.exec("SELEC 1").unwrap_err();
        assert!(err.is_recoverable(), "{err}");
    }

    #[test]
    fn readonly_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SQLiteDriver.create_connection(&SQLiteOptions {
            readonly: true,
            filepath: dir.path().join("absent.db").to_string_lossy().into_owned(),
        });
        assert!(matches!(result, Err(DriverError::InvalidField(_))));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.db");
        let session = SQLiteDriver
            .create_connection(&SQLiteOptions {
                readonly: false,
                filepath: path.to_string_lossy().into_owned(),
            })
            .unwrap();
        session.close().unwrap();
        assert!(path.exists());
    }
}
