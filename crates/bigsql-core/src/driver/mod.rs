use crate::DataSourceOptions;

pub use mysql::MySQLDriver;
pub use postgres::PostgresDriver;
pub use sqlite::SQLiteDriver;
pub use sqlserver::SQLServerDriver;

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

/// 一次批次执行的结果
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecResp {
    /// 批次内所有语句影响行数之和；DDL、查询等不影响行的语句计 0
    pub affected: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// 服务端拒绝了该批次（语法错误、约束冲突等），不影响后续批次
    #[error("{0}")]
    Database(String),
    #[error("{0}")]
    Other(String),
    #[error("Missing connection field: {0}")]
    MissingField(String),
    #[error("Invalid connection field: {0}")]
    InvalidField(String),
}

impl DriverError {
    /// 仅服务端语句级错误可以跳过当前批次继续执行
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DriverError::Database(_))
    }
}

pub trait DatabaseDriver {
    type Config;

    /// 打开连接并做一次往返校验，只返回处于可用状态的会话
    fn create_connection(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn DatabaseSession>, DriverError>;
}

pub trait DatabaseSession: Send {
    /// 以单条非查询命令执行一个批次
    fn exec(
        &mut self,
        sql: &str,
    ) -> Result<ExecResp, DriverError>;

    /// 显式关闭连接；drop 同样会释放连接，但不会报告关闭错误
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

pub fn create_connection(opts: &DataSourceOptions) -> Result<Box<dyn DatabaseSession>, DriverError> {
    tracing::debug!("创建连接: {}", opts.endpoint());
    match opts {
        DataSourceOptions::SQLite(config) => SQLiteDriver.create_connection(config),
        DataSourceOptions::MySQL(config) => MySQLDriver.create_connection(config),
        DataSourceOptions::Postgres(config) => PostgresDriver.create_connection(config),
        DataSourceOptions::SQLServer(config) => SQLServerDriver.create_connection(config),
    }
}

pub fn validate_sql(sql: &str) -> Result<(), DriverError> {
    if sql.trim().is_empty() {
        return Err(DriverError::InvalidField("sql".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_database_errors_are_recoverable() {
        assert!(DriverError::Database("syntax error".into()).is_recoverable());
        assert!(!DriverError::Other("connection reset".into()).is_recoverable());
        assert!(!DriverError::InvalidField("sql".into()).is_recoverable());
        assert!(!DriverError::MissingField("server".into()).is_recoverable());
    }

    #[test]
    fn validate_sql_rejects_blank_batches() {
        assert!(validate_sql("  \t ").is_err());
        assert!(validate_sql("SELECT 1").is_ok());
    }
}
