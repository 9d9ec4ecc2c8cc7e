use mysql::{Conn, Opts, OptsBuilder, SslOpts, prelude::Queryable};

use crate::MySQLOptions;

use super::{DatabaseDriver, DatabaseSession, DriverError, ExecResp, validate_sql};

#[derive(Debug, Clone, Copy)]
pub struct MySQLDriver;

impl DatabaseDriver for MySQLDriver {
    type Config = MySQLOptions;

    fn create_connection(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let mut conn = open_conn(config)?;
        conn.ping()
            .map_err(|err| DriverError::Other(format!("Ping failed: {}", err)))?;
        Ok(Box::new(MySQLSession::new(conn)))
    }
}

struct MySQLSession {
    conn: Conn,
}

impl MySQLSession {
    fn new(conn: Conn) -> Self {
        Self { conn }
    }
}

impl DatabaseSession for MySQLSession {
    fn exec(
        &mut self,
        sql: &str,
    ) -> Result<ExecResp, DriverError> {
        validate_sql(sql)?;

        // 文本协议可返回多个结果集，逐个读取以累计影响行数并暴露后续语句的错误
        let mut result = self.conn.query_iter(sql).map_err(map_mysql_err)?;
        let mut affected = 0u64;
        while let Some(set) = result.iter() {
            affected += set.affected_rows();
            for row in set {
                row.map_err(map_mysql_err)?;
            }
        }
        Ok(ExecResp { affected })
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        // Conn 在 drop 时发送 COM_QUIT
        drop(self);
        Ok(())
    }
}

fn open_conn(config: &MySQLOptions) -> Result<Conn, DriverError> {
    if config.host.trim().is_empty() {
        return Err(DriverError::MissingField("host".into()));
    }
    if config.username.trim().is_empty() {
        return Err(DriverError::MissingField("username".into()));
    }

    let mut builder = OptsBuilder::new();
    builder = builder.ip_or_hostname(Some(config.host.trim().to_string()));
    builder = builder.tcp_port(config.port);
    builder = builder.user(Some(config.username.clone()));
    builder = builder.pass(Some(config.password.clone()));

    let db = config.database.trim();
    if !db.is_empty() {
        builder = builder.db_name(Some(db.to_string()));
    }

    if config.use_tls {
        builder = builder.ssl_opts(Some(SslOpts::default()));
    }
    let opts = Opts::from(builder);
    Conn::new(opts).map_err(|err| DriverError::Other(format!("Connection failed: {}", err)))
}

fn map_mysql_err(err: mysql::Error) -> DriverError {
    match err {
        mysql::Error::MySqlError(err) => DriverError::Database(err.to_string()),
        other => DriverError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_conn_requires_host_and_username() {
        let missing_host = MySQLOptions {
            host: " ".into(),
            ..Default::default()
        };
        assert!(matches!(open_conn(&missing_host), Err(DriverError::MissingField(f)) if f == "host"));

        let missing_user = MySQLOptions {
            username: String::new(),
            ..Default::default()
        };
        assert!(matches!(open_conn(&missing_user), Err(DriverError::MissingField(f)) if f == "username"));
    }
}
