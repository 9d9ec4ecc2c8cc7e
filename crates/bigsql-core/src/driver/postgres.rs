use postgres::{Client, Config, Error as PostgresError, NoTls, SimpleQueryMessage};

use crate::PostgresOptions;

use super::{DatabaseDriver, DatabaseSession, DriverError, ExecResp, validate_sql};

#[derive(Debug, Clone, Copy)]
pub struct PostgresDriver;

impl DatabaseDriver for PostgresDriver {
    type Config = PostgresOptions;

    fn create_connection(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let mut client = open_conn(config)?;
        client
            .simple_query("SELECT 1")
            .map_err(|err| DriverError::Other(format!("Validation query failed: {}", err)))?;
        Ok(Box::new(PostgresSession::new(client)))
    }
}

struct PostgresSession {
    client: Client,
}

impl PostgresSession {
    fn new(client: Client) -> Self {
        Self { client }
    }
}

impl DatabaseSession for PostgresSession {
    fn exec(
        &mut self,
        sql: &str,
    ) -> Result<ExecResp, DriverError> {
        validate_sql(sql)?;

        // simple query 协议允许一个批次包含多条语句
        let messages = self.client.simple_query(sql).map_err(map_pg_err)?;
        let affected = messages
            .iter()
            .map(|msg| match msg {
                SimpleQueryMessage::CommandComplete(rows) => *rows,
                _ => 0,
            })
            .sum();
        Ok(ExecResp { affected })
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.client
            .close()
            .map_err(|err| DriverError::Other(format!("Failed to close PostgreSQL: {}", err)))
    }
}

fn open_conn(config: &PostgresOptions) -> Result<Client, DriverError> {
    if config.host.trim().is_empty() {
        return Err(DriverError::MissingField("host".into()));
    }
    if config.username.trim().is_empty() {
        return Err(DriverError::MissingField("username".into()));
    }
    if config.use_tls {
        return Err(DriverError::InvalidField("PostgreSQL TLS connections are not supported".into()));
    }

    let mut pg_config = Config::new();
    pg_config.host(config.host.trim());
    pg_config.port(config.port);
    pg_config.user(config.username.trim());
    pg_config.password(config.password.as_str());

    let db = config.database.trim();
    if !db.is_empty() {
        pg_config.dbname(db);
    }

    let client = pg_config
        .connect(NoTls)
        .map_err(|err| DriverError::Other(format!("Connection failed: {}", err)))?;
    Ok(client)
}

fn map_pg_err(err: PostgresError) -> DriverError {
    match err.as_db_error() {
        Some(db) => DriverError::Database(db.to_string()),
        None => DriverError::Other(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_is_rejected_before_connecting() {
        let opts = PostgresOptions {
            use_tls: true,
            ..Default::default()
        };
        assert!(matches!(open_conn(&opts), Err(DriverError::InvalidField(_))));
    }

    #[test]
    fn open_conn_requires_username() {
        let opts = PostgresOptions {
            username: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(open_conn(&opts), Err(DriverError::MissingField(f)) if f == "username"));
    }
}
