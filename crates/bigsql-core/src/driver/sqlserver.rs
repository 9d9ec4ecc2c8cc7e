use tiberius::{AuthMethod, Client, Config, EncryptionLevel, SqlBrowser, error::Error as TiberiusError};
use tokio::{
    net::TcpStream,
    runtime::{Builder, Runtime},
};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::{SQLServerAuth, SQLServerOptions};

use super::{DatabaseDriver, DatabaseSession, DriverError, ExecResp, validate_sql};

type TdsClient = Client<Compat<TcpStream>>;

/// SQL Server 驱动
///
/// tiberius 只提供异步接口，会话内部持有一个单线程 runtime，对外保持阻塞调用。
#[derive(Debug, Clone, Copy)]
pub struct SQLServerDriver;

struct SQLServerSession {
    runtime: Runtime,
    client: TdsClient,
}

impl DatabaseSession for SQLServerSession {
    fn exec(
        &mut self,
        sql: &str,
    ) -> Result<ExecResp, DriverError> {
        validate_sql(sql)?;
        let result = self
            .runtime
            .block_on(self.client.execute(sql, &[]))
            .map_err(map_mssql_err)?;
        Ok(ExecResp {
            affected: result.rows_affected().iter().sum(),
        })
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        let Self { runtime, client } = *self;
        runtime
            .block_on(client.close())
            .map_err(|err| DriverError::Other(format!("Failed to close SQL Server: {}", err)))
    }
}

impl DatabaseDriver for SQLServerDriver {
    type Config = SQLServerOptions;

    fn create_connection(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let tds_config = build_config(config)?;
        let named = is_named_instance(config);

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| DriverError::Other(format!("Failed to start runtime: {}", err)))?;

        let client = runtime.block_on(async {
            let mut client = connect(tds_config, named).await?;
            client
                .simple_query("SELECT 1")
                .await
                .map_err(|err| DriverError::Other(format!("Validation query failed: {}", err)))?
                .into_results()
                .await
                .map_err(|err| DriverError::Other(format!("Validation query failed: {}", err)))?;
            Ok::<_, DriverError>(client)
        })?;

        Ok(Box::new(SQLServerSession { runtime, client }))
    }
}

async fn connect(
    config: Config,
    named: bool,
) -> Result<TdsClient, DriverError> {
    // 命名实例通过 SQL Browser 解析端口
    let tcp = if named {
        TcpStream::connect_named(&config)
            .await
            .map_err(|err| DriverError::Other(format!("Connection failed: {}", err)))?
    } else {
        TcpStream::connect(config.get_addr())
            .await
            .map_err(|err| DriverError::Other(format!("Connection failed: {}", err)))?
    };
    tcp.set_nodelay(true)
        .map_err(|err| DriverError::Other(format!("Connection failed: {}", err)))?;

    Client::connect(config, tcp.compat_write())
        .await
        .map_err(|err| DriverError::Other(format!("Connection failed: {}", err)))
}

fn is_named_instance(config: &SQLServerOptions) -> bool {
    config
        .instance
        .as_deref()
        .is_some_and(|instance| !instance.trim().is_empty())
}

fn build_config(opts: &SQLServerOptions) -> Result<Config, DriverError> {
    if opts.host.trim().is_empty() {
        return Err(DriverError::MissingField("server".into()));
    }

    let mut config = Config::new();
    config.host(opts.host.trim());
    config.port(opts.port);

    if let Some(instance) = opts.instance.as_deref() {
        let trimmed = instance.trim();
        if !trimmed.is_empty() {
            config.instance_name(trimmed);
        }
    }

    let db = opts.database.trim();
    if !db.is_empty() {
        config.database(db);
    }

    if opts.trust_cert {
        config.trust_cert();
    }
    config.encryption(if opts.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });

    match opts.auth {
        SQLServerAuth::SqlPassword => {
            let username = opts
                .username
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| DriverError::MissingField("User Id".into()))?;
            let password = opts.password.as_deref().unwrap_or("");
            config.authentication(AuthMethod::sql_server(username, password));
        }
        SQLServerAuth::Integrated => integrated_auth(&mut config)?,
    }

    Ok(config)
}

#[cfg(windows)]
fn integrated_auth(config: &mut Config) -> Result<(), DriverError> {
    config.authentication(AuthMethod::Integrated);
    Ok(())
}

#[cfg(not(windows))]
fn integrated_auth(_config: &mut Config) -> Result<(), DriverError> {
    Err(DriverError::InvalidField(
        "Integrated Security is only supported on Windows".into(),
    ))
}

fn map_mssql_err(err: TiberiusError) -> DriverError {
    match err {
        TiberiusError::Server(token) => DriverError::Database(token.to_string()),
        other => DriverError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_password_auth_requires_user() {
        let opts = SQLServerOptions {
            username: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(build_config(&opts), Err(DriverError::MissingField(f)) if f == "User Id"));

        let opts = SQLServerOptions {
            username: Some("sa".into()),
            password: Some("123".into()),
            database: "Sales".into(),
            ..Default::default()
        };
        let config = build_config(&opts).unwrap();
        assert_eq!(config.get_addr(), "127.0.0.1:1433");
    }

    #[test]
    fn blank_instance_is_not_named() {
        let mut opts = SQLServerOptions::default();
        assert!(!is_named_instance(&opts));
        opts.instance = Some(" ".into());
        assert!(!is_named_instance(&opts));
        opts.instance = Some("SQLEXPRESS".into());
        assert!(is_named_instance(&opts));
    }

    #[cfg(not(windows))]
    #[test]
    fn integrated_auth_is_rejected_off_windows() {
        let opts = SQLServerOptions {
            auth: SQLServerAuth::Integrated,
            ..Default::default()
        };
        assert!(matches!(build_config(&opts), Err(DriverError::InvalidField(_))));
    }
}
