use std::path::Path;

use serde::{Deserialize, Serialize};

// 核心模块导出
pub mod connstr;
pub mod driver;
pub mod paths;

// 重新导出 driver 类型
pub use driver::{DatabaseDriver, DatabaseSession, DriverError, ExecResp, create_connection};
pub use paths::{logs_dir, root_dir};

// ============================================================================
// Model Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceKind {
    SQLite,
    MySQL,
    Postgres,
    SQLServer,
}

impl DataSourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            DataSourceKind::SQLite => "SQLite",
            DataSourceKind::MySQL => "MySQL",
            DataSourceKind::Postgres => "PostgreSQL",
            DataSourceKind::SQLServer => "SQLServer",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SQLiteOptions {
    pub readonly: bool,
    pub filepath: String,
}

impl SQLiteOptions {
    pub fn endpoint(&self) -> String {
        let path = self.filepath.trim();
        if path.is_empty() {
            return "sqlite://<unset>".into();
        }

        let name = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);

        if self.readonly {
            format!("sqlite://{}?mode=ro", name)
        } else {
            format!("sqlite://{}", name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MySQLOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub use_tls: bool,
}

impl Default for MySQLOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3306,
            username: "root".into(),
            password: "".into(),
            database: String::new(),
            use_tls: false,
        }
    }
}

impl MySQLOptions {
    pub fn endpoint(&self) -> String {
        let scheme = if self.use_tls { "mysqls" } else { "mysql" };
        let db = self.database.trim();
        if db.is_empty() {
            format!("{}://{}:{}", scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}/{}", scheme, self.host, self.port, db)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5432,
            database: String::new(),
            username: "postgres".into(),
            password: "".into(),
            use_tls: false,
        }
    }
}

impl PostgresOptions {
    pub fn endpoint(&self) -> String {
        let db = self.database.trim();
        let suffix = if db.is_empty() {
            String::new()
        } else {
            format!("/{}", db)
        };
        format!("postgres://{}:{}{}", self.host, self.port, suffix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SQLServerAuth {
    SqlPassword,
    Integrated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SQLServerOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth: SQLServerAuth,
    pub instance: Option<String>,
    pub trust_cert: bool,
    pub encrypt: bool,
}

impl Default for SQLServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1433,
            database: String::new(),
            username: None,
            password: None,
            auth: SQLServerAuth::SqlPassword,
            instance: None,
            trust_cert: false,
            encrypt: false,
        }
    }
}

impl SQLServerOptions {
    pub fn endpoint(&self) -> String {
        let mut authority = format!("{}:{}", self.host, self.port);
        if let Some(instance) = &self.instance {
            let trimmed = instance.trim();
            if !trimmed.is_empty() {
                authority = format!("{}\\{}", authority, trimmed);
            }
        }

        let db = self.database.trim();
        if db.is_empty() {
            format!("sqlserver://{}", authority)
        } else {
            format!("sqlserver://{}/{}", authority, db)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceOptions {
    SQLite(SQLiteOptions),
    MySQL(MySQLOptions),
    Postgres(PostgresOptions),
    SQLServer(SQLServerOptions),
}

impl DataSourceOptions {
    pub fn kind(&self) -> DataSourceKind {
        match self {
            DataSourceOptions::SQLite(_) => DataSourceKind::SQLite,
            DataSourceOptions::MySQL(_) => DataSourceKind::MySQL,
            DataSourceOptions::Postgres(_) => DataSourceKind::Postgres,
            DataSourceOptions::SQLServer(_) => DataSourceKind::SQLServer,
        }
    }

    /// 不含口令的展示地址，用于状态输出与诊断日志
    pub fn endpoint(&self) -> String {
        match self {
            DataSourceOptions::SQLite(opts) => opts.endpoint(),
            DataSourceOptions::MySQL(opts) => opts.endpoint(),
            DataSourceOptions::Postgres(opts) => opts.endpoint(),
            DataSourceOptions::SQLServer(opts) => opts.endpoint(),
        }
    }
}
