//! 连接字符串解析
//!
//! 支持三种写法：
//! - ADO.NET 风格 `Server=localhost;Database=Db;User Id=sa;Password=123;`（SQL Server）
//! - URL 风格 `mysql://` / `postgres://` / `sqlserver://`
//! - `sqlite://<path>`，`?mode=ro` 表示只读

use std::{iter::Peekable, str::Chars, str::FromStr};

use url::Url;

use crate::{
    DataSourceOptions, DriverError, MySQLOptions, PostgresOptions, SQLServerAuth, SQLServerOptions, SQLiteOptions,
};

impl FromStr for DataSourceOptions {
    type Err = DriverError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DriverError::MissingField("connection string".into()));
        }

        if let Some(rest) = strip_prefix_ignore_case(input, "sqlite:") {
            return parse_sqlite(rest);
        }

        match input.split_once("://") {
            Some((scheme, _)) if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric()) => {
                parse_url(input)
            }
            _ => parse_ado(input),
        }
    }
}

fn strip_prefix_ignore_case<'a>(
    input: &'a str,
    prefix: &str,
) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &input[prefix.len()..])
}

fn parse_sqlite(rest: &str) -> Result<DataSourceOptions, DriverError> {
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let mut readonly = false;
    if let Some(query) = query {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((key, value)) if key.eq_ignore_ascii_case("mode") => {
                    readonly = value.eq_ignore_ascii_case("ro");
                }
                _ => tracing::debug!("忽略未知 SQLite 参数: {}", pair),
            }
        }
    }

    if path.trim().is_empty() {
        return Err(DriverError::MissingField("file path".into()));
    }

    Ok(DataSourceOptions::SQLite(SQLiteOptions {
        readonly,
        filepath: path.trim().to_string(),
    }))
}

fn parse_url(input: &str) -> Result<DataSourceOptions, DriverError> {
    let url = Url::parse(input).map_err(|err| DriverError::InvalidField(format!("connection string: {}", err)))?;

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| DriverError::MissingField("host".into()))?
        .to_string();
    let username = url.username().to_string();
    let password = url.password().unwrap_or_default().to_string();
    let database = url.path().trim_start_matches('/').to_string();

    let mut use_tls = false;
    let mut trust_cert = false;
    let mut instance = None;
    for (key, value) in url.query_pairs() {
        match key.to_ascii_lowercase().as_str() {
            "ssl" | "tls" | "encrypt" => use_tls = parse_bool(&key, &value)?,
            "trust_cert" | "trustservercertificate" => trust_cert = parse_bool(&key, &value)?,
            "instance" => instance = Some(value.into_owned()),
            other => tracing::debug!("忽略未知连接参数: {}", other),
        }
    }

    match url.scheme() {
        "mysql" => Ok(DataSourceOptions::MySQL(MySQLOptions {
            host,
            port: url.port().unwrap_or(3306),
            username,
            password,
            database,
            use_tls,
        })),
        "postgres" | "postgresql" => Ok(DataSourceOptions::Postgres(PostgresOptions {
            host,
            port: url.port().unwrap_or(5432),
            database,
            username,
            password,
            use_tls,
        })),
        "sqlserver" | "mssql" => Ok(DataSourceOptions::SQLServer(SQLServerOptions {
            host,
            port: url.port().unwrap_or(1433),
            database,
            username: (!username.is_empty()).then_some(username),
            password: (!password.is_empty()).then_some(password),
            auth: SQLServerAuth::SqlPassword,
            instance,
            trust_cert,
            encrypt: use_tls,
        })),
        other => Err(DriverError::InvalidField(format!("unsupported scheme '{}'", other))),
    }
}

fn parse_ado(input: &str) -> Result<DataSourceOptions, DriverError> {
    let mut opts = SQLServerOptions::default();
    let mut server_seen = false;

    for (key, value) in ado_pairs(input)? {
        match key.as_str() {
            "server" | "data source" | "address" | "addr" | "network address" => {
                parse_server(&value, &mut opts)?;
                server_seen = true;
            }
            "database" | "initial catalog" => opts.database = value,
            "user id" | "uid" | "user" | "username" | "user name" => opts.username = Some(value),
            "password" | "pwd" => opts.password = Some(value),
            "integrated security" | "trusted_connection" => {
                if parse_bool(&key, &value)? {
                    opts.auth = SQLServerAuth::Integrated;
                }
            }
            "trustservercertificate" | "trust server certificate" => opts.trust_cert = parse_bool(&key, &value)?,
            "encrypt" => opts.encrypt = parse_bool(&key, &value)?,
            other => tracing::debug!("忽略未知连接字段: {}", other),
        }
    }

    if !server_seen {
        return Err(DriverError::MissingField("server".into()));
    }
    Ok(DataSourceOptions::SQLServer(opts))
}

/// 拆分 `key=value;` 序列，键统一为小写，值可用单/双引号包裹（引号内允许 `;`，重复引号转义）
fn ado_pairs(input: &str) -> Result<Vec<(String, String)>, DriverError> {
    let mut pairs = vec![];
    let mut chars = input.chars().peekable();

    while chars.peek().is_some() {
        let mut key = String::new();
        let mut has_value = false;
        for c in chars.by_ref() {
            match c {
                '=' => {
                    has_value = true;
                    break;
                }
                ';' => break,
                _ => key.push(c),
            }
        }

        let key = key.trim().to_ascii_lowercase();
        if !has_value {
            if key.is_empty() {
                continue;
            }
            return Err(DriverError::InvalidField(format!("segment '{}' has no value", key)));
        }
        if key.is_empty() {
            return Err(DriverError::InvalidField("segment without key".into()));
        }

        let value = ado_value(&mut chars, &key)?;
        pairs.push((key, value));
    }

    Ok(pairs)
}

fn ado_value(
    chars: &mut Peekable<Chars<'_>>,
    key: &str,
) -> Result<String, DriverError> {
    while chars.next_if(|c| c.is_whitespace() && *c != ';').is_some() {}

    let quote = match chars.peek() {
        Some(&q) if q == '\'' || q == '"' => q,
        _ => {
            let value: String = chars.by_ref().take_while(|c| *c != ';').collect();
            return Ok(value.trim().to_string());
        }
    };

    chars.next();
    let mut value = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => {
                if chars.next_if_eq(&quote).is_some() {
                    value.push(quote);
                } else {
                    break;
                }
            }
            Some(c) => value.push(c),
            None => return Err(DriverError::InvalidField(format!("unterminated quote in '{}'", key))),
        }
    }

    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
        if !c.is_whitespace() {
            return Err(DriverError::InvalidField(format!("unexpected text after quoted '{}'", key)));
        }
    }
    Ok(value)
}

/// 解析 `tcp:host\instance,port` 形式的服务器地址
fn parse_server(
    value: &str,
    opts: &mut SQLServerOptions,
) -> Result<(), DriverError> {
    let value = value.trim();
    let value = strip_prefix_ignore_case(value, "tcp:").unwrap_or(value);

    let (address, port) = match value.split_once(',') {
        Some((address, port)) => {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| DriverError::InvalidField(format!("port '{}'", port.trim())))?;
            (address, Some(port))
        }
        None => (value, None),
    };

    let (host, instance) = match address.split_once('\\') {
        Some((host, instance)) => (host.trim(), Some(instance.trim())),
        None => (address.trim(), None),
    };

    if host.is_empty() {
        return Err(DriverError::MissingField("server".into()));
    }

    opts.host = match host {
        "." | "(local)" => "localhost".into(),
        other => other.to_string(),
    };
    if let Some(port) = port {
        opts.port = port;
    }
    opts.instance = instance.filter(|name| !name.is_empty()).map(str::to_string);
    Ok(())
}

fn parse_bool(
    key: &str,
    value: &str,
) -> Result<bool, DriverError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "sspi" | "mandatory" | "strict" => Ok(true),
        "false" | "no" | "0" | "optional" => Ok(false),
        _ => Err(DriverError::InvalidField(format!("{} '{}'", key, value))),
    }
}
