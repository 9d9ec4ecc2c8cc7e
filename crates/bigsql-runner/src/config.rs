use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{args::Args, error::ConfigError};

/// 运行配置文件（JSON），缺省的项在启动时交互询问
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub log: Option<PathBuf>,
    #[serde(default)]
    pub log_enabled: Option<bool>,
}

/// 运行日志的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChoice {
    Disabled,
    File(PathBuf),
    /// 已决定写日志，只询问路径
    AskPath,
    /// 先询问是否写日志
    Ask,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("加载配置文件: {}", path.display());
        Ok(config)
    }

    /// 命令行参数（含环境变量）覆盖配置文件
    pub fn merge_args(
        mut self,
        args: &Args,
    ) -> Self {
        if args.connection.is_some() {
            self.connection = args.connection.clone();
        }
        if args.file.is_some() {
            self.file = args.file.clone();
        }
        if args.log.is_some() {
            self.log = args.log.clone();
            self.log_enabled = Some(true);
        }
        if args.no_log {
            self.log = None;
            self.log_enabled = Some(false);
        }
        self
    }

    pub fn log_choice(&self) -> LogChoice {
        match (self.log_enabled, &self.log) {
            (Some(false), _) => LogChoice::Disabled,
            (_, Some(path)) => LogChoice::File(path.clone()),
            (Some(true), None) => LogChoice::AskPath,
            (None, None) => LogChoice::Ask,
        }
    }
}
