use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::PathBuf,
};

use bigsql_core::{DataSourceOptions, DatabaseSession, DriverError, create_connection};

use crate::{
    batch::{BatchExecutor, RunSummary},
    config::{LogChoice, RunConfig},
    console::{Reporter, Severity},
    error::PromptError,
    keys::CancelSignal,
    prompt::Prompter,
    runlog::RunLog,
    script::ScriptReader,
};

/// 解析连接字符串并打开一个已校验的会话，返回会话和不含密码的端点描述
pub fn open_connection(input: &str) -> Result<(Box<dyn DatabaseSession>, String), DriverError> {
    let opts: DataSourceOptions = input.parse()?;
    let endpoint = opts.endpoint();
    tracing::info!("正在连接 {} 数据库: {}", opts.kind().label(), endpoint);
    let session = create_connection(&opts)?;
    tracing::info!("数据库连接成功");
    Ok((session, endpoint))
}

/// 一次运行所需的全部资源：连接、脚本、可选的运行日志
pub struct RunSession {
    session: Box<dyn DatabaseSession>,
    endpoint: String,
    script_path: PathBuf,
    script: ScriptReader<BufReader<File>>,
    log: Option<RunLog>,
}

impl RunSession {
    pub fn new(
        session: Box<dyn DatabaseSession>,
        endpoint: String,
        script_path: PathBuf,
        script: ScriptReader<BufReader<File>>,
        log: Option<RunLog>,
    ) -> Self {
        Self {
            session,
            endpoint,
            script_path,
            script,
            log,
        }
    }

    /// 按配置准备资源，缺失或无效的项交互询问
    pub fn establish<R: BufRead, W: Write>(
        config: &RunConfig,
        prompter: &mut Prompter<R, W>,
    ) -> Result<Self, PromptError> {
        // 1. 数据库连接
        let (session, endpoint) = match config.connection.as_deref() {
            Some(input) => match open_connection(input) {
                Ok(opened) => opened,
                Err(err) => {
                    tracing::warn!("配置的连接不可用: {}", err);
                    prompter.error(&err)?;
                    prompter.connection(open_connection)?
                }
            },
            None => prompter.connection(open_connection)?,
        };

        // 2. 脚本文件
        let (script_path, script) = match &config.file {
            Some(path) => match ScriptReader::open(path) {
                Ok(reader) => (path.clone(), reader),
                Err(err) => {
                    prompter.error(&err)?;
                    prompter.script()?
                }
            },
            None => prompter.script()?,
        };

        // 3. 运行日志
        let log = match config.log_choice() {
            LogChoice::Disabled => None,
            LogChoice::File(path) => match RunLog::create(&path, &script_path) {
                Ok(log) => Some(log),
                Err(err) => {
                    prompter.error(&err)?;
                    Some(prompter.log_file(&script_path)?)
                }
            },
            LogChoice::AskPath => Some(prompter.log_file(&script_path)?),
            LogChoice::Ask => {
                if prompter.enable_log()? {
                    Some(prompter.log_file(&script_path)?)
                } else {
                    None
                }
            }
        };

        Ok(Self::new(session, endpoint, script_path, script, log))
    }

    /// 执行脚本并释放所有资源，无论循环因何结束
    pub fn run(
        self,
        reporter: &mut dyn Reporter,
        cancel: &mut dyn CancelSignal,
    ) -> RunSummary {
        let Self {
            mut session,
            endpoint,
            script_path,
            mut script,
            mut log,
        } = self;

        tracing::info!("开始执行脚本: {} -> {}", script_path.display(), endpoint);
        reporter.status("Running...");

        // 1. 逐批执行
        let summary = BatchExecutor::new(session.as_mut(), &mut *reporter)
            .with_log(log.as_mut())
            .run(&mut script, cancel);

        // 2. 写入完成信息
        if let Some(log) = log.as_mut() {
            if let Err(err) = log.completed(summary.affected) {
                tracing::warn!("写入运行日志失败: {}", err);
            }
        }
        reporter.summary(&summary);

        // 3. 释放脚本、连接和日志
        drop(script);
        if let Err(err) = session.close() {
            tracing::warn!("关闭连接失败: {}", err);
            reporter.error(&err.to_string(), Severity::Cleanup);
        }
        if let Some(log) = log {
            if let Err(err) = log.close() {
                tracing::warn!("关闭运行日志失败: {}", err);
                reporter.error(&format!("Failed to close log file: {}", err), Severity::Cleanup);
            }
        }

        summary
    }
}
