use std::io::BufRead;

use bigsql_core::DatabaseSession;

use crate::{
    console::{Reporter, Severity},
    keys::CancelSignal,
    runlog::RunLog,
    script::ScriptReader,
};

/// 批次分隔符，区分大小写，只看行尾
pub const DELIMITER: &str = "GO";

/// 正在累积的批次文本
#[derive(Debug, Default)]
pub struct PendingBatch {
    text: String,
}

impl PendingBatch {
    /// 追加一行
    ///
    /// 以一个空格拼接到缓冲并去除首尾空白；拼接结果以 `GO` 结尾时去掉分隔符，
    /// 返回完整批次（去除首尾空白）并清空缓冲，否则返回 `None`。
    pub fn push(
        &mut self,
        line: &str,
    ) -> Option<String> {
        if self.text.is_empty() {
            self.text.push_str(line.trim_start());
        } else {
            self.text.push(' ');
            self.text.push_str(line);
        }
        let len = self.text.trim_end().len();
        self.text.truncate(len);

        let batch = self.text.strip_suffix(DELIMITER)?.trim().to_string();
        self.text.clear();
        Some(batch)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// 循环结束原因
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunEnd {
    /// 脚本读完
    #[default]
    Exhausted,
    /// 用户按键取消
    Cancelled,
    /// 读取脚本失败或连接不可用
    Aborted(String),
}

/// 一次执行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 累计影响行数
    pub affected: u64,
    /// 成功执行的批次数
    pub executed: u64,
    /// 失败后跳过的批次数
    pub failed: u64,
    pub end: RunEnd,
}

/// 逐行读取脚本，按 `GO` 切分批次并在同一个会话上顺序执行
pub struct BatchExecutor<'a> {
    session: &'a mut dyn DatabaseSession,
    reporter: &'a mut dyn Reporter,
    log: Option<&'a mut RunLog>,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(
        session: &'a mut dyn DatabaseSession,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        Self {
            session,
            reporter,
            log: None,
        }
    }

    pub fn with_log(
        mut self,
        log: Option<&'a mut RunLog>,
    ) -> Self {
        self.log = log;
        self
    }

    pub fn run<R: BufRead>(
        &mut self,
        script: &mut ScriptReader<R>,
        cancel: &mut dyn CancelSignal,
    ) -> RunSummary {
        let mut pending = PendingBatch::default();
        let mut summary = RunSummary::default();

        loop {
            // 每读一行之前检查是否取消
            if cancel.cancelled() {
                tracing::info!("收到按键，取消执行，已读取 {} 行", script.line_number());
                summary.end = RunEnd::Cancelled;
                break;
            }

            let line = match script.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    let message = format!("Failed to read script: {}", err);
                    tracing::error!("读取脚本第 {} 行失败: {}", script.line_number() + 1, err);
                    self.fail(&message, Severity::Fatal);
                    summary.end = RunEnd::Aborted(message);
                    break;
                }
            };

            let Some(batch) = pending.push(&line) else {
                continue;
            };
            if batch.is_empty() {
                tracing::debug!("第 {} 行: 空批次，跳过", script.line_number());
                continue;
            }

            match self.session.exec(&batch) {
                Ok(resp) => {
                    summary.executed += 1;
                    summary.affected += resp.affected;
                    tracing::debug!(
                        "第 {} 批（第 {} 行）执行成功，影响 {} 行，累计 {} 行",
                        summary.executed + summary.failed,
                        script.line_number(),
                        resp.affected,
                        summary.affected
                    );
                    if summary.affected > 0 {
                        self.reporter.progress(summary.affected);
                    }
                }
                Err(err) if err.is_recoverable() => {
                    summary.failed += 1;
                    tracing::warn!("第 {} 行: 批次执行失败: {}", script.line_number(), err);
                    self.fail(&err.to_string(), Severity::Batch);
                }
                Err(err) => {
                    tracing::error!("第 {} 行: 连接不可用，停止执行: {}", script.line_number(), err);
                    let message = err.to_string();
                    self.fail(&message, Severity::Fatal);
                    summary.end = RunEnd::Aborted(message);
                    break;
                }
            }
        }

        if summary.end == RunEnd::Exhausted && !pending.is_empty() {
            tracing::warn!("脚本末尾有未以 {} 结束的语句，未执行", DELIMITER);
        }
        tracing::info!(
            "执行结束: {:?}，成功 {} 批，失败 {} 批，累计影响 {} 行",
            summary.end,
            summary.executed,
            summary.failed,
            summary.affected
        );

        summary
    }

    fn fail(
        &mut self,
        message: &str,
        severity: Severity,
    ) {
        self.reporter.error(message, severity);
        if let Some(log) = self.log.as_deref_mut() {
            if let Err(err) = log.error(message) {
                tracing::warn!("写入运行日志失败: {}", err);
            }
        }
    }
}
