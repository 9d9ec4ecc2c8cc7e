use std::{
    io::{self, IsTerminal, Stdout, Write},
    time::Duration,
};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use serde::Serialize;

use crate::batch::{RunEnd, RunSummary};

/// 错误级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// 单个批次失败，继续执行
    Batch,
    /// 执行中止
    Fatal,
    /// 释放连接或日志时失败
    Cleanup,
}

/// 执行过程的输出端
pub trait Reporter {
    fn status(
        &mut self,
        message: &str,
    );

    fn progress(
        &mut self,
        affected: u64,
    );

    fn error(
        &mut self,
        message: &str,
        severity: Severity,
    );

    fn summary(
        &mut self,
        summary: &RunSummary,
    );

    fn elapsed(
        &mut self,
        elapsed: Duration,
    );
}

/// 面向人的控制台输出
///
/// 终端上进度行原地刷新；重定向到文件或管道时每次进度输出一行。
pub struct ConsoleReporter<W: Write> {
    out: W,
    in_place: bool,
    eol: &'static str,
    line_open: bool,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        let terminal = io::stdout().is_terminal();
        Self::new(io::stdout(), terminal)
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// `terminal` 为 true 时原地刷新进度，并使用 `\r\n` 换行（执行期间终端处于 raw 模式）
    pub fn new(
        out: W,
        terminal: bool,
    ) -> Self {
        Self {
            out,
            in_place: terminal,
            eol: if terminal { "\r\n" } else { "\n" },
            line_open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn close_line(&mut self) -> io::Result<()> {
        if self.line_open {
            self.out.write_all(self.eol.as_bytes())?;
            self.line_open = false;
        }
        Ok(())
    }

    fn write_line(
        &mut self,
        text: &str,
    ) -> io::Result<()> {
        self.close_line()?;
        write!(self.out, "{}{}", text, self.eol)?;
        self.out.flush()
    }

    fn write_progress(
        &mut self,
        text: &str,
    ) -> io::Result<()> {
        if !self.in_place {
            return self.write_line(text);
        }

        if self.line_open {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::UntilNewLine), Print(text))?;
        } else {
            write!(self.out, "{}", text)?;
            self.line_open = true;
        }
        self.out.flush()
    }

    fn write_summary(
        &mut self,
        summary: &RunSummary,
    ) -> io::Result<()> {
        self.close_line()?;
        match &summary.end {
            RunEnd::Exhausted => {}
            RunEnd::Cancelled => self.write_line("Cancelled")?,
            RunEnd::Aborted(reason) => self.write_line(&format!("Aborted: {}", reason))?,
        }
        if summary.failed > 0 {
            self.write_line(&format!("{} batch(es) failed", summary.failed))?;
        }
        self.write_line("Completed")?;
        self.write_line(&format!("Total {} rows added to database", summary.affected))
    }
}

fn report_io(result: io::Result<()>) {
    if let Err(err) = result {
        tracing::warn!("写入控制台失败: {}", err);
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn status(
        &mut self,
        message: &str,
    ) {
        report_io(self.write_line(message));
    }

    fn progress(
        &mut self,
        affected: u64,
    ) {
        report_io(self.write_progress(&format!("Added {} row(s)", affected)));
    }

    /// 执行期的错误原样输出，`[Error]` 前缀只用于交互提示
    fn error(
        &mut self,
        message: &str,
        _severity: Severity,
    ) {
        report_io(self.write_line(message));
    }

    fn summary(
        &mut self,
        summary: &RunSummary,
    ) {
        report_io(self.write_summary(summary));
    }

    fn elapsed(
        &mut self,
        elapsed: Duration,
    ) {
        report_io(self.write_line(&format!("Time elapsed: {}", format_elapsed(elapsed))));
    }
}

/// 进度输出消息（JSON Lines）
#[derive(Debug, Serialize)]
pub struct ProgressMessage {
    kind: MessageKind,
    data: serde_json::Value,
}

/// 消息类型
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Progress,
    Status,
    Error,
    Completed,
}

/// 面向程序的输出，每个事件一行 JSON
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(
        &mut self,
        kind: MessageKind,
        data: serde_json::Value,
    ) {
        let msg = ProgressMessage { kind, data };
        if let Ok(json) = serde_json::to_string(&msg) {
            report_io(writeln!(self.out, "{}", json).and_then(|_| self.out.flush()));
        }
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn status(
        &mut self,
        message: &str,
    ) {
        self.emit(MessageKind::Status, serde_json::json!({ "message": message }));
    }

    fn progress(
        &mut self,
        affected: u64,
    ) {
        self.emit(MessageKind::Progress, serde_json::json!({ "affected_rows": affected }));
    }

    fn error(
        &mut self,
        message: &str,
        severity: Severity,
    ) {
        self.emit(
            MessageKind::Error,
            serde_json::json!({
                "severity": severity,
                "message": message,
            }),
        );
    }

    fn summary(
        &mut self,
        summary: &RunSummary,
    ) {
        let (status, reason) = match &summary.end {
            RunEnd::Exhausted => ("completed", None),
            RunEnd::Cancelled => ("cancelled", None),
            RunEnd::Aborted(reason) => ("aborted", Some(reason.as_str())),
        };
        self.emit(
            MessageKind::Completed,
            serde_json::json!({
                "status": status,
                "reason": reason,
                "affected_rows": summary.affected,
                "executed_batches": summary.executed,
                "failed_batches": summary.failed,
            }),
        );
    }

    fn elapsed(
        &mut self,
        elapsed: Duration,
    ) {
        self.emit(
            MessageKind::Status,
            serde_json::json!({
                "elapsed": format_elapsed(elapsed),
                "elapsed_seconds": format!("{:.2}", elapsed.as_secs_f64()),
            }),
        );
    }
}

/// 格式化为 `HH:MM:SS.CC`，小时按总数计，不会在 24 小时回绕
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60,
        elapsed.subsec_millis() / 10
    )
}
