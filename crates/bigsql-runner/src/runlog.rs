use std::{
    ffi::OsStr,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::Local;

use crate::error::LogFileError;

/// 运行日志允许的扩展名（不区分大小写）
pub const LOG_EXTENSIONS: &[&str] = &["txt", "log"];

/// 一次脚本执行的文本日志
///
/// 创建时写入头部；批次错误逐条写入并立即落盘；结束时写入完成行和累计行数。
pub struct RunLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl RunLog {
    pub fn create(
        path: &Path,
        script: &Path,
    ) -> Result<Self, LogFileError> {
        if !has_log_extension(path) {
            return Err(LogFileError::Extension);
        }

        let file = File::create(path)?;
        let mut log = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        };
        log.header(script)?;

        tracing::info!("运行日志: {}", path.display());
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header(
        &mut self,
        script: &Path,
    ) -> io::Result<()> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.writer, "*************** [{}]****************", now)?;
        writeln!(self.writer, "Running {}...", script.display())?;
        self.writer.flush()
    }

    pub fn error(
        &mut self,
        message: &str,
    ) -> io::Result<()> {
        writeln!(self.writer, "{}", message)?;
        self.writer.flush()
    }

    pub fn completed(
        &mut self,
        affected: u64,
    ) -> io::Result<()> {
        writeln!(self.writer, "Completed")?;
        writeln!(self.writer, "Total {} rows added to database", affected)?;
        self.writer.flush()
    }

    pub fn close(mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}

fn has_log_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| LOG_EXTENSIONS.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_txt_and_log_only() {
        assert!(has_log_extension(Path::new("c:/run.txt")));
        assert!(has_log_extension(Path::new("run.LOG")));
        assert!(!has_log_extension(Path::new("run.csv")));
        assert!(!has_log_extension(Path::new("run")));
        assert!(!has_log_extension(Path::new(".txt")));
        assert!(!has_log_extension(Path::new("")));
    }

    #[test]
    fn rejects_bad_extension_without_creating_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        assert!(matches!(
            RunLog::create(&path, Path::new("big.sql")),
            Err(LogFileError::Extension)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("run.txt");
        assert!(matches!(
            RunLog::create(&path, Path::new("big.sql")),
            Err(LogFileError::Io(_))
        ));
    }

    #[test]
    fn writes_header_errors_and_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.txt");

        let mut log = RunLog::create(&path, Path::new("big.sql")).unwrap();
        assert_eq!(log.path(), path);
        log.error("no such table: t").unwrap();
        log.completed(42).unwrap();
        log.close().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("*************** ["));
        assert!(lines[0].ends_with("]****************"));
        assert_eq!(lines[1], "Running big.sql...");
        assert_eq!(lines[2], "no such table: t");
        assert_eq!(lines[3], "Completed");
        assert_eq!(lines[4], "Total 42 rows added to database");
    }

    #[test]
    fn errors_are_on_disk_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let mut log = RunLog::create(&path, Path::new("big.sql")).unwrap();
        log.error("boom").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("boom\n"));
    }
}
