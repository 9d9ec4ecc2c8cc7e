use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::error::ScriptError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 逐行、只进读取 SQL 脚本
pub struct ScriptReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: u64,
}

impl ScriptReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ScriptError> {
        if !path.is_file() {
            return Err(ScriptError::NotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        tracing::info!("打开脚本文件: {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ScriptReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
        }
    }

    /// 读取下一行（不含换行符），到达文件末尾返回 `None`
    ///
    /// 非 UTF-8 内容按有损方式解码，保证本地编码的脚本仍可执行。
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        let mut bytes = self.buf.as_slice();
        if self.line_number == 0 {
            bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        }
        self.line_number += 1;

        Ok(Some(String::from_utf8_lossy(bytes).into_owned()))
    }

    /// 已读取的行数
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn lines(input: &[u8]) -> Vec<String> {
        let mut reader = ScriptReader::new(Cursor::new(input.to_vec()));
        let mut out = vec![];
        while let Some(line) = reader.next_line().unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn strips_line_terminators() {
        assert_eq!(lines(b"a\r\nb\nc"), vec!["a", "b", "c"]);
        assert_eq!(lines(b"a\n\nb\n"), vec!["a", "", "b"]);
        assert!(lines(b"").is_empty());
    }

    #[test]
    fn drops_bom_on_first_line_only() {
        assert_eq!(lines(b"\xEF\xBB\xBFSELECT 1\n\xEF\xBB\xBFx"), vec!["SELECT 1", "\u{feff}x"]);
    }

    #[test]
    fn decodes_invalid_utf8_lossily() {
        assert_eq!(lines(b"N'caf\xE9'"), vec!["N'caf\u{fffd}'"]);
    }

    #[test]
    fn counts_lines() {
        let mut reader = ScriptReader::new(Cursor::new(b"1\n2\n".to_vec()));
        assert_eq!(reader.line_number(), 0);
        reader.next_line().unwrap();
        reader.next_line().unwrap();
        assert_eq!(reader.next_line().unwrap(), None);
        assert_eq!(reader.line_number(), 2);
    }

    #[test]
    fn open_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.sql");
        assert!(matches!(ScriptReader::open(&missing), Err(ScriptError::NotFound(p)) if p == missing));

        // 目录不是脚本文件
        assert!(matches!(ScriptReader::open(dir.path()), Err(ScriptError::NotFound(_))));
    }

    #[test]
    fn open_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sql");
        std::fs::write(&path, "SELECT 1\nGO\n").unwrap();

        let mut reader = ScriptReader::open(&path).unwrap();
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("SELECT 1"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("GO"));
        assert_eq!(reader.next_line().unwrap(), None);
    }
}
