use std::{
    fmt::Display,
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use bigsql_core::DriverError;

use crate::{error::PromptError, runlog::RunLog, script::ScriptReader};

const CONNECTION_EXAMPLE: &str = "Server=localhost;Database=DatabaseName;User Id=sa;Password=123;";
const SCRIPT_EXAMPLE: &str = r"c:\bigsqlscript.sql";
const LOG_EXAMPLE: &str = r"c:\log.txt";

/// 交互式收集运行参数，每一项都会反复询问直到输入有效
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(
        input: R,
        output: W,
    ) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn notes(&mut self) -> io::Result<()> {
        writeln!(self.output, "NOTES:")?;
        writeln!(self.output, "\t1. To cancel running the sql script. Please press any key to do")?;
        writeln!(self.output, "\t2. To terminate the console. Please press ESC key")?;
        self.output.flush()
    }

    pub fn error(
        &mut self,
        message: impl Display,
    ) -> io::Result<()> {
        writeln!(self.output, "[Error] {}", message)?;
        self.output.flush()
    }

    fn section(
        &mut self,
        title: &str,
    ) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "****************** {} ******************", title)
    }

    fn ask(
        &mut self,
        example: &str,
        label: &str,
    ) -> Result<String, PromptError> {
        writeln!(self.output, "e.g: {}", example)?;
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// 询问连接字符串，直到 `connect` 返回可用连接
    pub fn connection<T, F>(
        &mut self,
        mut connect: F,
    ) -> Result<T, PromptError>
    where
        F: FnMut(&str) -> Result<T, DriverError>,
    {
        self.section("Connection String Input Data")?;
        loop {
            let input = self.ask(CONNECTION_EXAMPLE, "Connection String: ")?;
            match connect(&input) {
                Ok(conn) => return Ok(conn),
                Err(err) => {
                    tracing::warn!("连接失败: {}", err);
                    self.error(err)?;
                }
            }
        }
    }

    pub fn script(&mut self) -> Result<(PathBuf, ScriptReader<BufReader<File>>), PromptError> {
        self.section("Big Sql Script File Path Input Data")?;
        loop {
            let input = self.ask(SCRIPT_EXAMPLE, "Big Sql Script File Path: ")?;
            let input = input.trim();
            if input.is_empty() {
                continue;
            }
            let path = PathBuf::from(input);
            match ScriptReader::open(&path) {
                Ok(reader) => return Ok((path, reader)),
                Err(err) => self.error(err)?,
            }
        }
    }

    pub fn enable_log(&mut self) -> Result<bool, PromptError> {
        self.section("Enabled Log To File Input Data")?;
        loop {
            let answer = self.ask("yes or no", "Enable log to file(yes/no)? ")?;
            match parse_yes_no(&answer) {
                Some(enabled) => return Ok(enabled),
                None => self.error("Please enter either of two values following: yes or no")?,
            }
        }
    }

    pub fn log_file(
        &mut self,
        script: &Path,
    ) -> Result<RunLog, PromptError> {
        self.section("Log File Path Input Data")?;
        loop {
            let input = self.ask(LOG_EXAMPLE, "Log File Path: ")?;
            match RunLog::create(Path::new(input.trim()), script) {
                Ok(log) => return Ok(log),
                Err(err) => self.error(err)?,
            }
        }
    }
}

/// 只接受 yes / no，不区分大小写
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}
