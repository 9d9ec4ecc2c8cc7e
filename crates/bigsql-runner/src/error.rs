use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("The big sql script file path '{}' hasn't existed in your hard drive", .0.display())]
    NotFound(PathBuf),

    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum LogFileError {
    #[error("Please enter valid file path and has extension .txt or .log")]
    Extension,

    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Input closed before setup completed")]
    Closed,

    #[error("Console error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Console error: {0}")]
    Io(#[from] io::Error),
}
