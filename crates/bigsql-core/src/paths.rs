use std::{fs::create_dir_all, path::PathBuf};

/// 获取 bigsql 根目录（~/.bigsql）
///
/// Fallback: 如果 home_dir 失败，使用 ./.bigsql
pub fn root_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".bigsql"))
        .unwrap_or_else(|| PathBuf::from(".bigsql"))
}

/// 获取诊断日志目录（~/.bigsql/logs）
pub fn logs_dir() -> PathBuf {
    let dir = root_dir().join("logs");
    let _ = create_dir_all(&dir);
    dir
}
