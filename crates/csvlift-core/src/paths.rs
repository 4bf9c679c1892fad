use std::{fs::create_dir_all, path::PathBuf};

/// 获取 csvlift 根目录（~/.csvlift）
///
/// Fallback: 如果 home_dir 失败，使用 ./.csvlift
pub fn root_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".csvlift"))
        .unwrap_or_else(|| PathBuf::from(".csvlift"))
}

/// 获取日志目录（~/.csvlift/logs）
pub fn logs_dir() -> PathBuf {
    let dir = root_dir().join("logs");
    let _ = create_dir_all(&dir);
    dir
}
