//! 目录扫描辅助
//!
//! 按文件名后缀收集目录下的文件，供批量解码和清理使用

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::constants::DECODED_FILE_SUFFIX;

/// 递归扫描目录，收集文件名以指定后缀结尾的文件
///
/// 读不了的目录记一条警告并跳过，不中断整个扫描。
pub fn scan_directory(dir_path: &Path, extensions: &[&str], recurse: bool) -> Vec<PathBuf> {
    let mut result = Vec::new();

    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to read directory {}: {}", dir_path.display(), err);
            return result;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if recurse {
                result.extend(scan_directory(&path, extensions, recurse));
            }
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if extensions.iter().any(|ext| name.ends_with(ext)) {
                result.push(path);
            }
        }
    }

    result
}

/// 查找目录下的解码产物（文件名以 `_.log` 结尾）
pub fn find_decoded_files(dir_path: &Path, recurse: bool) -> Vec<PathBuf> {
    scan_directory(dir_path, &[DECODED_FILE_SUFFIX], recurse)
}
