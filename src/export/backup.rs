//! 目录备份
//!
//! 把整个书库目录递归打包为ZIP，条目名为相对于根目录、以 `/` 分隔的路径。

use crate::config::check_compression_level;
use crate::epub::error::Result;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// 打包目录
///
/// 条目按相对路径排序，文件时间戳固定，相同的目录内容得到相同的字节。
///
/// # 参数
/// * `root` - 要备份的目录
/// * `level` - 0为存储，1-9为deflate级别
///
/// # 返回值
/// * `Result<Vec<u8>>` - ZIP字节
pub fn backup_directory(root: &Path, level: u32) -> Result<Vec<u8>> {
    check_compression_level(level)?;

    let mut files = Vec::new();
    collect_files(root, &mut files)?;

    let mut entries: Vec<(String, PathBuf)> = files
        .into_iter()
        .filter_map(|path| entry_name(root, &path).map(|name| (name, path)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let options = SimpleFileOptions::default().last_modified_time(DateTime::default());
    let options = match level {
        0 => options.compression_method(CompressionMethod::Stored),
        level => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(level as i64)),
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, path) in &entries {
        let data = fs::read(path)?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&data)?;
    }

    let bytes = zip.finish()?.into_inner();
    tracing::info!(root = %root.display(), files = entries.len(), "目录备份完成");
    Ok(bytes)
}

/// 递归收集目录下的所有文件
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// 相对于根目录的条目名，无法表示为UTF-8时跳过
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    match parts {
        Some(parts) => Some(parts.join("/")),
        None => {
            tracing::warn!("跳过非UTF-8路径: {}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::error::EpubError;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_backup_contents_are_relative_and_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("covers")).unwrap();
        fs::write(dir.path().join("covers/1.jpg"), b"jpg").unwrap();
        fs::write(dir.path().join("library.yaml"), b"books: {}").unwrap();

        let bytes = backup_directory(dir.path(), 6).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["covers/1.jpg", "library.yaml"]);

        let mut file = archive.by_name("covers/1.jpg").unwrap();
        assert_eq!(file.compression(), CompressionMethod::Deflated);
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"jpg");
    }

    #[test]
    fn test_backup_is_reproducible() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        assert_eq!(
            backup_directory(dir.path(), 0).unwrap(),
            backup_directory(dir.path(), 0).unwrap()
        );
        assert!(matches!(backup_directory(dir.path(), 12), Err(EpubError::ConfigError(_))));
    }
}
