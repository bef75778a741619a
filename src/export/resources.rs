//! 书库中的封面与插图
//!
//! 封面位于 `{library_root}/covers/{book_id}.jpg`，
//! 插图位于 `{library_root}/epub/{book_id}/images/`。
//! 这些资源可有可无：不存在或读取失败时记录日志并跳过。

use crate::export::epub::{CoverImage, ImageResource};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 封面文件路径
pub fn cover_path(library_root: &Path, book_id: i64) -> PathBuf {
    library_root.join("covers").join(format!("{}.jpg", book_id))
}

/// 插图目录路径
pub fn images_dir(library_root: &Path, book_id: i64) -> PathBuf {
    library_root
        .join("epub")
        .join(book_id.to_string())
        .join("images")
}

/// 读取封面
pub async fn load_cover(library_root: &Path, book_id: i64) -> Option<CoverImage> {
    let path = cover_path(library_root, book_id);
    match tokio::fs::read(&path).await {
        Ok(data) if data.is_empty() => {
            tracing::warn!("封面文件为空: {}", path.display());
            None
        }
        Ok(data) => Some(CoverImage::new(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("没有封面: {}", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("无法读取封面 {}: {}", path.display(), e);
            None
        }
    }
}

/// 读取插图目录下的所有文件，按文件名排序
pub async fn load_images(library_root: &Path, book_id: i64) -> Vec<ImageResource> {
    let dir = images_dir(library_root, book_id);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("没有插图目录: {}", dir.display());
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("无法读取插图目录 {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut images = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("遍历插图目录 {} 失败: {}", dir.display(), e);
                break;
            }
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()).map(str::to_string) else {
            tracing::warn!("跳过非UTF-8文件名的插图: {}", path.display());
            continue;
        };

        match tokio::fs::read(&path).await {
            Ok(data) => images.push(ImageResource::new(name, data)),
            Err(e) => tracing::warn!("无法读取插图 {}: {}", path.display(), e),
        }
    }

    images.sort_by(|a, b| a.name.cmp(&b.name));
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_resources_are_omitted() {
        let dir = TempDir::new().unwrap();
        assert!(load_cover(dir.path(), 7).await.is_none());
        assert!(load_images(dir.path(), 7).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_cover_and_sorted_images() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("covers")).unwrap();
        std::fs::write(cover_path(dir.path(), 7), [0xFF, 0xD8, 0xFF]).unwrap();

        let images = images_dir(dir.path(), 7);
        std::fs::create_dir_all(images.join("nested")).unwrap();
        std::fs::write(images.join("b.png"), [2]).unwrap();
        std::fs::write(images.join("a.jpg"), [1]).unwrap();

        let cover = load_cover(dir.path(), 7).await.unwrap();
        assert_eq!(cover.media_type(), "image/jpeg");

        let names: Vec<String> = load_images(dir.path(), 7).await.into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }
}
