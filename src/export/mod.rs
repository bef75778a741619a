//! 导出
//!
//! 从存储读取章节森林和正文，连同书库中的封面与插图打包为EPUB，另提供书库目录备份。

pub mod backup;
pub mod epub;
pub mod resources;

pub use backup::backup_directory;
pub use epub::{
    AssembleOptions, CoverImage, EpubAssembler, ImageResource, PackagePlan, PackageResources,
};

use crate::config::PackConfig;
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::BookMetadata;
use crate::progress::Progress;
use crate::store::{BookStore, StoreError};
use async_trait::async_trait;

/// 章节正文的来源
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// 按href取得章节HTML正文
    async fn resolve(&self, href: &str) -> Result<String>;
}

/// 以章节ID为href，从存储读取正文
pub struct StoreResolver<'a> {
    store: &'a dyn BookStore,
    book_id: i64,
}

impl<'a> StoreResolver<'a> {
    pub fn new(store: &'a dyn BookStore, book_id: i64) -> Self {
        Self { store, book_id }
    }
}

#[async_trait]
impl ContentResolver for StoreResolver<'_> {
    async fn resolve(&self, href: &str) -> Result<String> {
        let resolution = |source: StoreError| EpubError::Resolution {
            href: href.to_string(),
            source: Box::new(source),
        };

        match self.store.get_chapter(self.book_id, href).await {
            Ok(Some(record)) => Ok(record.content),
            Ok(None) => Err(resolution(StoreError::ChapterNotFound(href.to_string()))),
            Err(e) => Err(resolution(e)),
        }
    }
}

/// 导出存储中的一本书
///
/// # 参数
/// * `store` - 书籍存储
/// * `book_id` - 书籍ID
/// * `metadata` - 写入包文件的元数据
/// * `config` - 打包配置，决定压缩、并发、书库根目录等
/// * `progress` - 进度接收者
///
/// # 返回值
/// * `Result<Vec<u8>>` - EPUB字节
pub async fn export_book(
    store: &dyn BookStore,
    book_id: i64,
    metadata: &BookMetadata,
    config: &PackConfig,
    progress: &dyn Progress,
) -> Result<Vec<u8>> {
    let assembler = EpubAssembler::new(AssembleOptions::from_config(config))?;
    let forest = store.chapter_tree(book_id).await?;

    let resources = PackageResources {
        cover: resources::load_cover(&config.library_root, book_id).await,
        images: resources::load_images(&config.library_root, book_id).await,
    };
    tracing::debug!(
        book_id,
        has_cover = resources.cover.is_some(),
        images = resources.images.len(),
        "开始导出"
    );

    let resolver = StoreResolver::new(store, book_id);
    assembler
        .assemble(metadata, &forest, &resources, &resolver, progress)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use crate::store::{MemoryStore, NewChapter};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_resolver_missing_chapter() {
        let store = MemoryStore::new();
        let book_id = store.add_book(&BookMetadata::new("书", "作者")).await.unwrap();
        let resolver = StoreResolver::new(&store, book_id);

        match resolver.resolve("99").await {
            Err(EpubError::Resolution { href, .. }) => assert_eq!(href, "99"),
            other => panic!("期望内容查找错误, 得到: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_export_book_from_store() {
        let library = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let metadata = BookMetadata::new("书", "作者");
        let book_id = store.add_book(&metadata).await.unwrap();
        let parent = store
            .add_chapter(
                book_id,
                NewChapter {
                    label: "第一章".to_string(),
                    source_href: String::new(),
                    content: "<p>一</p>".to_string(),
                },
                None,
            )
            .await
            .unwrap();
        store
            .add_chapter(
                book_id,
                NewChapter {
                    label: "第一节".to_string(),
                    source_href: String::new(),
                    content: "<p>一.一</p>".to_string(),
                },
                Some(&parent),
            )
            .await
            .unwrap();

        let config = PackConfig {
            library_root: library.path().to_path_buf(),
            identifier: Some("urn:uuid:fixed".to_string()),
            ..PackConfig::default_config()
        };

        let first = export_book(&store, book_id, &metadata, &config, &SilentProgress)
            .await
            .unwrap();
        let second = export_book(&store, book_id, &metadata, &config, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_export_unknown_book() {
        let store = MemoryStore::new();
        let result = export_book(
            &store,
            42,
            &BookMetadata::new("书", "作者"),
            &PackConfig::default_config(),
            &SilentProgress,
        )
        .await;
        assert!(matches!(result, Err(EpubError::Store(StoreError::BookNotFound(42)))));
    }
}
