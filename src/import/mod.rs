//! 导入
//!
//! 把外部书籍（目前为EPUB）逐章写入存储，得到以存储ID为href的章节森林。

pub mod epub;
pub mod walker;

pub use self::epub::EpubSource;
pub use walker::{ingest, ChapterSink, SectionResolver, StoreSink};

use crate::epub::error::Result;
use crate::epub::opf::BookMetadata;
use crate::epub::tree::ChapterNode;
use crate::progress::Progress;
use crate::store::{BookStore, ChapterRecord};
use async_trait::async_trait;

/// 可导入的书籍来源：元数据、目录以及按href取得章节正文
#[async_trait]
pub trait TocSource: SectionResolver {
    async fn metadata(&self) -> Result<BookMetadata>;

    /// 目录，href为来源内的引用
    async fn toc(&self) -> Result<Vec<ChapterNode>>;
}

/// 导入结果
#[derive(Debug, Clone)]
pub struct ImportedBook {
    pub book_id: i64,
    /// 带有存储分配的书籍ID
    pub metadata: BookMetadata,
    /// href已替换为章节ID的目录
    pub toc: Vec<ChapterNode>,
    /// 文档顺序中的第一个章节，目录为空时为None
    pub first_chapter: Option<ChapterRecord>,
}

/// 导入一本书
///
/// 新建书籍，按前序写入全部章节，再读取第一个章节。
///
/// # 参数
/// * `source` - 书籍来源
/// * `store` - 目标存储
/// * `progress` - 进度接收者
pub async fn import_book<S: TocSource>(
    source: &S,
    store: &dyn BookStore,
    progress: &dyn Progress,
) -> Result<ImportedBook> {
    let metadata = source.metadata().await?;
    let book_id = store.add_book(&metadata).await?;
    tracing::info!(book_id, title = %metadata.title, "开始导入");

    let mut toc = source.toc().await?;
    let sink = StoreSink::new(store, book_id);
    ingest(&mut toc, source, &sink, progress).await?;

    let first_chapter = store.get_first_chapter(book_id).await?;
    Ok(ImportedBook {
        book_id,
        metadata: metadata.with_book_id(book_id),
        toc,
        first_chapter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::error::EpubError;
    use crate::progress::SilentProgress;
    use crate::store::MemoryStore;

    struct FixedSource;

    #[async_trait]
    impl SectionResolver for FixedSource {
        async fn resolve_section(&self, href: &str) -> Result<String> {
            Ok(format!("<p>{}</p>", href))
        }
    }

    #[async_trait]
    impl TocSource for FixedSource {
        async fn metadata(&self) -> Result<BookMetadata> {
            Ok(BookMetadata::new("书", "作者"))
        }

        async fn toc(&self) -> Result<Vec<ChapterNode>> {
            Ok(vec![
                ChapterNode::new("一", "1.html").with_subitems(vec![ChapterNode::new("一.一", "1.html#a")]),
                ChapterNode::new("二", "2.html"),
            ])
        }
    }

    #[tokio::test]
    async fn test_import_book_persists_and_rebuilds() {
        let store = MemoryStore::new();
        let imported = import_book(&FixedSource, &store, &SilentProgress).await.unwrap();

        assert_eq!(imported.metadata.book_id, Some(imported.book_id));
        let first = imported.first_chapter.unwrap();
        assert_eq!(first.label, "一");
        assert_eq!(first.source_href, "1.html");
        assert_eq!(first.content, "<p>1.html</p>");

        let child = store
            .get_chapter(imported.book_id, &imported.toc[0].subitems[0].href)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(child.parent_id.as_deref(), Some(first.id.as_str()));

        // 存储还原出的森林与导入后的目录一致
        let forest = store.chapter_tree(imported.book_id).await.unwrap();
        assert_eq!(forest, imported.toc);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported() {
        struct FailingStore;

        #[async_trait]
        impl BookStore for FailingStore {
            async fn add_book(&self, _: &BookMetadata) -> std::result::Result<i64, crate::store::StoreError> {
                Ok(1)
            }
            async fn get_book(&self, id: i64) -> std::result::Result<BookMetadata, crate::store::StoreError> {
                Err(crate::store::StoreError::BookNotFound(id))
            }
            async fn add_chapter(
                &self,
                _: i64,
                _: crate::store::NewChapter,
                _: Option<&str>,
            ) -> std::result::Result<String, crate::store::StoreError> {
                Err(crate::store::StoreError::Snapshot("磁盘已满".to_string()))
            }
            async fn get_chapter(
                &self,
                _: i64,
                _: &str,
            ) -> std::result::Result<Option<ChapterRecord>, crate::store::StoreError> {
                Ok(None)
            }
            async fn get_first_chapter(
                &self,
                _: i64,
            ) -> std::result::Result<Option<ChapterRecord>, crate::store::StoreError> {
                Ok(None)
            }
            async fn chapter_tree(
                &self,
                _: i64,
            ) -> std::result::Result<Vec<ChapterNode>, crate::store::StoreError> {
                Ok(Vec::new())
            }
        }

        match import_book(&FixedSource, &FailingStore, &SilentProgress).await {
            Err(EpubError::Persistence { label, .. }) => assert_eq!(label, "一"),
            other => panic!("期望存储错误, 得到: {:?}", other.map(|book| book.book_id)),
        }
    }
}
