//! 书籍存储接口
//!
//! 导入时逐章写入、导出时按ID读取章节内容的存储抽象。

mod memory;

pub use memory::MemoryStore;

use crate::epub::opf::BookMetadata;
use crate::epub::tree::ChapterNode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("书籍不存在: {0}")]
    BookNotFound(i64),

    #[error("章节不存在: {0}")]
    ChapterNotFound(String),

    #[error("父章节不存在: {0}")]
    ParentNotFound(String),

    #[error("存储快照格式错误: {0}")]
    Snapshot(String),
}

/// 待写入的章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChapter {
    /// 章节标题
    pub label: String,
    /// 章节在来源中的引用（导入EPUB时为包内路径）
    pub source_href: String,
    /// 章节HTML正文
    pub content: String,
}

/// 存储中的章节记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// 存储分配的章节ID
    pub id: String,
    pub book_id: i64,
    /// 父章节ID，顶层章节为None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub source_href: String,
    #[serde(default)]
    pub content: String,
}

/// 书籍存储
#[async_trait]
pub trait BookStore: Send + Sync {
    /// 新建书籍，返回分配的书籍ID
    async fn add_book(&self, metadata: &BookMetadata) -> Result<i64, StoreError>;

    /// 读取书籍元数据
    async fn get_book(&self, book_id: i64) -> Result<BookMetadata, StoreError>;

    /// 写入一个章节，返回分配的章节ID
    ///
    /// `parent_id` 必须是同一本书中已写入的章节。
    async fn add_chapter(
        &self,
        book_id: i64,
        chapter: NewChapter,
        parent_id: Option<&str>,
    ) -> Result<String, StoreError>;

    /// 按ID读取章节，不存在时返回None
    async fn get_chapter(&self, book_id: i64, id: &str) -> Result<Option<ChapterRecord>, StoreError>;

    /// 读取文档顺序中的第一个章节
    async fn get_first_chapter(&self, book_id: i64) -> Result<Option<ChapterRecord>, StoreError>;

    /// 按写入顺序还原章节森林，节点href为章节ID，不带正文
    async fn chapter_tree(&self, book_id: i64) -> Result<Vec<ChapterNode>, StoreError>;
}
