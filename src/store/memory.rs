//! 内存书籍存储
//!
//! 章节ID按写入顺序递增分配。命令行通过YAML快照在多次运行之间保存内容。

use crate::epub::opf::BookMetadata;
use crate::epub::tree::ChapterNode;
use crate::store::{BookStore, ChapterRecord, NewChapter, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredBook {
    metadata: BookMetadata,
    /// 按写入顺序排列
    #[serde(default)]
    chapters: Vec<ChapterRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryState {
    next_book_id: i64,
    next_chapter_id: u64,
    books: BTreeMap<i64, StoredBook>,
}

/// 以互斥锁保护的内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从YAML快照加载存储
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let state: MemoryState =
            serde_yml::from_str(&content).map_err(|e| StoreError::Snapshot(e.to_string()))?;
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    /// 快照文件存在时加载，否则返回空存储
    pub async fn load_or_new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        match tokio::fs::try_exists(path.as_ref()).await? {
            true => Self::load(path).await,
            false => Ok(Self::new()),
        }
    }

    /// 把存储写入YAML快照
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let yaml = {
            let state = self.state.lock();
            serde_yml::to_string(&*state).map_err(|e| StoreError::Snapshot(e.to_string()))?
        };
        tokio::fs::write(path.as_ref(), yaml).await?;
        Ok(())
    }

    /// 列出所有书籍
    pub fn books(&self) -> Vec<(i64, BookMetadata)> {
        self.state
            .lock()
            .books
            .iter()
            .map(|(id, book)| (*id, book.metadata.clone()))
            .collect()
    }

    /// 书籍中的章节数
    pub fn chapter_count(&self, book_id: i64) -> usize {
        self.state
            .lock()
            .books
            .get(&book_id)
            .map_or(0, |book| book.chapters.len())
    }
}

fn build_forest<'a>(
    parent_id: Option<&'a str>,
    children: &HashMap<Option<&'a str>, Vec<&'a ChapterRecord>>,
) -> Vec<ChapterNode> {
    children
        .get(&parent_id)
        .map(|records| {
            records
                .iter()
                .map(|&record| {
                    ChapterNode::new(record.label.clone(), record.id.clone())
                        .with_subitems(build_forest(Some(record.id.as_str()), children))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn add_book(&self, metadata: &BookMetadata) -> Result<i64, StoreError> {
        let mut state = self.state.lock();
        state.next_book_id += 1;
        let book_id = state.next_book_id;

        let metadata = metadata.clone().with_book_id(book_id);
        state.books.insert(
            book_id,
            StoredBook {
                metadata,
                chapters: Vec::new(),
            },
        );
        tracing::debug!(book_id, "新建书籍");
        Ok(book_id)
    }

    async fn get_book(&self, book_id: i64) -> Result<BookMetadata, StoreError> {
        self.state
            .lock()
            .books
            .get(&book_id)
            .map(|book| book.metadata.clone())
            .ok_or(StoreError::BookNotFound(book_id))
    }

    async fn add_chapter(
        &self,
        book_id: i64,
        chapter: NewChapter,
        parent_id: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock();
        let id = (state.next_chapter_id + 1).to_string();

        let book = state
            .books
            .get_mut(&book_id)
            .ok_or(StoreError::BookNotFound(book_id))?;
        if let Some(parent) = parent_id {
            if !book.chapters.iter().any(|record| record.id == parent) {
                return Err(StoreError::ParentNotFound(parent.to_string()));
            }
        }

        book.chapters.push(ChapterRecord {
            id: id.clone(),
            book_id,
            parent_id: parent_id.map(str::to_string),
            label: chapter.label,
            source_href: chapter.source_href,
            content: chapter.content,
        });
        state.next_chapter_id += 1;
        Ok(id)
    }

    async fn get_chapter(&self, book_id: i64, id: &str) -> Result<Option<ChapterRecord>, StoreError> {
        let state = self.state.lock();
        let book = state.books.get(&book_id).ok_or(StoreError::BookNotFound(book_id))?;
        Ok(book.chapters.iter().find(|record| record.id == id).cloned())
    }

    async fn get_first_chapter(&self, book_id: i64) -> Result<Option<ChapterRecord>, StoreError> {
        let state = self.state.lock();
        let book = state.books.get(&book_id).ok_or(StoreError::BookNotFound(book_id))?;
        Ok(book
            .chapters
            .iter()
            .find(|record| record.parent_id.is_none())
            .cloned())
    }

    async fn chapter_tree(&self, book_id: i64) -> Result<Vec<ChapterNode>, StoreError> {
        let state = self.state.lock();
        let book = state.books.get(&book_id).ok_or(StoreError::BookNotFound(book_id))?;

        let mut children: HashMap<Option<&str>, Vec<&ChapterRecord>> = HashMap::new();
        for record in &book.chapters {
            children
                .entry(record.parent_id.as_deref())
                .or_default()
                .push(record);
        }
        Ok(build_forest(None, &children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chapter(label: &str) -> NewChapter {
        NewChapter {
            label: label.to_string(),
            source_href: format!("{}.html", label),
            content: format!("<p>{}</p>", label),
        }
    }

    #[tokio::test]
    async fn test_tree_follows_parent_links() {
        let store = MemoryStore::new();
        let book_id = store.add_book(&BookMetadata::new("书", "作者")).await.unwrap();

        let a = store.add_chapter(book_id, chapter("A"), None).await.unwrap();
        let a1 = store.add_chapter(book_id, chapter("A1"), Some(&a)).await.unwrap();
        store.add_chapter(book_id, chapter("B"), None).await.unwrap();
        store.add_chapter(book_id, chapter("A2"), Some(&a)).await.unwrap();

        let forest = store.chapter_tree(book_id).await.unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].label, "A");
        let child_labels: Vec<&str> = forest[0].subitems.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(child_labels, vec!["A1", "A2"]);
        assert_eq!(forest[0].subitems[0].href, a1);

        let first = store.get_first_chapter(book_id).await.unwrap().unwrap();
        assert_eq!(first.id, a);
        assert_eq!(store.get_book(book_id).await.unwrap().book_id, Some(book_id));
    }

    #[tokio::test]
    async fn test_unknown_parent_rejected() {
        let store = MemoryStore::new();
        let book_id = store.add_book(&BookMetadata::new("书", "作者")).await.unwrap();

        let result = store.add_chapter(book_id, chapter("X"), Some("404")).await;
        assert!(matches!(result, Err(StoreError::ParentNotFound(_))));
        assert_eq!(store.chapter_count(book_id), 0);
        assert!(store.get_chapter(book_id, "404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.yaml");

        let store = MemoryStore::new();
        let book_id = store.add_book(&BookMetadata::new("书", "作者")).await.unwrap();
        let id = store.add_chapter(book_id, chapter("A"), None).await.unwrap();
        store.save(&path).await.unwrap();

        let restored = MemoryStore::load_or_new(&path).await.unwrap();
        let record = restored.get_chapter(book_id, &id).await.unwrap().unwrap();
        assert_eq!(record.content, "<p>A</p>");

        // 继续分配的ID不会与已有ID冲突
        let next = restored.add_chapter(book_id, chapter("B"), None).await.unwrap();
        assert_ne!(next, id);
    }
}
