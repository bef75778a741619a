//! 导入遍历
//!
//! 按前序逐个处理目录节点：取得正文、带着父节点ID写入存储、用分配的ID覆盖href，
//! 然后再处理子节点。整个过程严格串行，父节点总在子节点之前写入。

use crate::epub::error::Result;
use crate::epub::tree::ChapterNode;
use crate::progress::Progress;
use crate::store::{BookStore, NewChapter};
use async_trait::async_trait;
use futures::future::BoxFuture;

/// 按href取得章节正文
#[async_trait]
pub trait SectionResolver: Send + Sync {
    async fn resolve_section(&self, href: &str) -> Result<String>;
}

/// 章节写入目标
#[async_trait]
pub trait ChapterSink: Send + Sync {
    /// 写入章节，返回分配的ID
    async fn persist(&self, chapter: NewChapter, parent_id: Option<&str>) -> Result<String>;
}

/// 把章节写入存储中的指定书籍
pub struct StoreSink<'a> {
    store: &'a dyn BookStore,
    book_id: i64,
}

impl<'a> StoreSink<'a> {
    pub fn new(store: &'a dyn BookStore, book_id: i64) -> Self {
        Self { store, book_id }
    }
}

#[async_trait]
impl ChapterSink for StoreSink<'_> {
    async fn persist(&self, chapter: NewChapter, parent_id: Option<&str>) -> Result<String> {
        Ok(self.store.add_chapter(self.book_id, chapter, parent_id).await?)
    }
}

/// 遍历目录并写入所有章节
///
/// 每个顶层条目在处理前报告一次进度 `"导入 {label} ({i}/{n})"`。
/// 结束后每个节点的href都被替换为存储分配的ID。
///
/// # 返回值
/// * `Result<()>` - 取得正文失败返回`Resolution`，写入失败返回`Persistence`，均立即停止
pub async fn ingest(
    toc: &mut [ChapterNode],
    resolver: &dyn SectionResolver,
    sink: &dyn ChapterSink,
    progress: &dyn Progress,
) -> Result<()> {
    let total = toc.len();
    for (i, node) in toc.iter_mut().enumerate() {
        progress.report(&format!("导入 {} ({}/{})", node.label, i + 1, total));
        ingest_node(node, None, resolver, sink).await?;
    }
    Ok(())
}

fn ingest_node<'a>(
    node: &'a mut ChapterNode,
    parent_id: Option<&'a str>,
    resolver: &'a dyn SectionResolver,
    sink: &'a dyn ChapterSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let content = resolver
            .resolve_section(&node.href)
            .await
            .map_err(|e| e.into_resolution(&node.href))?;

        let chapter = NewChapter {
            label: node.label.clone(),
            source_href: node.href.clone(),
            content,
        };
        let id = sink
            .persist(chapter, parent_id)
            .await
            .map_err(|e| e.into_persistence(&node.label))?;
        tracing::debug!(label = %node.label, source = %node.href, id = %id, "章节已写入");
        node.href = id.clone();

        for child in node.subitems.iter_mut() {
            ingest_node(child, Some(&id), resolver, sink).await?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::error::EpubError;
    use parking_lot::Mutex;

    struct EchoResolver;

    #[async_trait]
    impl SectionResolver for EchoResolver {
        async fn resolve_section(&self, href: &str) -> Result<String> {
            if href == "missing.html" {
                return Err(EpubError::InvalidEpub("文件不存在".to_string()));
            }
            Ok(format!("<p>{}</p>", href))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl ChapterSink for RecordingSink {
        async fn persist(&self, chapter: NewChapter, parent_id: Option<&str>) -> Result<String> {
            let mut calls = self.calls.lock();
            calls.push((chapter.label, parent_id.map(str::to_string)));
            Ok(format!("id{}", calls.len()))
        }
    }

    fn toc() -> Vec<ChapterNode> {
        vec![
            ChapterNode::new("A", "a.html").with_subitems(vec![
                ChapterNode::new("A1", "a.html#1").with_subitems(vec![ChapterNode::new("A1x", "a.html#x")]),
            ]),
            ChapterNode::new("B", "b.html"),
        ]
    }

    #[tokio::test]
    async fn test_parent_before_child_with_rewritten_hrefs() {
        let mut toc = toc();
        let sink = RecordingSink::default();
        let messages = Mutex::new(Vec::new());
        let progress = |message: &str| messages.lock().push(message.to_string());

        ingest(&mut toc, &EchoResolver, &sink, &progress).await.unwrap();

        assert_eq!(
            *sink.calls.lock(),
            vec![
                ("A".to_string(), None),
                ("A1".to_string(), Some("id1".to_string())),
                ("A1x".to_string(), Some("id2".to_string())),
                ("B".to_string(), None),
            ]
        );
        assert_eq!(toc[0].href, "id1");
        assert_eq!(toc[0].subitems[0].subitems[0].href, "id3");
        assert_eq!(toc[1].href, "id4");
        assert_eq!(*messages.lock(), vec!["导入 A (1/2)", "导入 B (2/2)"]);
    }

    #[tokio::test]
    async fn test_later_sibling_children_get_sibling_as_parent() {
        let mut toc = vec![ChapterNode::new("A", "a.html").with_subitems(vec![
            ChapterNode::new("A1", "a1.html"),
            ChapterNode::new("A2", "a2.html").with_subitems(vec![ChapterNode::new("A2a", "a2a.html")]),
        ])];
        let sink = RecordingSink::default();

        ingest(&mut toc, &EchoResolver, &sink, &crate::progress::SilentProgress)
            .await
            .unwrap();

        assert_eq!(
            *sink.calls.lock(),
            vec![
                ("A".to_string(), None),
                ("A1".to_string(), Some("id1".to_string())),
                ("A2".to_string(), Some("id1".to_string())),
                ("A2a".to_string(), Some("id3".to_string())),
            ]
        );
        assert_eq!(toc[0].subitems[1].href, "id3");
        assert_eq!(toc[0].subitems[1].subitems[0].href, "id4");
    }

    #[tokio::test]
    async fn test_resolution_failure_stops_walk() {
        let mut toc = vec![
            ChapterNode::new("A", "a.html"),
            ChapterNode::new("坏", "missing.html"),
            ChapterNode::new("C", "c.html"),
        ];
        let sink = RecordingSink::default();

        let result = ingest(&mut toc, &EchoResolver, &sink, &crate::progress::SilentProgress).await;
        match result {
            Err(EpubError::Resolution { href, .. }) => assert_eq!(href, "missing.html"),
            other => panic!("期望内容查找错误, 得到: {:?}", other),
        }
        assert_eq!(sink.calls.lock().len(), 1);
        assert_eq!(toc[2].href, "c.html");
    }
}
