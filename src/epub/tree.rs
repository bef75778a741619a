//! 章节树工具模块
//!
//! 提供章节树（森林）的纯函数操作：前序展开、标记文本转义、
//! 由href派生的内容标识符与路径，以及按标识符索引的祖先查询。
//! 此模块不做任何I/O。

use crate::epub::error::{EpubError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// 内容文档ID前缀
pub const CONTENT_ID_PREFIX: &str = "chap";

/// 内容文档文件名前缀（位于OEBPS目录下）
pub const CONTENT_FILE_PREFIX: &str = "chapter";

/// 章节树节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterNode {
    /// 章节标题
    pub label: String,
    /// 章节标识符；持久化之前可能是外部文档提供的临时引用
    pub href: String,
    /// 章节HTML内容（可选）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// 子章节
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subitems: Vec<ChapterNode>,
}

impl ChapterNode {
    /// 创建新的叶子节点
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            content: None,
            subitems: Vec::new(),
        }
    }

    /// 设置章节内容
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// 设置子章节
    pub fn with_subitems(mut self, subitems: Vec<ChapterNode>) -> Self {
        self.subitems = subitems;
        self
    }

    /// 是否为叶子节点
    pub fn is_leaf(&self) -> bool {
        self.subitems.is_empty()
    }
}

/// 前序展开章节森林
///
/// 父节点总在其所有后代之前，后代保持原有的兄弟顺序。
///
/// # 参数
/// * `forest` - 章节森林
///
/// # 返回值
/// * `Vec<&ChapterNode>` - 按文档顺序排列的节点引用
pub fn flatten(forest: &[ChapterNode]) -> Vec<&ChapterNode> {
    let mut nodes = Vec::with_capacity(node_count(forest));
    for root in forest {
        collect_nodes(root, &mut nodes);
    }
    nodes
}

fn collect_nodes<'a>(node: &'a ChapterNode, nodes: &mut Vec<&'a ChapterNode>) {
    nodes.push(node);
    for child in &node.subitems {
        collect_nodes(child, nodes);
    }
}

/// 统计森林中的节点总数
pub fn node_count(forest: &[ChapterNode]) -> usize {
    forest
        .iter()
        .map(|node| 1 + node_count(&node.subitems))
        .sum()
}

/// 计算森林的最大深度（空森林为0）
pub fn max_depth(forest: &[ChapterNode]) -> u32 {
    forest
        .iter()
        .map(|node| 1 + max_depth(&node.subitems))
        .max()
        .unwrap_or(0)
}

/// 转义标记文本中的五个保留字符（`& < > " '`）
///
/// 所有写入生成标记的用户文本（书名、作者、简介、章节标题）都必须经过此函数。
pub fn escape_markup_text(text: &str) -> String {
    match quick_xml::escape::escape(text) {
        Cow::Borrowed(unchanged) => unchanged.to_string(),
        Cow::Owned(escaped) => escaped,
    }
}

/// 由href派生清单项ID
pub fn content_id(href: &str) -> String {
    format!("{}{}", CONTENT_ID_PREFIX, href)
}

/// 由href派生内容文档在包内的路径
pub fn content_path(href: &str) -> String {
    format!("OEBPS/{}{}.html", CONTENT_FILE_PREFIX, href)
}

/// 由href派生导航点ID
pub fn nav_point_id(href: &str) -> String {
    format!("navPoint-{}{}", CONTENT_FILE_PREFIX, href)
}

/// 检查节点的href能否用于生成包内ID和路径
///
/// href必须非空，且只包含ASCII字母、数字以及 `-`、`_`、`.`。
pub fn check_href(node: &ChapterNode) -> Result<()> {
    let href = node.href.trim();
    if href.is_empty() {
        return Err(EpubError::Structural(format!(
            "章节 '{}' 缺少href",
            node.label
        )));
    }
    if href.len() != node.href.len()
        || !href
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(EpubError::Structural(format!(
            "章节 '{}' 的href无效: '{}'",
            node.label, node.href
        )));
    }
    Ok(())
}

/// 索引项
#[derive(Debug, Clone, Copy)]
struct IndexEntry<'a> {
    /// 前序位置
    position: usize,
    /// 父节点href
    parent: Option<&'a str>,
    /// 深度（根节点为1）
    depth: u32,
}

/// 按href索引的章节树
///
/// 章节树只保存父到子的引用；祖先关系通过此索引查询，不在节点中保存反向引用。
#[derive(Debug)]
pub struct ChapterIndex<'a> {
    nodes: Vec<&'a ChapterNode>,
    entries: HashMap<&'a str, IndexEntry<'a>>,
}

impl<'a> ChapterIndex<'a> {
    /// 为章节森林建立索引
    ///
    /// # 返回值
    /// * `Result<ChapterIndex>` - 任一节点href无效或重复时返回结构错误
    pub fn build(forest: &'a [ChapterNode]) -> Result<Self> {
        let mut index = ChapterIndex {
            nodes: Vec::with_capacity(node_count(forest)),
            entries: HashMap::new(),
        };
        for root in forest {
            index.insert(root, None, 1)?;
        }
        Ok(index)
    }

    fn insert(&mut self, node: &'a ChapterNode, parent: Option<&'a str>, depth: u32) -> Result<()> {
        check_href(node)?;

        let entry = IndexEntry {
            position: self.nodes.len(),
            parent,
            depth,
        };
        if self.entries.insert(node.href.as_str(), entry).is_some() {
            return Err(EpubError::Structural(format!(
                "重复的章节href: '{}'",
                node.href
            )));
        }
        self.nodes.push(node);

        for child in &node.subitems {
            self.insert(child, Some(node.href.as_str()), depth + 1)?;
        }
        Ok(())
    }

    /// 节点总数
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 前序排列的全部节点
    pub fn nodes(&self) -> &[&'a ChapterNode] {
        &self.nodes
    }

    /// 根据href查找节点
    pub fn get(&self, href: &str) -> Option<&'a ChapterNode> {
        self.entries.get(href).map(|entry| self.nodes[entry.position])
    }

    /// 节点的前序位置（从0开始）
    pub fn position(&self, href: &str) -> Option<usize> {
        self.entries.get(href).map(|entry| entry.position)
    }

    /// 节点深度（根节点为1）
    pub fn depth(&self, href: &str) -> Option<u32> {
        self.entries.get(href).map(|entry| entry.depth)
    }

    /// 父节点href
    pub fn parent_of(&self, href: &str) -> Option<&'a str> {
        self.entries.get(href).and_then(|entry| entry.parent)
    }

    /// 从父节点到根节点的祖先href列表
    pub fn ancestors(&self, href: &str) -> Vec<&'a str> {
        let mut ancestors = Vec::new();
        let mut current = self.parent_of(href);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent_of(parent);
        }
        ancestors
    }
}
