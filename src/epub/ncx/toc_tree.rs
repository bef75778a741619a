//! 目录树（Table of Contents Tree）模块
//!
//! 把NCX导航地图还原为章节森林，并提供目录树的统计和显示功能。

use crate::epub::ncx::{NavPoint, Ncx};
use crate::epub::reader::resolve_path;
use crate::epub::tree::{max_depth, node_count, ChapterNode};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// 目录树显示样式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TocTreeStyle {
    /// 使用树状符号（├── └──）
    TreeSymbols,
    /// 使用缩进和符号（• ）
    Indented,
}

/// 从NCX创建章节森林
///
/// 每个导航点成为一个章节节点，href为content src相对于NCX所在目录解析后的包内路径
/// （保留#片段）。节点顺序与导航地图一致。
///
/// # 参数
/// * `ncx` - 已解析的NCX
/// * `ncx_dir` - NCX文件在包内所在的目录，根目录时为空字符串
pub fn create_chapter_tree_from_ncx(ncx: &Ncx, ncx_dir: &str) -> Vec<ChapterNode> {
    ncx.nav_map
        .nav_points
        .iter()
        .map(|nav_point| convert_nav_point_to_chapter(nav_point, ncx_dir))
        .collect()
}

/// 递归转换导航点为章节节点
fn convert_nav_point_to_chapter(nav_point: &NavPoint, ncx_dir: &str) -> ChapterNode {
    ChapterNode::new(
        nav_point.nav_label.text.clone(),
        resolve_path(ncx_dir, &nav_point.content.src),
    )
    .with_subitems(
        nav_point
            .children
            .iter()
            .map(|child| convert_nav_point_to_chapter(child, ncx_dir))
            .collect(),
    )
}

/// 目录树结构
#[derive(Debug, Clone)]
pub struct TocTree {
    /// 文档标题
    pub title: Option<String>,
    /// 根节点列表
    pub roots: Vec<ChapterNode>,
    /// 显示样式
    pub style: TocTreeStyle,
    /// 是否显示href
    pub show_paths: bool,
    /// 最大显示深度（None表示显示所有）
    pub max_depth: Option<u32>,
}

impl TocTree {
    /// 由章节森林创建目录树
    pub fn new(roots: Vec<ChapterNode>) -> Self {
        Self {
            title: None,
            roots,
            style: TocTreeStyle::TreeSymbols,
            show_paths: true,
            max_depth: None,
        }
    }

    /// 设置文档标题
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// 设置显示样式
    pub fn with_style(mut self, style: TocTreeStyle) -> Self {
        self.style = style;
        self
    }

    /// 设置是否显示href
    pub fn with_show_paths(mut self, show_paths: bool) -> Self {
        self.show_paths = show_paths;
        self
    }

    /// 设置最大显示深度
    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 获取目录树的统计信息
    pub fn get_statistics(&self) -> TocStatistics {
        fn count_leaves(nodes: &[ChapterNode]) -> usize {
            nodes
                .iter()
                .map(|node| if node.is_leaf() { 1 } else { count_leaves(&node.subitems) })
                .sum()
        }

        TocStatistics {
            total_nodes: node_count(&self.roots),
            max_depth: max_depth(&self.roots),
            leaf_count: count_leaves(&self.roots),
            root_count: self.roots.len(),
        }
    }

    /// 渲染一层节点，play_order按前序累加，被深度限制裁掉的子树也计数
    fn render_level(
        &self,
        nodes: &[ChapterNode],
        current_depth: u32,
        prefix: &str,
        play_order: &mut u32,
        result: &mut String,
    ) {
        for (index, node) in nodes.iter().enumerate() {
            *play_order += 1;
            let visible = self.max_depth.is_none_or(|max| current_depth < max);
            if !visible {
                *play_order += node_count(&node.subitems) as u32;
                continue;
            }

            let content = if self.show_paths {
                format!("[{}] {} → {}", play_order, node.label, node.href)
            } else {
                format!("[{}] {}", play_order, node.label)
            };

            let is_last = index == nodes.len() - 1;
            let child_prefix = match self.style {
                TocTreeStyle::TreeSymbols => {
                    let branch = if is_last { "└── " } else { "├── " };
                    result.push_str(&format!("{}{}{}\n", prefix, branch, content));
                    format!("{}{}", prefix, if is_last { "    " } else { "│   " })
                }
                TocTreeStyle::Indented => {
                    let indent = "  ".repeat(current_depth as usize);
                    result.push_str(&format!("{}• {}\n", indent, content));
                    String::new()
                }
            };

            self.render_level(&node.subitems, current_depth + 1, &child_prefix, play_order, result);
        }
    }
}

impl Display for TocTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut result = String::new();

        if let Some(ref title) = self.title {
            let depth_info = match self.max_depth {
                Some(max_depth) => format!(" (深度限制: {})", max_depth),
                None => String::new(),
            };
            result.push_str(&format!("📖 {}{}\n", title, depth_info));
            result.push_str("═══════════════════════════════════════\n\n");
        }

        let mut play_order = 0;
        self.render_level(&self.roots, 0, "", &mut play_order, &mut result);

        write!(f, "{}", result)
    }
}

/// 目录树统计信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocStatistics {
    /// 总节点数
    pub total_nodes: usize,
    /// 最大深度
    pub max_depth: u32,
    /// 叶子节点数
    pub leaf_count: usize,
    /// 根节点数
    pub root_count: usize,
}

impl Display for TocStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "目录统计: {} 个章节, {} 个根节点, {} 个叶子节点, 最大深度: {}",
            self.total_nodes, self.root_count, self.leaf_count, self.max_depth
        )
    }
}
