//! NCX导航元素数据结构定义
//!
//! 定义NCX文件中的各种导航元素，包括导航点、导航标签、内容引用等。

use std::collections::HashMap;

/// NCX元数据信息
#[derive(Debug, Clone, Default)]
pub struct NcxMetadata {
    /// 唯一标识符（dtb:uid）
    pub uid: Option<String>,
    /// 导航深度（dtb:depth）
    pub depth: Option<u32>,
    /// 总页数（dtb:totalPageCount）
    pub total_page_count: Option<u32>,
    /// 最大页码（dtb:maxPageNumber）
    pub max_page_number: Option<u32>,
    /// 其他元数据
    pub other_metadata: HashMap<String, String>,
}

impl NcxMetadata {
    /// 创建新的NCX元数据
    pub fn new() -> Self {
        Self::default()
    }
}

/// 文档标题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTitle {
    /// 标题文本
    pub text: String,
}

impl DocTitle {
    pub fn new(text: String) -> Self {
        Self { text }
    }
}

/// 导航标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLabel {
    /// 标签文本
    pub text: String,
}

impl NavLabel {
    pub fn new(text: String) -> Self {
        Self { text }
    }
}

/// 导航内容引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavContent {
    /// 源文件路径
    pub src: String,
}

impl NavContent {
    pub fn new(src: String) -> Self {
        Self { src }
    }
}

/// 导航点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    /// 唯一标识符
    pub id: String,
    /// 播放顺序（从1开始，按前序递增；解析时缺失或无效为0）
    pub play_order: u32,
    /// CSS类名（可选）
    pub class: Option<String>,
    /// 导航标签
    pub nav_label: NavLabel,
    /// 内容引用
    pub content: NavContent,
    /// 子导航点
    pub children: Vec<NavPoint>,
}

impl NavPoint {
    /// 创建新的导航点
    pub fn new(id: String, play_order: u32, nav_label: NavLabel, content: NavContent) -> Self {
        Self {
            id,
            play_order,
            class: None,
            nav_label,
            content,
            children: Vec::new(),
        }
    }

    /// 添加子导航点
    pub fn add_child(&mut self, child: NavPoint) {
        self.children.push(child);
    }

    /// 获取所有导航点（包括子导航点）的前序平铺列表
    pub fn get_all_nav_points(&self) -> Vec<&NavPoint> {
        let mut points = vec![self];
        for child in &self.children {
            points.extend(child.get_all_nav_points());
        }
        points
    }

    /// 获取导航深度
    pub fn get_depth(&self) -> u32 {
        1 + self
            .children
            .iter()
            .map(|child| child.get_depth())
            .max()
            .unwrap_or(0)
    }
}

/// 导航地图
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavMap {
    /// 导航点列表
    pub nav_points: Vec<NavPoint>,
}

impl NavMap {
    /// 创建新的导航地图
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加导航点
    pub fn add_nav_point(&mut self, nav_point: NavPoint) {
        self.nav_points.push(nav_point);
    }

    /// 获取所有导航点的前序平铺列表
    pub fn get_all_nav_points(&self) -> Vec<&NavPoint> {
        self.nav_points
            .iter()
            .flat_map(|point| point.get_all_nav_points())
            .collect()
    }

    /// 获取导航深度
    pub fn get_depth(&self) -> u32 {
        self.nav_points
            .iter()
            .map(|point| point.get_depth())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, order: u32) -> NavPoint {
        NavPoint::new(
            id.to_string(),
            order,
            NavLabel::new(id.to_string()),
            NavContent::new(format!("{}.html", id)),
        )
    }

    #[test]
    fn test_flatten_in_insertion_order() {
        let mut parent = point("b", 2);
        parent.add_child(point("b2", 4));
        parent.add_child(point("b1", 3));

        let mut nav_map = NavMap::new();
        nav_map.add_nav_point(parent);
        nav_map.add_nav_point(point("a", 1));

        let ids: Vec<&str> = nav_map.get_all_nav_points().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "b2", "b1", "a"]);
        assert_eq!(nav_map.get_depth(), 2);
    }
}
