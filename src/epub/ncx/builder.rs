//! 导航文档生成模块
//!
//! 由章节森林生成导航地图（前序编号的playOrder），并序列化为toc.ncx。

use crate::epub::error::Result;
use crate::epub::ncx::{NavContent, NavLabel, NavMap, NavPoint};
use crate::epub::tree::{check_href, content_path, escape_markup_text, nav_point_id, ChapterNode};

/// NCX文件在包内的路径
pub const NCX_PATH: &str = "toc.ncx";

/// NCX在清单中的固定ID
pub const NCX_ID: &str = "ncx";

impl NavMap {
    /// 由章节森林生成导航地图
    ///
    /// 整个遍历共用一个递增计数器：父节点先取号，随后是它的全部后代，
    /// 再轮到下一个兄弟节点。playOrder从1开始，不重复。
    ///
    /// # 返回值
    /// * `Result<NavMap>` - 任一节点href缺失或无效时返回结构错误
    pub fn from_chapters(forest: &[ChapterNode]) -> Result<NavMap> {
        let mut play_order = 0;
        let nav_points = build_nav_points(forest, &mut play_order)?;
        Ok(NavMap { nav_points })
    }
}

fn build_nav_points(chapters: &[ChapterNode], play_order: &mut u32) -> Result<Vec<NavPoint>> {
    let mut points = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        check_href(chapter)?;
        *play_order += 1;

        let mut point = NavPoint::new(
            nav_point_id(&chapter.href),
            *play_order,
            NavLabel::new(chapter.label.clone()),
            NavContent::new(content_path(&chapter.href)),
        );
        point.children = build_nav_points(&chapter.subitems, play_order)?;
        points.push(point);
    }
    Ok(points)
}

/// 待生成的NCX文档
#[derive(Debug, Clone)]
pub struct NcxDocument<'a> {
    /// dtb:uid，与OPF的dc:identifier一致
    pub uid: &'a str,
    pub title: &'a str,
    pub author: &'a str,
    pub nav_map: &'a NavMap,
}

impl NcxDocument<'_> {
    /// 生成NCX XML
    pub fn to_xml(&self) -> String {
        let mut ncx = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
        );
        ncx.push_str(&format!(
            "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
            escape_markup_text(self.uid)
        ));
        ncx.push_str(&format!(
            "    <meta name=\"dtb:depth\" content=\"{}\"/>\n",
            self.nav_map.get_depth().max(1)
        ));
        ncx.push_str("    <meta name=\"dtb:totalPageCount\" content=\"0\"/>\n");
        ncx.push_str("    <meta name=\"dtb:maxPageNumber\" content=\"0\"/>\n");
        ncx.push_str("  </head>\n");
        ncx.push_str(&format!(
            "  <docTitle>\n    <text>{}</text>\n  </docTitle>\n",
            escape_markup_text(self.title)
        ));
        ncx.push_str(&format!(
            "  <docAuthor>\n    <text>{}</text>\n  </docAuthor>\n",
            escape_markup_text(self.author)
        ));
        ncx.push_str("  <navMap>\n");
        write_nav_points(&mut ncx, &self.nav_map.nav_points, 2);
        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }
}

/// 递归写入navPoint元素，叶子节点不输出子元素
fn write_nav_points(ncx: &mut String, points: &[NavPoint], indent: usize) {
    let indent_str = "  ".repeat(indent);

    for point in points {
        ncx.push_str(&format!(
            "{}<navPoint id=\"{}\" playOrder=\"{}\">\n",
            indent_str,
            escape_markup_text(&point.id),
            point.play_order
        ));
        ncx.push_str(&format!(
            "{}  <navLabel>\n{}    <text>{}</text>\n{}  </navLabel>\n",
            indent_str,
            indent_str,
            escape_markup_text(&point.nav_label.text),
            indent_str
        ));
        ncx.push_str(&format!(
            "{}  <content src=\"{}\"/>\n",
            indent_str,
            escape_markup_text(&point.content.src)
        ));
        write_nav_points(ncx, &point.children, indent + 1);
        ncx.push_str(&format!("{}</navPoint>\n", indent_str));
    }
}
