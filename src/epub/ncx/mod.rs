//! NCX（Navigation Control file for XML）模块
//!
//! 此模块提供EPUB文件中NCX导航控制文件的解析与生成功能。
//! NCX文件定义EPUB的目录结构，导出时由章节森林生成，导入时还原为章节森林。

pub mod builder;
pub mod navigation;
pub mod parser;
pub mod toc_tree;

pub use builder::{NcxDocument, NCX_ID, NCX_PATH};
pub use navigation::{DocTitle, NavContent, NavLabel, NavMap, NavPoint, NcxMetadata};
pub use parser::Ncx;
pub use toc_tree::{create_chapter_tree_from_ncx, TocStatistics, TocTree, TocTreeStyle};
