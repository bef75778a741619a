pub mod container;
pub mod error;
pub mod ncx;
pub mod opf;
pub mod reader;
pub mod tree;

// 重新导出错误处理
pub use error::{BoxError, EpubError, Result};

// 重新导出章节树
pub use tree::{flatten, ChapterIndex, ChapterNode};

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出EPUB读取器
pub use reader::{resolve_path, Epub, EPUB_MIMETYPE};

// 重新导出OPF相关
pub use opf::{BookMetadata, Creator, Identifier, ManifestItem, Metadata, Opf, SpineItem};

// 重新导出NCX相关
pub use ncx::{
    create_chapter_tree_from_ncx, DocTitle, NavMap, NavPoint, Ncx, NcxDocument, TocStatistics, TocTree,
    TocTreeStyle,
};
