pub mod config;
pub mod epub;
pub mod export;
pub mod import;
pub mod progress;
pub mod store;

// === 核心API重新导出 ===

/// EPUB打包器（导出主要接口）
pub use export::{export_book, EpubAssembler, AssembleOptions, PackagePlan, PackageResources, ContentResolver};

/// 导入（导入主要接口）
pub use import::{import_book, ingest, EpubSource, ImportedBook, TocSource};

/// 错误处理
pub use epub::{EpubError, Result};

// === 数据结构 ===

/// 章节树
pub use epub::{flatten, ChapterIndex, ChapterNode};

/// 书籍元数据
pub use epub::BookMetadata;

/// 配置
pub use config::{BodyFormat, PackConfig};

/// 进度通知
pub use progress::{Progress, SilentProgress, TracingProgress};

/// 存储
pub use store::{BookStore, ChapterRecord, MemoryStore, NewChapter, StoreError};

// === 底层组件（高级用法） ===

/// EPUB读取
pub use epub::{Container, Epub, Ncx, NavMap, NavPoint, Opf, TocTree};

// === 库信息 ===

/// 库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库的描述
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
