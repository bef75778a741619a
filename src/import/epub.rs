//! EPUB导入来源
//!
//! 打开时一次性解析元数据和目录：优先使用NCX，没有NCX或导航地图为空时按脊柱顺序
//! 为每个内容文档生成一个顶层条目。章节正文为内容文档 `<body>` 的内部HTML。

use crate::epub::error::{EpubError, Result};
use crate::epub::ncx::{create_chapter_tree_from_ncx, Ncx};
use crate::epub::opf::{BookMetadata, Opf};
use crate::epub::reader::{parent_directory, resolve_path, Epub};
use crate::epub::tree::ChapterNode;
use crate::import::walker::SectionResolver;
use crate::import::TocSource;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use scraper::{Html, Selector};
use std::io::Cursor;
use std::path::Path;

static BODY_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("body").ok());
static TITLE_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("title").ok());

/// 以EPUB文件为来源的目录与章节正文
pub struct EpubSource {
    epub: Mutex<Epub<Cursor<Vec<u8>>>>,
    metadata: BookMetadata,
    toc: Vec<ChapterNode>,
}

impl EpubSource {
    /// 读取EPUB文件
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Self::from_bytes(bytes)
    }

    /// 从内存中的EPUB字节创建来源
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut epub = Epub::from_bytes(bytes)?;
        let opf = epub.parse_opf()?;
        let opf_dir = epub.get_opf_directory()?;
        let metadata = opf.metadata.to_book_metadata();

        let toc = match Self::toc_from_ncx(&mut epub, &opf, &opf_dir)? {
            Some(toc) => toc,
            None => {
                tracing::info!("没有可用的NCX目录，按脊柱顺序生成目录");
                Self::toc_from_spine(&mut epub, &opf, &opf_dir)
            }
        };

        tracing::debug!(title = %metadata.title, entries = toc.len(), "EPUB已打开");
        Ok(Self {
            epub: Mutex::new(epub),
            metadata,
            toc,
        })
    }

    /// 由NCX生成目录，NCX缺失或导航地图为空时返回None
    fn toc_from_ncx(
        epub: &mut Epub<Cursor<Vec<u8>>>,
        opf: &Opf,
        opf_dir: &str,
    ) -> Result<Option<Vec<ChapterNode>>> {
        let Some(ncx_href) = opf.get_ncx_path() else {
            return Ok(None);
        };
        let ncx_path = resolve_path(opf_dir, &ncx_href);

        let content = match epub.extract_file(&ncx_path) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                tracing::warn!("NCX文件 {} 在清单中声明但不存在", ncx_path);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let ncx = Ncx::parse_xml(&content).map_err(|e| match e {
            EpubError::XmlError(xml_err) => EpubError::NcxParseError(format!("XML解析错误: {}", xml_err)),
            other => other,
        })?;

        let toc = create_chapter_tree_from_ncx(&ncx, parent_directory(&ncx_path));
        Ok((!toc.is_empty()).then_some(toc))
    }

    /// 按脊柱顺序生成平铺目录，标题取文档的`<title>`，没有时取文件名
    fn toc_from_spine(epub: &mut Epub<Cursor<Vec<u8>>>, opf: &Opf, opf_dir: &str) -> Vec<ChapterNode> {
        opf.get_spine_documents()
            .into_iter()
            .map(|item| {
                let path = resolve_path(opf_dir, &item.href);
                let label = epub
                    .extract_file(&path)
                    .ok()
                    .and_then(|html| document_title(&html))
                    .unwrap_or_else(|| file_stem(&path).to_string());
                ChapterNode::new(label, path)
            })
            .collect()
    }

    /// 书籍元数据
    pub fn metadata(&self) -> &BookMetadata {
        &self.metadata
    }

    /// 目录（href为包内路径）
    pub fn toc(&self) -> &[ChapterNode] {
        &self.toc
    }

    /// 封面图片字节，没有封面时返回None
    pub fn cover_image(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.epub.lock().get_cover_image()?.map(|(data, _)| data))
    }
}

#[async_trait]
impl SectionResolver for EpubSource {
    async fn resolve_section(&self, href: &str) -> Result<String> {
        let path = href.split_once('#').map_or(href, |(path, _)| path);
        let html = self.epub.lock().extract_file(path)?;
        body_inner_html(&html).ok_or_else(|| EpubError::InvalidEpub(format!("文档 {} 中没有body元素", path)))
    }
}

#[async_trait]
impl TocSource for EpubSource {
    async fn metadata(&self) -> Result<BookMetadata> {
        Ok(self.metadata.clone())
    }

    async fn toc(&self) -> Result<Vec<ChapterNode>> {
        Ok(self.toc.clone())
    }
}

/// 提取`<body>`的内部HTML
pub fn body_inner_html(html: &str) -> Option<String> {
    let selector = BODY_SELECTOR.as_ref()?;
    let document = Html::parse_document(html);
    document
        .select(selector)
        .next()
        .map(|body| body.inner_html().trim().to_string())
}

/// 提取文档标题，空白标题视为没有
fn document_title(html: &str) -> Option<String> {
    let selector = TITLE_SELECTOR.as_ref()?;
    let document = Html::parse_document(html);
    document
        .select(selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn file_stem(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(path)
}
