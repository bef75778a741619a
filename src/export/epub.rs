//! EPUB打包模块
//!
//! 由书籍元数据和章节森林生成EPUB 2归档。条目写入顺序：
//! mimetype、container.xml、封面、插图、章节文档、toc.ncx、content.opf。

use crate::config::{check_compression_level, BodyFormat, PackConfig};
use crate::epub::container::{Container, CONTAINER_PATH};
use crate::epub::error::{EpubError, Result};
use crate::epub::ncx::{NavMap, NcxDocument, NCX_ID, NCX_PATH};
use crate::epub::opf::{
    guess_media_type, sniff_image_media_type, BookMetadata, ManifestItem, PackageDocument, SpineItem,
    NCX_MEDIA_TYPE, PACKAGE_PATH, XHTML_MEDIA_TYPE,
};
use crate::epub::reader::EPUB_MIMETYPE;
use crate::epub::tree::{content_id, content_path, escape_markup_text, flatten, ChapterIndex, ChapterNode};
use crate::export::ContentResolver;
use crate::progress::Progress;
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::pin::pin;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub const COVER_IMAGE_ID: &str = "cover-image";
pub const COVER_IMAGE_PATH: &str = "OEBPS/cover.jpg";
pub const COVER_PAGE_ID: &str = "cover";
pub const COVER_PAGE_PATH: &str = "OEBPS/cover.html";
pub const IMAGES_DIR: &str = "OEBPS/images";

/// 封面图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,
}

impl CoverImage {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// 根据文件头推断媒体类型，无法识别时视为JPEG
    pub fn media_type(&self) -> &'static str {
        sniff_image_media_type(&self.data).unwrap_or("image/jpeg")
    }
}

/// 插图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    /// 文件名，写入 `OEBPS/images/{name}`
    pub name: String,
    pub data: Vec<u8>,
}

impl ImageResource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// 包内路径
    pub fn path(&self) -> String {
        format!("{}/{}", IMAGES_DIR, self.name)
    }
}

/// 随章节一同打包的资源
#[derive(Debug, Clone, Default)]
pub struct PackageResources {
    pub cover: Option<CoverImage>,
    pub images: Vec<ImageResource>,
}

/// 打包选项
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// 0为存储，1-9为deflate级别
    pub compression_level: u32,
    /// 同时进行的章节内容查找数量
    pub chapter_concurrency: usize,
    /// 元数据未指定语言时使用
    pub language: String,
    pub body_format: BodyFormat,
    /// 固定的包标识符，None时每次生成 `urn:uuid:`
    pub identifier: Option<String>,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self::from_config(&PackConfig::default_config())
    }
}

impl AssembleOptions {
    pub fn from_config(config: &PackConfig) -> Self {
        Self {
            compression_level: config.compression_level,
            chapter_concurrency: config.chapter_concurrency,
            language: config.language.clone(),
            body_format: config.body_format,
            identifier: config.identifier.clone(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }
}

/// 一次打包派生出的清单、脊柱和导航地图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePlan {
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItem>,
    pub nav_map: NavMap,
}

/// EPUB打包器
#[derive(Debug, Clone)]
pub struct EpubAssembler {
    options: AssembleOptions,
}

impl EpubAssembler {
    /// 创建打包器
    ///
    /// # 返回值
    /// * `Result<Self>` - 压缩级别大于9或并发数为0时返回配置错误
    pub fn new(options: AssembleOptions) -> Result<Self> {
        check_compression_level(options.compression_level)?;
        if options.chapter_concurrency == 0 {
            return Err(EpubError::ConfigError("chapter_concurrency必须大于0".to_string()));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &AssembleOptions {
        &self.options
    }

    /// 生成清单、脊柱和导航地图
    ///
    /// 清单顺序：章节文档（前序）、封面图片、封面页、插图、NCX。
    /// 脊柱只包含可阅读的XHTML文档，封面页在最前。
    ///
    /// # 返回值
    /// * `Result<PackagePlan>` - 森林为空、href无效或重复、插图名无效或重复时返回结构错误
    pub fn plan(&self, forest: &[ChapterNode], resources: &PackageResources) -> Result<PackagePlan> {
        if forest.is_empty() {
            return Err(EpubError::Structural("章节目录为空，无法生成EPUB".to_string()));
        }

        let index = ChapterIndex::build(forest)?;
        let nav_map = NavMap::from_chapters(forest)?;

        let mut manifest = Vec::with_capacity(index.len() + resources.images.len() + 3);
        let mut spine = Vec::with_capacity(index.len() + 1);

        for node in index.nodes() {
            manifest.push(ManifestItem::new(
                content_id(&node.href),
                content_path(&node.href),
                XHTML_MEDIA_TYPE,
            ));
            spine.push(SpineItem::new(content_id(&node.href)));
        }

        if let Some(cover) = &resources.cover {
            manifest.push(ManifestItem::new(COVER_IMAGE_ID, COVER_IMAGE_PATH, cover.media_type()));
            manifest.push(ManifestItem::new(COVER_PAGE_ID, COVER_PAGE_PATH, XHTML_MEDIA_TYPE));
            spine.insert(0, SpineItem::new(COVER_PAGE_ID));
        }

        let mut image_names = HashSet::new();
        for (i, image) in resources.images.iter().enumerate() {
            if image.name.is_empty() || image.name.contains('/') || image.name.contains('\\') {
                return Err(EpubError::Structural(format!("无效的插图文件名: '{}'", image.name)));
            }
            if !image_names.insert(image.name.as_str()) {
                return Err(EpubError::Structural(format!("重复的插图文件名: '{}'", image.name)));
            }
            manifest.push(ManifestItem::new(
                format!("img{}", i),
                image.path(),
                guess_media_type(&image.name),
            ));
        }

        manifest.push(ManifestItem::new(NCX_ID, NCX_PATH, NCX_MEDIA_TYPE));

        Ok(PackagePlan {
            manifest,
            spine,
            nav_map,
        })
    }

    /// 生成EPUB归档
    ///
    /// 章节正文优先使用节点自带的`content`，否则通过`resolver`按href查找。
    /// 查找最多同时进行`chapter_concurrency`个，结果严格按前序写入。
    /// 任一章节查找失败时中止，不返回归档。
    ///
    /// # 参数
    /// * `metadata` - 书籍元数据
    /// * `forest` - 章节森林
    /// * `resources` - 封面与插图
    /// * `resolver` - 章节内容来源
    /// * `progress` - 每个章节报告一次进度
    ///
    /// # 返回值
    /// * `Result<Vec<u8>>` - 完整的EPUB字节
    pub async fn assemble(
        &self,
        metadata: &BookMetadata,
        forest: &[ChapterNode],
        resources: &PackageResources,
        resolver: &dyn ContentResolver,
        progress: &dyn Progress,
    ) -> Result<Vec<u8>> {
        let plan = self.plan(forest, resources)?;
        let identifier = self
            .options
            .identifier
            .clone()
            .unwrap_or_else(|| format!("urn:uuid:{}", Uuid::new_v4()));
        let language = metadata.language.as_deref().unwrap_or(&self.options.language);

        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default());
        let entry = self.entry_options();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file("mimetype", stored)?;
        zip.write_all(EPUB_MIMETYPE.as_bytes())?;

        zip.start_file(CONTAINER_PATH, entry)?;
        zip.write_all(Container::for_package(PACKAGE_PATH).to_xml().as_bytes())?;

        if let Some(cover) = &resources.cover {
            zip.start_file(COVER_IMAGE_PATH, entry)?;
            zip.write_all(&cover.data)?;
            zip.start_file(COVER_PAGE_PATH, entry)?;
            zip.write_all(cover_document(language).as_bytes())?;
        }

        for image in &resources.images {
            zip.start_file(image.path(), entry)?;
            zip.write_all(&image.data)?;
        }

        let nodes = flatten(forest);
        let total = nodes.len();
        let mut bodies = pin!(stream::iter(nodes.iter().map(|node| async move {
            match &node.content {
                Some(content) => Ok(content.clone()),
                None => resolver
                    .resolve(&node.href)
                    .await
                    .map_err(|e| e.into_resolution(&node.href)),
            }
        }))
        .buffered(self.options.chapter_concurrency));

        let mut written = 0;
        while let Some(body) = bodies.try_next().await? {
            let node = nodes[written];
            written += 1;
            progress.report(&format!(
                "{} 正在添加到 EPUB 文件... ({}/{})",
                node.label, written, total
            ));

            zip.start_file(content_path(&node.href), entry)?;
            zip.write_all(chapter_document(&node.label, &body, self.options.body_format, language).as_bytes())?;
        }

        let ncx = NcxDocument {
            uid: &identifier,
            title: &metadata.title,
            author: &metadata.author,
            nav_map: &plan.nav_map,
        };
        zip.start_file(NCX_PATH, entry)?;
        zip.write_all(ncx.to_xml().as_bytes())?;

        let package = PackageDocument {
            metadata,
            identifier: &identifier,
            language,
            manifest: &plan.manifest,
            spine: &plan.spine,
            cover_image_id: resources.cover.as_ref().map(|_| COVER_IMAGE_ID),
            toc_id: NCX_ID,
        };
        zip.start_file(PACKAGE_PATH, entry)?;
        zip.write_all(package.to_xml().as_bytes())?;

        let bytes = zip.finish()?.into_inner();
        tracing::info!(
            title = %metadata.title,
            chapters = total,
            bytes = bytes.len(),
            "EPUB打包完成"
        );
        Ok(bytes)
    }

    /// mimetype以外条目的写入选项
    fn entry_options(&self) -> SimpleFileOptions {
        let options = SimpleFileOptions::default().last_modified_time(DateTime::default());
        match self.options.compression_level {
            0 => options.compression_method(CompressionMethod::Stored),
            level => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(level as i64)),
        }
    }
}

/// 按正文格式整理章节正文
pub fn format_body(body: &str, format: BodyFormat) -> String {
    match format {
        BodyFormat::Raw => body.to_string(),
        BodyFormat::Paragraphs => body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| format!("<p>{}</p>", line))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// 生成章节XHTML文档
pub fn chapter_document(label: &str, body: &str, format: BodyFormat, language: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}" lang="{lang}">
<head>
  <title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
        lang = escape_markup_text(language),
        title = escape_markup_text(label),
        body = format_body(body, format),
    )
}

/// 生成封面页
fn cover_document(language: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}" lang="{lang}">
<head>
  <title>封面</title>
</head>
<body>
  <img src="cover.jpg" alt="封面"/>
</body>
</html>
"#,
        lang = escape_markup_text(language),
    )
}
