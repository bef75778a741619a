use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::epub::container::{Container, CONTAINER_PATH};
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::Opf;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// EPUB的mimetype内容
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 表示一个EPUB文件
pub struct Epub<R = File> {
    archive: ZipArchive<R>,
}

impl Epub<File> {
    /// 从文件路径创建Epub实例
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<Epub, EpubError>` - 成功返回Epub实例，失败返回错误
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Epub<File>> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl Epub<Cursor<Vec<u8>>> {
    /// 从内存中的字节创建Epub实例
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> Epub<R> {
    /// 从任意可读可定位的来源创建Epub实例，并验证mimetype
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;

        let mut epub = Epub { archive };
        epub.validate()?;

        Ok(epub)
    }

    /// 验证EPUB文件的合法性
    ///
    /// 检查步骤：
    /// 1. 检查是否存在mimetype文件
    /// 2. 验证mimetype文件的内容是否为"application/epub+zip"
    fn validate(&mut self) -> Result<()> {
        let mut file = match self.archive.by_name("mimetype") {
            Ok(file) => file,
            Err(_) => return Err(EpubError::MissingMimetype),
        };

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        // 去除可能的换行符和空白字符
        let content = content.trim();
        if content != EPUB_MIMETYPE {
            return Err(EpubError::InvalidMimetype {
                expected: EPUB_MIMETYPE.to_string(),
                found: content.to_string(),
            });
        }

        tracing::debug!("EPUB验证成功: mimetype文件正确");
        Ok(())
    }

    /// 提取指定文件的内容
    ///
    /// # 参数
    /// * `filename` - 要提取的文件名
    ///
    /// # 返回值
    /// * `Result<String, EpubError>` - 文件内容
    pub fn extract_file(&mut self, filename: &str) -> Result<String> {
        let mut file = self.archive.by_name(filename)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// 提取指定文件的二进制内容
    ///
    /// # 参数
    /// * `filename` - 要提取的文件名
    ///
    /// # 返回值
    /// * `Result<Vec<u8>, EpubError>` - 文件的二进制内容
    pub fn extract_binary_file(&mut self, filename: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(filename)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// 解析container.xml文件
    pub fn parse_container(&mut self) -> Result<Container> {
        let container_content = self.extract_file(CONTAINER_PATH)?;
        Container::parse_xml(&container_content)
    }

    /// 获取主要的OPF文件路径
    ///
    /// # 返回值
    /// * `Result<String, EpubError>` - OPF文件的完整路径
    pub fn get_opf_path(&mut self) -> Result<String> {
        let container = self.parse_container()?;

        container.get_opf_path().ok_or_else(|| {
            EpubError::ContainerParseError("container.xml中没有找到有效的rootfile".to_string())
        })
    }

    /// 解析OPF文件
    ///
    /// # 返回值
    /// * `Result<Opf, EpubError>` - 解析后的OPF信息
    pub fn parse_opf(&mut self) -> Result<Opf> {
        let opf_path = self.get_opf_path()?;
        let opf_content = self.extract_file(&opf_path)?;

        Opf::parse_xml(&opf_content).map_err(|e| match e {
            EpubError::XmlError(xml_err) => EpubError::OpfParseError(format!("XML解析错误: {}", xml_err)),
            other => other,
        })
    }

    /// 获取OPF文件所在的目录，OPF位于根目录时返回空字符串
    pub fn get_opf_directory(&mut self) -> Result<String> {
        let opf_path = self.get_opf_path()?;
        Ok(parent_directory(&opf_path).to_string())
    }

    /// 获取封面图片的二进制数据
    ///
    /// 先查找清单中具有cover-image属性的项目，再查找metadata中的cover引用。
    /// 封面文件在清单中声明但不存在时视为没有封面。
    ///
    /// # 返回值
    /// * `Result<Option<(Vec<u8>, String)>, EpubError>` - (封面二进制数据, 包内路径)
    pub fn get_cover_image(&mut self) -> Result<Option<(Vec<u8>, String)>> {
        let opf = self.parse_opf()?;
        let opf_dir = self.get_opf_directory()?;

        let Some(cover_path) = opf.get_cover_path() else {
            return Ok(None);
        };

        let full_path = resolve_path(&opf_dir, &cover_path);
        match self.extract_binary_file(&full_path) {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Ok(Some((data, full_path))),
            Err(e) if e.is_not_found() => {
                tracing::warn!("封面文件 {} 在清单中声明但不存在", full_path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// 包内路径的父目录，没有父目录时返回空字符串
pub fn parent_directory(path: &str) -> &str {
    path.rfind('/').map(|index| &path[..index]).unwrap_or("")
}

/// 把相对于`base_dir`的引用解析为包内路径
///
/// 处理`.`与`..`路径段，保留`#`片段。以`/`开头的引用视为从包根目录开始。
/// 引用中的路径段按URL编码解码（如`%20`），结果可直接作为归档条目名。
///
/// # 参数
/// * `base_dir` - 引用所在文档的目录，根目录为空字符串
/// * `reference` - 文档中的相对引用
pub fn resolve_path(base_dir: &str, reference: &str) -> String {
    let (path, fragment) = match reference.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (reference, None),
    };

    let mut segments: Vec<Cow<str>> = if path.starts_with('/') {
        Vec::new()
    } else {
        base_dir
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Cow::Borrowed)
            .collect()
    };

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(percent_decode_str(other).decode_utf8_lossy()),
        }
    }

    let mut resolved = segments.join("/");
    if let Some(fragment) = fragment {
        resolved.push('#');
        resolved.push_str(fragment);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

    const OPF_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="2.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
        <dc:title>测试书籍</dc:title>
        <dc:creator role="aut">测试作者</dc:creator>
        <dc:identifier id="BookId">978-1234567890</dc:identifier>
        <meta name="cover" content="cover-image"/>
    </metadata>
    <manifest>
        <item id="cover-image" href="images/cover.png" media-type="image/png"/>
        <item id="chapter1" href="text/chapter1.xhtml" media-type="application/xhtml+xml"/>
    </manifest>
    <spine>
        <itemref idref="chapter1"/>
    </spine>
</package>"#;

    /// 在内存中创建测试用的EPUB
    fn create_test_epub(mimetype_content: &str, with_cover: bool) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        zip.start_file("mimetype", options).unwrap();
        zip.write_all(mimetype_content.as_bytes()).unwrap();
        zip.start_file("META-INF/container.xml", options).unwrap();
        zip.write_all(CONTAINER_XML.as_bytes()).unwrap();
        zip.start_file("OEBPS/content.opf", options).unwrap();
        zip.write_all(OPF_XML.as_bytes()).unwrap();
        zip.start_file("OEBPS/text/chapter1.xhtml", options).unwrap();
        zip.write_all(b"<html><body><p>one</p></body></html>").unwrap();
        if with_cover {
            zip.start_file("OEBPS/images/cover.png", options).unwrap();
            zip.write_all(b"\x89PNG\r\n\x1a\nfake").unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_valid_epub() {
        let mut epub = Epub::from_bytes(create_test_epub(EPUB_MIMETYPE, false)).unwrap();
        let chapter = epub.extract_file("OEBPS/text/chapter1.xhtml").unwrap();
        assert!(chapter.contains("<p>one</p>"));
    }

    #[test]
    fn test_invalid_mimetype() {
        match Epub::from_bytes(create_test_epub("application/zip", false)) {
            Err(EpubError::InvalidMimetype { expected, found }) => {
                assert_eq!(expected, EPUB_MIMETYPE);
                assert_eq!(found, "application/zip");
            }
            Err(e) => panic!("期望InvalidMimetype错误, 得到: {}", e),
            Ok(_) => panic!("期望InvalidMimetype错误"),
        }
    }

    #[test]
    fn test_missing_mimetype() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"x").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(matches!(Epub::from_bytes(bytes), Err(EpubError::MissingMimetype)));
    }

    #[test]
    fn test_opf_path_directory_and_metadata() {
        let mut epub = Epub::from_bytes(create_test_epub(EPUB_MIMETYPE, false)).unwrap();

        assert_eq!(epub.get_opf_path().unwrap(), "OEBPS/content.opf");
        assert_eq!(epub.get_opf_directory().unwrap(), "OEBPS");

        let metadata = epub.parse_opf().unwrap().metadata.to_book_metadata();
        assert_eq!(metadata.title, "测试书籍");
        assert_eq!(metadata.author, "测试作者");
        assert_eq!(metadata.description, crate::epub::opf::DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_get_cover_image() {
        let mut epub = Epub::from_bytes(create_test_epub(EPUB_MIMETYPE, true)).unwrap();
        let (data, path) = epub.get_cover_image().unwrap().unwrap();
        assert_eq!(path, "OEBPS/images/cover.png");
        assert!(data.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_declared_but_missing_cover() {
        let mut epub = Epub::from_bytes(create_test_epub(EPUB_MIMETYPE, false)).unwrap();
        assert!(epub.get_cover_image().unwrap().is_none());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_path("OEBPS/toc", "../Text/a.html#s1"), "OEBPS/Text/a.html#s1");
        assert_eq!(resolve_path("", "./a.html"), "a.html");
        assert_eq!(resolve_path("OEBPS", "/root.html"), "root.html");
        assert_eq!(parent_directory("content.opf"), "");
        assert_eq!(resolve_path("OPS", "text/c%201.xhtml#s"), "OPS/text/c 1.xhtml#s");
        assert_eq!(resolve_path("OPS", "%E7%AC%AC%E4%B8%80.xhtml"), "OPS/第一.xhtml");
        assert_eq!(parent_directory("a/b/toc.ncx"), "a/b");
    }
}
