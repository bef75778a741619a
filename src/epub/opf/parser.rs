//! OPF解析器模块
//!
//! 提供OPF（Open Packaging Format）文件的XML解析功能。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{manifest::ManifestItem, metadata::Metadata, spine::SpineItem};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// OPF文件解析结果
#[derive(Debug, Clone)]
pub struct Opf {
    /// EPUB版本
    pub version: String,
    /// 元数据
    pub metadata: Metadata,
    /// 清单项(文件列表)
    pub manifest: HashMap<String, ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineItem>,
    /// 脊柱的目录引用
    pub spine_toc: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Metadata,
    Manifest,
    Spine,
}

impl Opf {
    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Opf, EpubError>` - 解析后的OPF信息
    pub fn parse_xml(xml_content: &str) -> Result<Opf> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut version = String::new();
        let mut metadata = Metadata::new();
        let mut manifest = HashMap::new();
        let mut spine = Vec::new();
        let mut spine_toc = None;

        let mut buf = Vec::new();
        let mut section = Section::None;
        let mut text_content = String::new();
        let mut current_attributes = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name = e.local_name();
                    match local_name.as_ref() {
                        b"package" => {
                            version = Self::attribute(e, b"version")?.unwrap_or_default();
                        }
                        b"metadata" => section = Section::Metadata,
                        b"manifest" => section = Section::Manifest,
                        b"spine" => {
                            section = Section::Spine;
                            spine_toc = Self::attribute(e, b"toc")?;
                        }
                        b"item" if section == Section::Manifest => {
                            Self::parse_manifest_item(e, &mut manifest)?;
                        }
                        b"itemref" if section == Section::Spine => {
                            Self::parse_spine_item(e, &mut spine)?;
                        }
                        b"meta" if section == Section::Metadata => {
                            Self::parse_meta(e, &mut metadata)?;
                        }
                        _ if section == Section::Metadata => {
                            Self::collect_attributes(e, &mut current_attributes)?;
                        }
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"meta" if section == Section::Metadata => {
                        Self::parse_meta(e, &mut metadata)?;
                    }
                    b"item" if section == Section::Manifest => {
                        Self::parse_manifest_item(e, &mut manifest)?;
                    }
                    b"itemref" if section == Section::Spine => {
                        Self::parse_spine_item(e, &mut spine)?;
                    }
                    _ => {}
                },
                Event::End(ref e) => {
                    let local_name = e.local_name();
                    match local_name.as_ref() {
                        b"metadata" | b"manifest" | b"spine" => section = Section::None,
                        b"meta" => {}
                        name if section == Section::Metadata => {
                            // local_name会去掉命名空间前缀，<dc:title> 解析为 "title"
                            let content = text_content.trim();
                            if !content.is_empty() {
                                metadata.add_dublin_core(
                                    &String::from_utf8_lossy(name),
                                    content.to_string(),
                                    &current_attributes,
                                );
                            }
                            current_attributes.clear();
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if manifest.is_empty() {
            return Err(EpubError::OpfParseError("清单中没有任何项目".to_string()));
        }

        Ok(Opf {
            version,
            metadata,
            manifest,
            spine,
            spine_toc,
        })
    }

    /// 读取元素的单个属性
    fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == key {
                return Ok(Some(attr.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }

    /// 收集元数据元素的全部属性
    fn collect_attributes(e: &BytesStart, attributes: &mut HashMap<String, String>) -> Result<()> {
        attributes.clear();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            attributes.insert(key, attr.unescape_value()?.into_owned());
        }
        Ok(())
    }

    /// 解析name属性的meta标签
    fn parse_meta(e: &BytesStart, metadata: &mut Metadata) -> Result<()> {
        let name = Self::attribute(e, b"name")?;
        let content = Self::attribute(e, b"content")?;
        if let (Some(name), Some(content)) = (name, content) {
            metadata.add_meta(name, content);
        }
        Ok(())
    }

    /// 解析清单项
    fn parse_manifest_item(e: &BytesStart, manifest: &mut HashMap<String, ManifestItem>) -> Result<()> {
        let mut item = ManifestItem::new(String::new(), String::new(), String::new());

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| EpubError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.local_name().as_ref() {
                b"id" => item.id = value,
                b"href" => item.href = value,
                b"media-type" => item.media_type = value,
                b"properties" => item.properties = Some(value),
                _ => {}
            }
        }

        if !item.id.is_empty() && !item.href.is_empty() && !item.media_type.is_empty() {
            manifest.insert(item.id.clone(), item);
        }

        Ok(())
    }

    /// 解析脊柱项
    fn parse_spine_item(e: &BytesStart, spine: &mut Vec<SpineItem>) -> Result<()> {
        let mut spine_item = SpineItem::new(String::new());

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| EpubError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
            match attr.key.local_name().as_ref() {
                b"idref" => {
                    spine_item.idref = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"linear" => {
                    spine_item.linear = attr.value.as_ref() != b"no";
                }
                _ => {}
            }
        }

        if !spine_item.idref.is_empty() {
            spine.push(spine_item);
        }

        Ok(())
    }

    /// 根据ID获取清单项
    pub fn get_manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.get(id)
    }

    /// 获取NCX文件的路径(相对于OPF文件)
    ///
    /// 优先使用spine的toc属性，其次查找媒体类型为NCX的清单项。
    pub fn get_ncx_path(&self) -> Option<String> {
        self.spine_toc
            .as_deref()
            .and_then(|toc| self.manifest.get(toc))
            .or_else(|| {
                let mut candidates: Vec<&ManifestItem> =
                    self.manifest.values().filter(|item| item.is_ncx()).collect();
                candidates.sort_by(|a, b| a.id.cmp(&b.id));
                candidates.into_iter().next()
            })
            .map(|item| item.href.clone())
    }

    /// 获取封面图片的路径(相对于OPF文件)
    ///
    /// metadata中的cover引用只接受图片类型的清单项。
    pub fn get_cover_path(&self) -> Option<String> {
        if let Some(item) = self.manifest.values().find(|item| item.is_cover_image()) {
            return Some(item.href.clone());
        }
        self.metadata
            .cover()
            .and_then(|cover_id| self.manifest.get(&cover_id))
            .filter(|item| item.is_image())
            .map(|item| item.href.clone())
    }

    /// 获取所有线性阅读的内容文档(按阅读顺序)
    pub fn get_spine_documents(&self) -> Vec<&ManifestItem> {
        self.spine
            .iter()
            .filter(|spine_item| spine_item.is_linear())
            .filter_map(|spine_item| self.manifest.get(&spine_item.idref))
            .filter(|item| item.is_xhtml())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="2.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
        <dc:title>测试书籍 &amp; 续集</dc:title>
        <dc:creator role="aut">测试作者</dc:creator>
        <dc:language>zh-CN</dc:language>
        <dc:description>一本书</dc:description>
        <dc:identifier id="BookId" scheme="ISBN">978-1234567890</dc:identifier>
        <meta name="cover" content="cover-image"/>
    </metadata>
    <manifest>
        <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
        <item id="cover-image" href="images/cover.jpg" media-type="image/jpeg"/>
        <item id="chapter1" href="text/chapter1.xhtml" media-type="application/xhtml+xml"/>
        <item id="chapter2" href="text/chapter2.xhtml" media-type="application/xhtml+xml"/>
        <item id="notes" href="text/notes.xhtml" media-type="application/xhtml+xml"/>
    </manifest>
    <spine toc="ncx">
        <itemref idref="chapter1"/>
        <itemref idref="notes" linear="no"/>
        <itemref idref="chapter2"/>
    </spine>
</package>"#;

    #[test]
    fn test_parse_opf() {
        let opf = Opf::parse_xml(OPF).unwrap();

        assert_eq!(opf.version, "2.0");
        assert_eq!(opf.metadata.title(), Some("测试书籍 & 续集".to_string()));
        assert_eq!(opf.metadata.creators()[0].name, "测试作者");
        assert_eq!(opf.metadata.creators()[0].role.as_deref(), Some("aut"));
        assert_eq!(opf.metadata.identifiers()[0].scheme.as_deref(), Some("ISBN"));
        assert_eq!(opf.metadata.language(), Some("zh-CN".to_string()));
        assert_eq!(opf.manifest.len(), 5);
        assert_eq!(opf.spine.len(), 3);
        assert!(!opf.spine[1].is_linear());
    }

    #[test]
    fn test_ncx_and_cover_paths() {
        let opf = Opf::parse_xml(OPF).unwrap();
        assert_eq!(opf.get_ncx_path(), Some("toc.ncx".to_string()));
        assert_eq!(opf.get_cover_path(), Some("images/cover.jpg".to_string()));
    }

    #[test]
    fn test_cover_meta_pointing_at_page_is_ignored() {
        let xml = OPF.replace(r#"<meta name="cover" content="cover-image"/>"#, r#"<meta name="cover" content="chapter1"/>"#);
        let opf = Opf::parse_xml(&xml).unwrap();
        assert_eq!(opf.get_cover_path(), None);
    }

    #[test]
    fn test_spine_documents_skip_non_linear() {
        let opf = Opf::parse_xml(OPF).unwrap();
        let hrefs: Vec<&str> = opf
            .get_spine_documents()
            .iter()
            .map(|item| item.href.as_str())
            .collect();
        assert_eq!(hrefs, vec!["text/chapter1.xhtml", "text/chapter2.xhtml"]);
    }

    #[test]
    fn test_empty_manifest_is_error() {
        let xml = r#"<package version="2.0"><metadata/><manifest/><spine/></package>"#;
        assert!(matches!(Opf::parse_xml(xml), Err(EpubError::OpfParseError(_))));
    }
}
