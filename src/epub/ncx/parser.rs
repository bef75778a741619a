//! NCX解析器模块
//!
//! 提供NCX（Navigation Control file for XML）文件的XML解析功能。

use crate::epub::error::{EpubError, Result};
use crate::epub::ncx::{DocTitle, NavContent, NavLabel, NavMap, NavPoint, NcxMetadata};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// NCX文件解析结果
#[derive(Debug, Clone)]
pub struct Ncx {
    /// NCX版本
    pub version: String,
    /// XML语言
    pub xml_lang: Option<String>,
    /// 元数据
    pub metadata: NcxMetadata,
    /// 文档标题
    pub doc_title: Option<DocTitle>,
    /// 文档作者
    pub doc_author: Option<String>,
    /// 导航地图
    pub nav_map: NavMap,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Head,
    DocTitle,
    DocAuthor,
    NavMap,
    /// 页面列表等不关心的区段
    Skipped,
}

impl Ncx {
    /// 解析NCX文件内容
    ///
    /// # 参数
    /// * `xml_content` - NCX文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Ncx, EpubError>` - 解析后的NCX信息，导航点保持文档中的顺序
    pub fn parse_xml(xml_content: &str) -> Result<Ncx> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut version = String::new();
        let mut xml_lang = None;
        let mut metadata = NcxMetadata::new();
        let mut doc_title = None;
        let mut doc_author = None;
        let mut nav_map = NavMap::new();

        let mut buf = Vec::new();
        let mut section = Section::None;
        let mut text_content = String::new();

        // 导航点解析状态
        let mut nav_point_stack: Vec<NavPoint> = Vec::new();
        let mut current_nav_point: Option<NavPoint> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    match e.local_name().as_ref() {
                        b"ncx" => {
                            let (ncx_version, ncx_lang) = Self::parse_ncx_attributes(e)?;
                            version = ncx_version;
                            xml_lang = ncx_lang;
                        }
                        b"head" => section = Section::Head,
                        b"docTitle" => section = Section::DocTitle,
                        b"docAuthor" => section = Section::DocAuthor,
                        b"navMap" => section = Section::NavMap,
                        b"pageList" | b"navList" => section = Section::Skipped,
                        b"meta" if section == Section::Head => {
                            Self::parse_meta_element(e, &mut metadata)?;
                        }
                        b"navPoint" if section == Section::NavMap => {
                            let (id, play_order, class) = Self::parse_nav_point_attributes(e)?;

                            // 嵌套的navPoint开始时，外层节点入栈
                            if let Some(nav_point) = current_nav_point.take() {
                                nav_point_stack.push(nav_point);
                            }

                            let mut nav_point = NavPoint::new(
                                id,
                                play_order,
                                NavLabel::new(String::new()),
                                NavContent::new(String::new()),
                            );
                            nav_point.class = class;
                            current_nav_point = Some(nav_point);
                        }
                        b"content" if section == Section::NavMap => {
                            if let Some(nav_point) = current_nav_point.as_mut() {
                                nav_point.content = NavContent::new(Self::attribute(e, b"src")?);
                            }
                        }
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"head" | b"navMap" | b"pageList" | b"navList" => section = Section::None,
                    b"docTitle" | b"docAuthor" => section = Section::None,
                    b"text" => {
                        let text = text_content.trim().to_string();
                        match section {
                            Section::DocTitle => doc_title = Some(DocTitle::new(text)),
                            Section::DocAuthor => doc_author = Some(text),
                            Section::NavMap => {
                                if let Some(nav_point) = current_nav_point.as_mut() {
                                    nav_point.nav_label = NavLabel::new(text);
                                }
                            }
                            _ => {}
                        }
                    }
                    b"navPoint" if section == Section::NavMap => {
                        if let Some(nav_point) = current_nav_point.take() {
                            if let Some(mut parent) = nav_point_stack.pop() {
                                parent.add_child(nav_point);
                                current_nav_point = Some(parent);
                            } else {
                                nav_map.add_nav_point(nav_point);
                            }
                        }
                    }
                    _ => {}
                },
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !nav_point_stack.is_empty() {
            return Err(EpubError::NcxParseError("navPoint元素未正确闭合".to_string()));
        }

        Ok(Ncx {
            version,
            xml_lang,
            metadata,
            doc_title,
            doc_author,
            nav_map,
        })
    }

    /// 解析NCX根元素的属性
    fn parse_ncx_attributes(e: &BytesStart) -> Result<(String, Option<String>)> {
        let mut version = String::new();
        let mut xml_lang = None;

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.as_ref() {
                b"version" => version = attr.unescape_value()?.into_owned(),
                b"xml:lang" => xml_lang = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }

        Ok((version, xml_lang))
    }

    /// 读取单个属性，不存在时返回空字符串
    fn attribute(e: &BytesStart, key: &[u8]) -> Result<String> {
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == key {
                return Ok(attr.unescape_value()?.into_owned());
            }
        }
        Ok(String::new())
    }

    /// 解析meta元素
    fn parse_meta_element(e: &BytesStart, metadata: &mut NcxMetadata) -> Result<()> {
        let name = Self::attribute(e, b"name")?;
        let content = Self::attribute(e, b"content")?;

        match name.as_str() {
            "dtb:uid" => metadata.uid = Some(content),
            "dtb:depth" => metadata.depth = content.parse().ok(),
            "dtb:totalPageCount" => metadata.total_page_count = content.parse().ok(),
            "dtb:maxPageNumber" => metadata.max_page_number = content.parse().ok(),
            _ => {
                metadata.other_metadata.insert(name, content);
            }
        }

        Ok(())
    }

    /// 解析navPoint元素的属性
    fn parse_nav_point_attributes(e: &BytesStart) -> Result<(String, u32, Option<String>)> {
        let mut id = String::new();
        let mut play_order = 0;
        let mut class = None;

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.local_name().as_ref() {
                b"id" => id = attr.unescape_value()?.into_owned(),
                b"playOrder" => play_order = attr.unescape_value()?.trim().parse().unwrap_or(0),
                b"class" => class = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }

        Ok((id, play_order, class))
    }

    /// 获取NCX文件的唯一标识符
    pub fn get_uid(&self) -> Option<&String> {
        self.metadata.uid.as_ref()
    }

    /// 获取导航深度
    pub fn get_depth(&self) -> u32 {
        self.metadata.depth.unwrap_or_else(|| self.nav_map.get_depth())
    }

    /// 获取文档标题文本
    pub fn get_title(&self) -> Option<&String> {
        self.doc_title.as_ref().map(|title| &title.text)
    }

    /// 获取所有导航点的平铺列表
    pub fn get_all_nav_points(&self) -> Vec<&NavPoint> {
        self.nav_map.get_all_nav_points()
    }
}
