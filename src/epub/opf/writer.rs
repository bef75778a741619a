//! OPF生成模块
//!
//! 由书籍元数据、清单和脊柱生成content.opf。

use crate::epub::opf::{BookMetadata, ManifestItem, SpineItem};
use crate::epub::tree::escape_markup_text;

/// OPF包文件在包内的路径
pub const PACKAGE_PATH: &str = "content.opf";

/// 待生成的OPF包文件
#[derive(Debug, Clone)]
pub struct PackageDocument<'a> {
    pub metadata: &'a BookMetadata,
    /// dc:identifier的值
    pub identifier: &'a str,
    /// dc:language的值
    pub language: &'a str,
    pub manifest: &'a [ManifestItem],
    pub spine: &'a [SpineItem],
    /// 封面图片的清单项ID
    pub cover_image_id: Option<&'a str>,
    /// NCX的清单项ID
    pub toc_id: &'a str,
}

impl PackageDocument<'_> {
    /// 生成OPF XML
    pub fn to_xml(&self) -> String {
        let mut opf = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
        );

        opf.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            escape_markup_text(&self.metadata.title)
        ));
        opf.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            escape_markup_text(self.language)
        ));
        opf.push_str(&format!(
            "    <dc:creator opf:role=\"aut\">{}</dc:creator>\n",
            escape_markup_text(&self.metadata.author)
        ));
        if !self.metadata.description.is_empty() {
            opf.push_str(&format!(
                "    <dc:description>{}</dc:description>\n",
                escape_markup_text(&self.metadata.description)
            ));
        }
        opf.push_str(&format!(
            "    <dc:identifier id=\"book-id\">{}</dc:identifier>\n",
            escape_markup_text(self.identifier)
        ));
        if let Some(cover_id) = self.cover_image_id {
            opf.push_str(&format!(
                "    <meta name=\"cover\" content=\"{}\"/>\n",
                escape_markup_text(cover_id)
            ));
        }
        opf.push_str("  </metadata>\n  <manifest>\n");

        for item in self.manifest {
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"",
                escape_markup_text(&item.id),
                escape_markup_text(&item.href),
                escape_markup_text(&item.media_type)
            ));
            if let Some(properties) = &item.properties {
                opf.push_str(&format!(" properties=\"{}\"", escape_markup_text(properties)));
            }
            opf.push_str("/>\n");
        }

        opf.push_str(&format!(
            "  </manifest>\n  <spine toc=\"{}\">\n",
            escape_markup_text(self.toc_id)
        ));
        for item in self.spine {
            let linear = if item.is_linear() { "yes" } else { "no" };
            opf.push_str(&format!(
                "    <itemref idref=\"{}\" linear=\"{}\"/>\n",
                escape_markup_text(&item.idref),
                linear
            ));
        }
        opf.push_str("  </spine>\n</package>\n");
        opf
    }
}
