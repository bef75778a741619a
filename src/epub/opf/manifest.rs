//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义以及媒体类型推断。

use std::path::Path;

/// XHTML内容文档的媒体类型
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// NCX导航文件的媒体类型
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// 清单项信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav、cover-image等)
    pub properties: Option<String>,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|properties| properties.split_whitespace().any(|p| p == property))
    }

    /// 检查是否为封面图片
    pub fn is_cover_image(&self) -> bool {
        self.has_property("cover-image")
    }

    /// 检查是否为图片文件
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// 检查是否为XHTML文件
    pub fn is_xhtml(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }

    /// 检查是否为NCX文件
    pub fn is_ncx(&self) -> bool {
        self.media_type == NCX_MEDIA_TYPE
    }
}

/// 根据文件扩展名推断媒体类型
pub fn guess_media_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xhtml" | "html" | "htm" => XHTML_MEDIA_TYPE,
        "css" => "text/css",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ncx" => NCX_MEDIA_TYPE,
        _ => "application/octet-stream",
    }
}

/// 根据文件头推断图片媒体类型，无法识别时返回None
pub fn sniff_image_media_type(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_media_type() {
        assert_eq!(guess_media_type("OEBPS/chapter1.html"), "application/xhtml+xml");
        assert_eq!(guess_media_type("images/a.JPG"), "image/jpeg");
        assert_eq!(guess_media_type("images/b.png"), "image/png");
        assert_eq!(guess_media_type("toc.ncx"), "application/x-dtbncx+xml");
        assert_eq!(guess_media_type("noext"), "application/octet-stream");
    }

    #[test]
    fn test_sniff_image_media_type() {
        assert_eq!(sniff_image_media_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image_media_type(b"\x89PNG\r\n"), Some("image/png"));
        assert_eq!(sniff_image_media_type(b"hello"), None);
    }

    #[test]
    fn test_item_predicates() {
        let mut item = ManifestItem::new("cover-image", "OEBPS/cover.jpg", "image/jpeg");
        item.properties = Some("cover-image".to_string());
        assert!(item.is_cover_image());
        assert!(item.is_image());
        assert!(!item.is_xhtml());
        assert!(ManifestItem::new("ncx", "toc.ncx", NCX_MEDIA_TYPE).is_ncx());
    }
}
