//! OPF（Open Packaging Format）模块
//!
//! 此模块提供EPUB文件中OPF包文件的解析与生成功能，包括元数据、清单、脊柱等信息。

mod manifest;
mod metadata;
mod parser;
mod spine;
mod writer;

pub use manifest::{
    guess_media_type, sniff_image_media_type, ManifestItem, NCX_MEDIA_TYPE, XHTML_MEDIA_TYPE,
};
pub use metadata::{
    BookMetadata, Creator, Identifier, Metadata, DEFAULT_AUTHOR, DEFAULT_DESCRIPTION, DEFAULT_TITLE,
};
pub use parser::Opf;
pub use spine::SpineItem;
pub use writer::{PackageDocument, PACKAGE_PATH};
