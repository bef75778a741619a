//! 元数据处理模块
//!
//! 提供书籍元数据（打包时使用）以及从OPF文件解析出的元数据的结构定义。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 导入时缺省的书名
pub const DEFAULT_TITLE: &str = "未命名";
/// 导入时缺省的作者
pub const DEFAULT_AUTHOR: &str = "佚名";
/// 导入时缺省的简介
pub const DEFAULT_DESCRIPTION: &str = "暂缺";

/// 书籍元数据
///
/// 打包或导入开始后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    /// 书名
    pub title: String,
    /// 作者
    pub author: String,
    /// 简介
    #[serde(default)]
    pub description: String,
    /// 存储分配的书籍ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<i64>,
    /// 语言（如zh、en），缺省时使用配置中的语言
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl BookMetadata {
    /// 创建新的书籍元数据
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            description: String::new(),
            book_id: None,
            language: None,
        }
    }

    /// 设置简介
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 设置书籍ID
    pub fn with_book_id(mut self, book_id: i64) -> Self {
        self.book_id = Some(book_id);
        self
    }
}

/// 创建者信息(作者、编辑者等)
#[derive(Debug, Clone)]
pub struct Creator {
    /// 创建者姓名
    pub name: String,
    /// 角色(如aut、edt等)
    pub role: Option<String>,
}

/// 标识符信息
#[derive(Debug, Clone)]
pub struct Identifier {
    /// 标识符值
    pub value: String,
    /// 标识符类型(如ISBN、UUID等)
    pub scheme: Option<String>,
    /// 元素ID
    pub id: Option<String>,
}

/// OPF文件中的元数据信息
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    titles: Vec<String>,
    creators: Vec<Creator>,
    identifiers: Vec<Identifier>,
    description: Option<String>,
    language: Option<String>,
    /// name属性的meta标签，如 `<meta name="cover" content="cover-image"/>`
    meta: HashMap<String, String>,
}

impl Metadata {
    /// 创建新的元数据实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加Dublin Core元素
    ///
    /// # 参数
    /// * `tag` - 去掉命名空间前缀的元素名（如title、creator）
    /// * `value` - 元素文本
    /// * `attributes` - 元素属性
    pub fn add_dublin_core(&mut self, tag: &str, value: String, attributes: &HashMap<String, String>) {
        match tag {
            "title" => self.titles.push(value),
            "creator" => self.creators.push(Creator {
                name: value,
                role: attributes.get("role").cloned(),
            }),
            "identifier" => self.identifiers.push(Identifier {
                value,
                scheme: attributes.get("scheme").cloned(),
                id: attributes.get("id").cloned(),
            }),
            "description" => {
                self.description.get_or_insert(value);
            }
            "language" => {
                self.language.get_or_insert(value);
            }
            _ => {}
        }
    }

    /// 添加name属性的meta标签
    pub fn add_meta(&mut self, name: String, content: String) {
        self.meta.insert(name, content);
    }

    /// 书名
    pub fn title(&self) -> Option<String> {
        self.titles.first().cloned()
    }

    /// 创建者列表
    pub fn creators(&self) -> &[Creator] {
        &self.creators
    }

    /// 标识符列表
    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    /// 简介
    pub fn description(&self) -> Option<String> {
        self.description.clone()
    }

    /// 语言
    pub fn language(&self) -> Option<String> {
        self.language.clone()
    }

    /// 封面（meta name="cover" 的内容，通常为清单项ID）
    pub fn cover(&self) -> Option<String> {
        self.meta.get("cover").cloned()
    }

    /// 转换为书籍元数据
    ///
    /// 缺失或空白的书名、作者、简介使用缺省值。作者优先选择角色为aut的创建者。
    pub fn to_book_metadata(&self) -> BookMetadata {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let author = self
            .creators
            .iter()
            .find(|creator| creator.role.as_deref() == Some("aut"))
            .or_else(|| self.creators.first())
            .map(|creator| creator.name.clone());

        BookMetadata {
            title: non_blank(self.title()).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            author: non_blank(author).unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            description: non_blank(self.description())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            book_id: None,
            language: non_blank(self.language()),
        }
    }
}
