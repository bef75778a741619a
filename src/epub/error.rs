use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// 可携带任意来源错误的装箱类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 打包与导入过程中的错误类型
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("文件不是有效的EPUB格式: {0}")]
    InvalidEpub(String),

    #[error("缺少mimetype文件")]
    MissingMimetype,

    #[error("无效的mimetype: {expected}, 找到: {found}")]
    InvalidMimetype { expected: String, found: String },

    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("container.xml解析错误: {0}")]
    ContainerParseError(String),

    #[error("OPF文件解析错误: {0}")]
    OpfParseError(String),

    #[error("NCX文件解析错误: {0}")]
    NcxParseError(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),

    /// 外部内容查找失败（章节不存在、章节文档无法解析等）
    #[error("无法获取章节内容 '{href}': {source}")]
    Resolution {
        href: String,
        #[source]
        source: BoxError,
    },

    /// 写入存储失败
    #[error("无法保存章节 '{label}': {source}")]
    Persistence {
        label: String,
        #[source]
        source: BoxError,
    },

    #[error("存储错误: {0}")]
    Store(#[from] crate::store::StoreError),

    /// 章节树结构错误（缺少href、重复href、父节点引用失效等）
    #[error("目录结构错误: {0}")]
    Structural(String),
}

impl EpubError {
    /// 将错误包装为指定href的内容查找错误
    ///
    /// 已经是 `Resolution` 的错误原样返回，避免重复包装。
    pub fn into_resolution(self, href: &str) -> EpubError {
        match self {
            resolution @ EpubError::Resolution { .. } => resolution,
            other => EpubError::Resolution {
                href: href.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// 将错误包装为指定章节的存储错误
    pub fn into_persistence(self, label: &str) -> EpubError {
        match self {
            persistence @ EpubError::Persistence { .. } => persistence,
            other => EpubError::Persistence {
                label: label.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// 是否为"文件不存在"类错误
    pub fn is_not_found(&self) -> bool {
        match self {
            EpubError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            EpubError::Zip(zip::result::ZipError::FileNotFound) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_into_resolution_keeps_cause() {
        let err = EpubError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let wrapped = err.into_resolution("7");

        match &wrapped {
            EpubError::Resolution { href, .. } => assert_eq!(href, "7"),
            other => panic!("期望Resolution错误, 得到: {:?}", other),
        }
        let cause = wrapped.source().unwrap();
        assert!(cause.to_string().contains("gone"));
    }

    #[test]
    fn test_into_resolution_is_not_nested() {
        let err = EpubError::Structural("x".to_string()).into_resolution("1");
        let again = err.into_resolution("2");

        if let EpubError::Resolution { href, .. } = again {
            assert_eq!(href, "1");
        } else {
            panic!("期望Resolution错误");
        }
    }

    #[test]
    fn test_is_not_found() {
        assert!(EpubError::Zip(zip::result::ZipError::FileNotFound).is_not_found());
        assert!(!EpubError::MissingMimetype.is_not_found());
    }
}
