//! 打包配置模块
//!
//! 提供打包参数的配置管理功能，支持从YAML文件加载配置。

use crate::epub::error::{EpubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "bookpack.yaml";

/// ZIP允许的最大压缩级别
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// 章节正文写入内容文档时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// 原样写入（正文已经是HTML）
    #[default]
    Raw,
    /// 每个非空行包装为一个 `<p>` 段落
    Paragraphs,
}

/// 打包配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// EPUB条目的压缩级别：0为存储，1-9为deflate级别
    pub compression_level: u32,
    /// 目录备份的压缩级别
    pub backup_compression_level: u32,
    /// 导出时同时进行的章节内容查找数量
    pub chapter_concurrency: usize,
    /// dc:language
    pub language: String,
    pub body_format: BodyFormat,
    /// 书库根目录，封面位于covers/，插图位于epub/{book_id}/images/
    pub library_root: PathBuf,
    /// 固定的包标识符，未设置时每次导出生成 `urn:uuid:`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl PackConfig {
    /// 从配置文件中加载打包配置
    ///
    /// # 参数
    /// * `path` - YAML配置文件路径
    ///
    /// # 返回值
    /// * `Result<Self>` - 加载并校验成功返回配置实例，失败返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件: {}", e)))?;

        let config: Self = serde_yml::from_str(&content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 生成默认配置文件
    ///
    /// # 参数
    /// * `path` - 配置文件的写入位置
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yml::to_string(&Self::default_config())
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))?;

        let content_with_header = format!(
            "# bookpack 打包配置文件\n# compression_level: 0为存储, 1-9为deflate压缩级别\n# body_format: raw 或 paragraphs\n\n{}",
            yaml_content
        );

        fs::write(path.as_ref(), content_with_header)
            .map_err(|e| EpubError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 获取默认配置
    pub fn default_config() -> Self {
        Self {
            compression_level: 0,
            backup_compression_level: 6,
            chapter_concurrency: 4,
            language: "zh".to_string(),
            body_format: BodyFormat::Raw,
            library_root: PathBuf::from("."),
            identifier: None,
        }
    }

    /// 尝试从配置文件加载，文件不存在时使用默认配置
    ///
    /// 文件存在但内容无效时返回错误。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("配置文件 {} 不存在，使用默认配置", path.as_ref().display());
            Ok(Self::default_config())
        }
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        check_compression_level(self.compression_level)?;
        check_compression_level(self.backup_compression_level)?;
        if self.chapter_concurrency == 0 {
            return Err(EpubError::ConfigError("chapter_concurrency必须大于0".to_string()));
        }
        Ok(())
    }
}

/// 校验压缩级别
pub fn check_compression_level(level: u32) -> Result<()> {
    if level > MAX_COMPRESSION_LEVEL {
        return Err(EpubError::ConfigError(format!(
            "压缩级别必须在0到{}之间, 当前为: {}",
            MAX_COMPRESSION_LEVEL, level
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = PackConfig::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.compression_level, 0);
        assert_eq!(config.backup_compression_level, 6);
    }

    #[test]
    fn test_generate_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_PATH);

        PackConfig::generate_default_config(&path).unwrap();
        let loaded = PackConfig::from_file(&path).unwrap();
        assert_eq!(loaded, PackConfig::default_config());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.yaml");
        fs::write(&path, "compression_level: 9\nbody_format: paragraphs\nidentifier: urn:uuid:fixed\n").unwrap();

        let config = PackConfig::from_file(&path).unwrap();
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.body_format, BodyFormat::Paragraphs);
        assert_eq!(config.identifier.as_deref(), Some("urn:uuid:fixed"));
        assert_eq!(config.chapter_concurrency, 4);
    }

    #[test]
    fn test_out_of_range_level_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "compression_level: 10\n").unwrap();

        assert!(matches!(PackConfig::from_file(&path), Err(EpubError::ConfigError(_))));
        assert!(check_compression_level(9).is_ok());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let config = PackConfig::load_or_default(dir.path().join("none.yaml")).unwrap();
        assert_eq!(config, PackConfig::default_config());
    }
}
