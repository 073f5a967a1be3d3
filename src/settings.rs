//! 插件设置模块
//!
//! # 设计思路
//!
//! 设置由宿主持有，核心只读。开关不放在全局可变对象里，
//! 而是显式的 `PluginSettings` 值：加载一次，按值/引用传入过滤器与编排器，
//! 保证同样的输入 + 同样的设置得到同样的结果，便于确定性测试。
//!
//! # 实现思路
//!
//! - JSON 字段名沿用插件数据文件（camelCase），旧文件可直接读取。
//! - 缺失字段取默认值；文件不存在或解析失败回退为默认设置并记录警告。
//! - `FilterPolicy` 是从设置派生出的纯策略值，只包含过滤阶段需要的字段。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_UPLOAD_SERVER: &str = "http://127.0.0.1:36677/upload";

/// 上传后端类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UploaderKind {
    /// 本地 PicGo 守护进程（HTTP）。
    #[default]
    #[serde(rename = "PicGo")]
    PicGo,
    /// PicGo-Core 命令行（子进程）。
    #[serde(rename = "PicGo-Core")]
    PicGoCore,
}

/// 插件设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginSettings {
    /// 粘贴/拖放时是否自动上传（可被笔记 front-matter 覆盖）。
    pub upload_by_clip_switch: bool,
    pub uploader: UploaderKind,
    /// PicGo HTTP 上传地址。
    pub upload_server: String,
    /// PicGo-Core 可执行文件路径，留空则使用 PATH 中的 `picgo`。
    pub picgo_core_path: String,
    /// 是否处理网络图片。
    #[serde(rename = "workOnNetWork")]
    pub work_on_network: bool,
    /// 网络图片域名黑名单，英文逗号分隔。
    #[serde(rename = "newWorkBlackDomains")]
    pub network_black_domains: String,
    /// 剪贴板同时有文本和图片时是否上传图片。
    pub apply_image: bool,
    /// 上传成功后删除本地源文件。
    pub delete_source: bool,
    /// 附件目录：`/` 表示仓库根目录，`./xxx` 表示当前笔记所在目录下的子目录。
    pub attachment_folder_path: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// 单张图片下载体积上限（字节）。
    pub max_download_bytes: u64,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            upload_by_clip_switch: true,
            uploader: UploaderKind::PicGo,
            upload_server: DEFAULT_UPLOAD_SERVER.to_string(),
            picgo_core_path: String::new(),
            work_on_network: false,
            network_black_domains: String::new(),
            apply_image: true,
            delete_source: false,
            attachment_folder_path: "/".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 8,
            max_download_bytes: 50 * 1024 * 1024,
        }
    }
}

impl PluginSettings {
    /// 从 JSON 文件加载设置。
    ///
    /// 文件不存在或内容损坏时回退为默认设置，不返回错误。
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!("⚙️ 设置文件不存在，使用默认设置 - {}", path.display());
            return Self::default();
        }

        match fs::read_to_string(path)
            .map_err(AppError::from)
            .and_then(|content| Self::from_json(&content))
        {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("⚠️ 读取设置失败，回退默认设置: {err}");
                Self::default()
            }
        }
    }

    pub fn from_json(content: &str) -> Result<Self, AppError> {
        serde_json::from_str(content).map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 解析后的黑名单域名（去空白、转小写、忽略空项）。
    pub fn black_domains(&self) -> Vec<String> {
        self.network_black_domains
            .split(',')
            .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|item| !item.is_empty())
            .collect()
    }

    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy {
            work_on_network: self.work_on_network,
            black_domains: self.black_domains(),
        }
    }
}

/// 引用过滤策略。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    pub work_on_network: bool,
    pub black_domains: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plugin_data_file() {
        let json = r#"{
            "uploadByClipSwitch": false,
            "uploader": "PicGo-Core",
            "uploadServer": "http://127.0.0.1:36677/upload",
            "picgoCorePath": "/usr/local/bin/picgo",
            "workOnNetWork": true,
            "newWorkBlackDomains": "evil.com, .cdn.example.org ,,",
            "fixPath": true,
            "applyImage": false,
            "deleteSource": true
        }"#;

        let settings = PluginSettings::from_json(json).expect("settings should parse");
        assert!(!settings.upload_by_clip_switch);
        assert_eq!(settings.uploader, UploaderKind::PicGoCore);
        assert!(settings.work_on_network);
        assert!(!settings.apply_image);
        assert!(settings.delete_source);
        assert_eq!(settings.attachment_folder_path, "/");
        assert_eq!(settings.black_domains(), vec!["evil.com", "cdn.example.org"]);
    }

    #[test]
    fn empty_object_yields_defaults() {
        let settings = PluginSettings::from_json("{}").expect("settings should parse");
        assert_eq!(settings, PluginSettings::default());
        assert!(settings.black_domains().is_empty());
    }

    #[test]
    fn invalid_json_is_settings_error() {
        assert!(matches!(
            PluginSettings::from_json("{not json"),
            Err(AppError::Settings(_))
        ));
    }

    #[test]
    fn load_falls_back_on_missing_or_broken_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        assert_eq!(PluginSettings::load_or_default(&missing), PluginSettings::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "[1, 2").expect("write broken");
        assert_eq!(PluginSettings::load_or_default(&broken), PluginSettings::default());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");

        let mut settings = PluginSettings::default();
        settings.work_on_network = true;
        settings.attachment_folder_path = "./assets".to_string();
        settings.save(&path).expect("save should succeed");

        let content = fs::read_to_string(&path).expect("read back");
        assert!(content.contains("\"workOnNetWork\": true"));
        assert_eq!(PluginSettings::load_or_default(&path), settings);
    }
}
