//! PicGo-Core 命令行后端
//!
//! # 设计思路
//!
//! 通过子进程调用 `picgo upload <路径...>`，从标准输出末尾解析图片地址：
//! PicGo-Core 成功时会把每个 URL 单独打印一行，顺序与入参一致。
//!
//! # 实现思路
//!
//! - 直接传参，不经过 shell，路径中的空格/引号无需转义。
//! - 退出码非 0、输出中含 `PicGo ERROR`、末尾 URL 数量不等于入参数量，均视为失败。
//! - 剪贴板上传即不带路径的 `picgo upload`，取输出中最后一个 URL。

use tokio::process::Command;

use super::{BatchUploadResult, ClipboardUploadResult, UploadError, UploaderPort};
use crate::reference::is_network_locator;
use crate::settings::PluginSettings;

const DEFAULT_CLI: &str = "picgo";
const ERROR_MARKER: &str = "PicGo ERROR";

pub struct PicGoCoreUploader {
    cli: String,
}

impl PicGoCoreUploader {
    pub fn new(settings: &PluginSettings) -> Self {
        let configured = settings.picgo_core_path.trim();
        let cli = if configured.is_empty() {
            DEFAULT_CLI.to_string()
        } else {
            configured.to_string()
        };
        Self { cli }
    }

    async fn run_upload(&self, paths: &[String]) -> Result<String, UploadError> {
        log::debug!("🛠️ 执行 {} upload（{} 个参数）", self.cli, paths.len());

        let output = Command::new(&self.cli)
            .arg("upload")
            .args(paths)
            .output()
            .await
            .map_err(|e| UploadError::Process(format!("无法启动 {}：{}", self.cli, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UploadError::Process(format!(
                "{} 退出码 {:?}：{}{}",
                self.cli,
                output.status.code(),
                stdout.trim(),
                stderr.trim()
            )));
        }

        Ok(stdout)
    }
}

/// 解析批量上传输出：末尾 `expected` 个非空行即结果 URL。
pub(crate) fn parse_upload_output(output: &str, expected: usize) -> Result<Vec<String>, UploadError> {
    if output.contains(ERROR_MARKER) {
        return Err(UploadError::Backend(output.trim().to_string()));
    }

    let lines: Vec<&str> = output.lines().map(str::trim).filter(|line| !line.is_empty()).collect();
    if lines.len() < expected {
        return Err(UploadError::CountMismatch {
            expected,
            actual: lines.len(),
        });
    }

    let urls: Vec<String> = lines[lines.len() - expected..]
        .iter()
        .map(|line| line.to_string())
        .collect();

    let actual = urls.iter().filter(|url| is_network_locator(url)).count();
    if actual != expected {
        return Err(UploadError::CountMismatch { expected, actual });
    }

    Ok(urls)
}

/// 解析剪贴板上传输出：取最后一个 URL 行。
pub(crate) fn parse_clipboard_output(output: &str) -> Result<String, UploadError> {
    if output.contains(ERROR_MARKER) {
        return Err(UploadError::Backend(output.trim().to_string()));
    }

    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| is_network_locator(line))
        .map(str::to_string)
        .ok_or_else(|| UploadError::InvalidResponse(format!("请检查 PicGo-Core 配置：{}", output.trim())))
}

#[async_trait::async_trait]
impl UploaderPort for PicGoCoreUploader {
    async fn upload_files(&self, paths: &[String]) -> BatchUploadResult {
        log::info!("📤 PicGo-Core 批量上传 - {} 个文件", paths.len());
        let result = match self.run_upload(paths).await {
            Ok(output) => parse_upload_output(&output, paths.len()),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            log::error!("❌ PicGo-Core 上传失败: {err}");
        }
        BatchUploadResult::from(result).ensure_count(paths.len())
    }

    async fn upload_from_clipboard(&self) -> ClipboardUploadResult {
        log::info!("📋 PicGo-Core 剪贴板上传");
        let result = match self.run_upload(&[]).await {
            Ok(output) => parse_clipboard_output(&output),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            log::error!("❌ PicGo-Core 剪贴板上传失败: {err}");
        }
        ClipboardUploadResult::from(result)
    }

    fn name(&self) -> &'static str {
        "PicGo-Core"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS_OUTPUT: &str = "[PicGo INFO]: Before transform\n\
        [PicGo INFO]: Transforming...\n\
        [PicGo INFO]: Uploading...\n\
        [PicGo SUCCESS]: \n\
        https://cdn.example.com/a.png\n\
        https://cdn.example.com/b.png\n";

    #[test]
    fn upload_output_takes_trailing_urls_in_order() {
        let urls = parse_upload_output(SUCCESS_OUTPUT, 2).expect("should parse");
        assert_eq!(urls, vec!["https://cdn.example.com/a.png", "https://cdn.example.com/b.png"]);
    }

    #[test]
    fn upload_output_with_too_few_urls_fails() {
        let result = parse_upload_output(SUCCESS_OUTPUT, 3);
        assert!(matches!(result, Err(UploadError::CountMismatch { expected: 3, actual: 2 })));

        let result = parse_upload_output("https://cdn/a.png\n", 2);
        assert!(matches!(result, Err(UploadError::CountMismatch { expected: 2, actual: 1 })));
    }

    #[test]
    fn upload_output_with_error_marker_fails() {
        let output = "[PicGo ERROR]: Error: Unauthorized\nhttps://cdn/a.png\n";
        assert!(matches!(parse_upload_output(output, 1), Err(UploadError::Backend(_))));
        assert!(matches!(parse_clipboard_output(output), Err(UploadError::Backend(_))));
    }

    #[test]
    fn clipboard_output_takes_last_url() {
        let url = parse_clipboard_output(SUCCESS_OUTPUT).expect("should parse");
        assert_eq!(url, "https://cdn.example.com/b.png");

        assert!(matches!(
            parse_clipboard_output("[PicGo WARN]: no image in clipboard\n"),
            Err(UploadError::InvalidResponse(_))
        ));
    }

    #[test]
    fn empty_cli_path_defaults_to_picgo() {
        let uploader = PicGoCoreUploader::new(&PluginSettings::default());
        assert_eq!(uploader.cli, "picgo");
    }

    #[tokio::test]
    async fn missing_executable_is_reported_as_failure() {
        let mut settings = PluginSettings::default();
        settings.picgo_core_path = "/nonexistent/picgo-core-binary".to_string();
        let uploader = PicGoCoreUploader::new(&settings);

        let batch = uploader.upload_files(&["/a.png".to_string()]).await;
        assert!(!batch.success);
        assert!(batch.result_urls.is_empty());

        let clip = uploader.upload_from_clipboard().await;
        assert!(!clip.is_success());
    }
}
