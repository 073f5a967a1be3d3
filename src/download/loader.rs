//! # 网络图片加载与落盘
//!
//! ## 设计思路
//!
//! 下载是逐项独立、尽力而为的：每一项都尽早失败，减少不必要的内存与磁盘消耗。
//!
//! ## 实现思路
//!
//! - 状态码：非 2xx 直接失败（重定向交给 reqwest 默认策略）。
//! - 体积：先看 `Content-Length`，再在分块读取时累计校验。
//! - 签名：用 `infer` 识别文件头，能识别且不是图片的直接拒绝；
//!   `.svg` 是文本格式，允许识别为 XML。
//! - 写盘：全部校验通过后一次性写入目标路径。

use std::path::Path;
use std::time::Duration;

use super::DownloadError;
use crate::settings::PluginSettings;

const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;

/// 带校验的图片下载器。
#[derive(Debug, Clone)]
pub struct ImageLoader {
    client: reqwest::Client,
    max_bytes: u64,
    timeout_secs: u64,
}

impl ImageLoader {
    pub fn new(settings: &PluginSettings) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| DownloadError::Network(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self {
            client,
            max_bytes: settings.max_download_bytes,
            timeout_secs: settings.request_timeout_secs,
        })
    }

    /// 下载 `url` 并写入 `target`。
    pub async fn download_to(&self, url: &str, target: &Path) -> Result<u64, DownloadError> {
        let bytes = self.fetch(url).await?;
        Self::validate_image_signature(&bytes, &crate::reference::extension_of(&target.to_string_lossy()))?;

        tokio::fs::write(target, &bytes)
            .await
            .map_err(|e| DownloadError::FileSystem(format!("写入 '{}' 失败：{}", target.display(), e)))?;

        log::info!("💾 已保存图片 - {} ({} bytes)", target.display(), bytes.len());
        Ok(bytes.len() as u64)
    }

    /// 拉取 URL 的响应体，带状态码与体积校验。
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        log::info!("🌐 开始下载图片 - URL: {}", redact_url_for_log(url));

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| DownloadError::InvalidFormat(format!("URL 格式错误：{}", e)))?;

        let mut response = self
            .client
            .get(parsed)
            .header(reqwest::header::ACCEPT, "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus(status.as_u16()));
        }

        let total_len = response.content_length();
        if let Some(size) = total_len {
            if size > self.max_bytes {
                return Err(DownloadError::ResourceLimit(format!(
                    "文件过大：{:.2} MB（限制：{:.2} MB）",
                    size as f64 / 1024.0 / 1024.0,
                    self.max_bytes as f64 / 1024.0 / 1024.0
                )));
            }
        }

        let initial_capacity = total_len
            .map(|len| len.min(self.max_bytes) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);
        let mut total: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_reqwest_error(e))? {
            total = total.saturating_add(chunk.len() as u64);
            if total > self.max_bytes {
                return Err(DownloadError::ResourceLimit("下载后文件超过大小限制".to_string()));
            }
            buffer.extend_from_slice(&chunk);
        }

        log::debug!("✅ 下载完成 - {} bytes", total);
        Ok(buffer)
    }

    /// 通过文件签名（magic bytes）校验下载内容。
    ///
    /// 无法识别的内容放行（后缀已经确认是图片），能识别且不是图片的拒绝。
    pub(super) fn validate_image_signature(bytes: &[u8], ext: &str) -> Result<(), DownloadError> {
        if bytes.is_empty() {
            return Err(DownloadError::InvalidFormat("图片内容为空".to_string()));
        }

        let Some(kind) = infer::get(bytes) else {
            return Ok(());
        };

        if kind.matcher_type() == infer::MatcherType::Image {
            return Ok(());
        }
        if ext == ".svg" && kind.mime_type() == "text/xml" {
            return Ok(());
        }

        Err(DownloadError::InvalidFormat(format!(
            "下载内容不是图片类型：{}",
            kind.mime_type()
        )))
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> DownloadError {
        if e.is_timeout() {
            DownloadError::Timeout(format!("下载超时（{}秒）", self.timeout_secs))
        } else if e.is_connect() {
            DownloadError::Network(format!("无法连接：{}", e))
        } else {
            DownloadError::Network(format!("请求失败：{}", e))
        }
    }
}

/// 日志中只保留 scheme/host/path，去掉查询串中可能的令牌。
fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
    format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    const PNG_BYTES: [u8; 16] = [137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82];

    fn serve_once(status: &'static str, body: Vec<u8>) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let addr = listener.local_addr().expect("read local addr failed");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");
            let mut req_buf = [0u8; 1024];
            let _ = stream.read(&mut req_buf);

            let headers = format!(
                "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            stream.write_all(headers.as_bytes()).expect("write headers failed");
            stream.write_all(&body).expect("write body failed");
            stream.flush().expect("flush failed");
        });

        (format!("http://127.0.0.1:{}/pic.png?token=abc", addr.port()), server)
    }

    fn loader() -> ImageLoader {
        ImageLoader::new(&PluginSettings::default()).expect("loader init failed")
    }

    #[tokio::test]
    async fn download_writes_validated_image() {
        let (url, server) = serve_once("200 OK", PNG_BYTES.to_vec());
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("image-pic.png");

        let written = loader().download_to(&url, &target).await.expect("download");
        server.join().expect("server thread failed");

        assert_eq!(written, PNG_BYTES.len() as u64);
        assert_eq!(std::fs::read(&target).expect("read back"), PNG_BYTES);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (url, server) = serve_once("404 Not Found", Vec::new());
        let result = loader().fetch(&url).await;
        server.join().expect("server thread failed");

        assert!(matches!(result, Err(DownloadError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (url, server) = serve_once("200 OK", vec![0u8; 2048]);
        let mut settings = PluginSettings::default();
        settings.max_download_bytes = 1024;
        let loader = ImageLoader::new(&settings).expect("loader init failed");

        let result = loader.fetch(&url).await;
        server.join().expect("server thread failed");

        assert!(matches!(result, Err(DownloadError::ResourceLimit(_))));
    }

    #[tokio::test]
    async fn non_image_payload_is_not_written() {
        let zip = b"PK\x03\x04\x14\x00\x00\x00\x08\x00".to_vec();
        let (url, server) = serve_once("200 OK", zip);
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("image-pic.png");

        let result = loader().download_to(&url, &target).await;
        server.join().expect("server thread failed");

        assert!(matches!(result, Err(DownloadError::InvalidFormat(_))));
        assert!(!target.exists());
    }

    #[test]
    fn signature_check_allows_unknown_and_svg() {
        assert!(ImageLoader::validate_image_signature(&PNG_BYTES, ".png").is_ok());
        assert!(ImageLoader::validate_image_signature(b"\x00\x01\x02\x03", ".bmp").is_ok());
        assert!(ImageLoader::validate_image_signature(b"", ".png").is_err());
        assert!(ImageLoader::validate_image_signature(
            b"<?xml version=\"1.0\"?><svg xmlns=\"http://www.w3.org/2000/svg\"></svg>",
            ".svg"
        )
        .is_ok());
    }

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        assert_eq!(
            redact_url_for_log("https://example.com:8443/path/img.png?token=abc123#hash"),
            "https://example.com:8443/path/img.png"
        );
        assert_eq!(redact_url_for_log("not a url"), "<invalid-url>");
    }
}
