//! PicGo 本地 HTTP 服务后端
//!
//! # 设计思路
//!
//! PicGo 桌面端在本机暴露一个上传地址（默认 `http://127.0.0.1:36677/upload`）：
//! - 批量上传：`POST {"list": [路径...]}`，返回 `{"success": bool, "result": [url...]}`
//! - 剪贴板上传：不带请求体的 `POST`，由 PicGo 自己读取剪贴板
//!
//! # 实现思路
//!
//! - 复用同一个 `reqwest::Client`，连接/总超时来自设置。
//! - 非 2xx、响应体不是合法 JSON、`success == false` 均视为失败。
//! - 成功但数量不一致时在端口边界降级为失败（`ensure_count`）。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{BatchUploadResult, ClipboardUploadResult, UploadError, UploaderPort};
use crate::settings::PluginSettings;

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    list: &'a [String],
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Vec<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl UploadResponse {
    fn into_urls(self) -> Result<Vec<String>, UploadError> {
        if self.success {
            return Ok(self.result);
        }
        let detail = self
            .message
            .or(self.msg)
            .unwrap_or_else(|| "success = false".to_string());
        Err(UploadError::Backend(detail))
    }
}

pub struct PicGoUploader {
    client: reqwest::Client,
    server: String,
}

impl PicGoUploader {
    pub fn new(settings: &PluginSettings) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| UploadError::Network(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self {
            client,
            server: settings.upload_server.clone(),
        })
    }

    async fn post(&self, body: Option<Vec<u8>>) -> Result<UploadResponse, UploadError> {
        let mut request = self.client.post(&self.server);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Network(format!("请求 PicGo 失败：{}", e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| UploadError::Network(format!("读取 PicGo 响应失败：{}", e)))?;

        if !status.is_success() {
            return Err(UploadError::Backend(format!(
                "HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&bytes)
            )));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| UploadError::InvalidResponse(format!("PicGo 响应不是合法 JSON：{}", e)))
    }

    async fn try_upload_files(&self, paths: &[String]) -> Result<Vec<String>, UploadError> {
        let body = serde_json::to_vec(&UploadRequest { list: paths })
            .map_err(|e| UploadError::InvalidResponse(format!("序列化请求失败：{}", e)))?;
        self.post(Some(body)).await?.into_urls()
    }

    async fn try_upload_clipboard(&self) -> Result<String, UploadError> {
        self.post(None)
            .await?
            .into_urls()?
            .into_iter()
            .next()
            .ok_or_else(|| UploadError::InvalidResponse("PicGo 未返回图片地址".to_string()))
    }
}

#[async_trait::async_trait]
impl UploaderPort for PicGoUploader {
    async fn upload_files(&self, paths: &[String]) -> BatchUploadResult {
        log::info!("📤 PicGo 批量上传 - {} 个文件", paths.len());
        let result = self.try_upload_files(paths).await;
        if let Err(err) = &result {
            log::error!("❌ PicGo 上传失败: {err}");
        }
        BatchUploadResult::from(result).ensure_count(paths.len())
    }

    async fn upload_from_clipboard(&self) -> ClipboardUploadResult {
        log::info!("📋 PicGo 剪贴板上传");
        let result = self.try_upload_clipboard().await;
        if let Err(err) = &result {
            log::error!("❌ PicGo 剪贴板上传失败: {err}");
        }
        ClipboardUploadResult::from(result)
    }

    fn name(&self) -> &'static str {
        "PicGo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// 单次应答的本地假服务，返回收到的原始请求。
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let addr = listener.local_addr().expect("read local addr failed");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");
            let request = read_request(&mut stream);

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).expect("write response failed");
            stream.flush().expect("flush failed");
            request
        });

        (format!("http://127.0.0.1:{}/upload", addr.port()), server)
    }

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).expect("read request failed");
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    fn uploader_for(server: String) -> PicGoUploader {
        let mut settings = PluginSettings::default();
        settings.upload_server = server;
        settings.request_timeout_secs = 5;
        PicGoUploader::new(&settings).expect("uploader init failed")
    }

    #[tokio::test]
    async fn upload_files_posts_list_and_returns_urls() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"success":true,"result":["http://cdn/1.png","http://cdn/2.png"]}"#,
        );
        let uploader = uploader_for(url);

        let paths = vec!["/vault/a.png".to_string(), "/vault/b.png".to_string()];
        let result = uploader.upload_files(&paths).await;
        let request = server.join().expect("server thread failed");

        assert!(result.success);
        assert_eq!(result.result_urls, vec!["http://cdn/1.png", "http://cdn/2.png"]);
        assert!(request.starts_with("POST /upload"));
        assert!(request.contains(r#"{"list":["/vault/a.png","/vault/b.png"]}"#));
    }

    #[tokio::test]
    async fn truncated_success_is_reported_as_failure() {
        let (url, server) = serve_once("200 OK", r#"{"success":true,"result":["http://cdn/1.png"]}"#);
        let uploader = uploader_for(url);

        let paths = vec!["/a.png".to_string(), "/b.png".to_string()];
        let result = uploader.upload_files(&paths).await;
        server.join().expect("server thread failed");

        assert!(!result.success);
        assert!(result.result_urls.is_empty());
    }

    #[tokio::test]
    async fn backend_failure_and_bad_status_are_failures() {
        let (url, server) = serve_once("200 OK", r#"{"success":false,"message":"no config"}"#);
        let result = uploader_for(url).upload_files(&["/a.png".to_string()]).await;
        server.join().expect("server thread failed");
        assert!(!result.success);
        assert!(result.error_message.unwrap_or_default().contains("no config"));

        let (url, server) = serve_once("500 Internal Server Error", "{}");
        let result = uploader_for(url).upload_files(&["/a.png".to_string()]).await;
        server.join().expect("server thread failed");
        assert!(!result.success);
    }

    #[tokio::test]
    async fn clipboard_upload_takes_first_url() {
        let (url, server) = serve_once("200 OK", r#"{"success":true,"result":["http://cdn/clip.png"]}"#);
        let result = uploader_for(url).upload_from_clipboard().await;
        let request = server.join().expect("server thread failed");

        assert_eq!(result, ClipboardUploadResult::ok("http://cdn/clip.png"));
        assert!(request.starts_with("POST /upload"));
    }

    #[tokio::test]
    async fn clipboard_upload_with_empty_result_fails() {
        let (url, server) = serve_once("200 OK", r#"{"success":true,"result":[]}"#);
        let result = uploader_for(url).upload_from_clipboard().await;
        server.join().expect("server thread failed");
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn unreachable_server_is_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let result = uploader_for(format!("http://127.0.0.1:{port}/upload"))
            .upload_files(&["/a.png".to_string()])
            .await;
        assert!(!result.success);
    }
}
