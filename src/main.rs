//! # 图片自动上传：命令行宿主
//!
//! 本文件只负责参数解析、日志初始化与宿主适配（目录仓库 + 内存文档 + 终端提示）。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use image_auto_upload::host::{ConsoleNotifier, DocumentEditor, FsVault, MemoryDocument};
use image_auto_upload::service::vault_relative;
use image_auto_upload::{
    AppError, ClipboardFile, ClipboardPayload, DocumentRequest, DroppedFile, ImageAutoUpload, PluginSettings,
};

/// 仓库内默认的设置文件（隐藏文件，不会被当作仓库内容遍历）。
const DEFAULT_SETTINGS_FILE: &str = ".image-auto-upload.json";

#[derive(Parser)]
#[command(name = "image-auto-upload")]
#[command(about = "Upload / download the images referenced by a markdown note", long_about = None)]
#[command(version)]
struct Cli {
    /// 仓库根目录
    #[arg(long)]
    vault: PathBuf,

    /// 设置文件，默认为仓库根目录下的 .image-auto-upload.json
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload every image referenced by the note
    Upload { note: String },
    /// Download every network image referenced by the note
    Download { note: String },
    /// Upload one vault image and rewrite the note's references to it
    UploadFile { note: String, image: PathBuf },
    /// Paste the system clipboard at the end of the note
    Paste { note: String },
    /// Drop files at the end of the note
    Drop {
        note: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Command {
    fn note(&self) -> &str {
        match self {
            Self::Upload { note }
            | Self::Download { note }
            | Self::UploadFile { note, .. }
            | Self::Paste { note }
            | Self::Drop { note, .. } => note,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| cli.vault.join(DEFAULT_SETTINGS_FILE));
    let settings = PluginSettings::load_or_default(&settings_path);

    let note = cli.command.note().replace('\\', "/");
    let note_file = cli.vault.join(&note);
    let content = tokio::fs::read_to_string(&note_file)
        .await
        .map_err(|e| AppError::Host(format!("无法读取笔记 '{}': {}", note_file.display(), e)))?;
    let document = MemoryDocument::new(note.clone(), content);

    let vault = FsVault::new(cli.vault.clone(), settings.attachment_folder_path.clone());
    let service = ImageAutoUpload::new(settings, Arc::new(vault), Arc::new(ConsoleNotifier))?;

    let request = match cli.command {
        Command::Upload { .. } => DocumentRequest::UploadAll,
        Command::Download { .. } => DocumentRequest::DownloadAll,
        Command::UploadFile { image, .. } => DocumentRequest::UploadFile(to_vault_path(&cli.vault, &image)?),
        Command::Paste { .. } => DocumentRequest::Paste(read_clipboard()?),
        Command::Drop { files, .. } => {
            DocumentRequest::Drop(files.into_iter().map(DroppedFile::from_path).collect())
        }
    };

    let handled = service.dispatch(&document, request).await;
    log::debug!("请求处理结果: handled = {}", handled);

    if document.is_dirty() {
        tokio::fs::write(&note_file, document.value()).await?;
        log::info!("💾 笔记已保存 - {}", note_file.display());
    }
    Ok(())
}

/// 文件菜单参数：接受仓库相对路径或仓库内的绝对路径。
fn to_vault_path(vault: &Path, image: &Path) -> Result<String, AppError> {
    if image.is_relative() {
        return Ok(image.to_string_lossy().replace('\\', "/"));
    }
    vault_relative(vault, image)
        .ok_or_else(|| AppError::Host(format!("图片不在仓库内: {}", image.display())))
}

/// 读取系统剪贴板：文本 + 是否有图片。
fn read_clipboard() -> Result<ClipboardPayload, AppError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| AppError::Host(format!("无法访问剪贴板: {}", e)))?;

    let text = clipboard.get_text().unwrap_or_default();
    let files = match clipboard.get_image() {
        Ok(image) => {
            log::debug!("剪贴板中有图片 - {}x{}", image.width, image.height);
            vec![ClipboardFile {
                name: "image.png".to_string(),
                mime: "image/png".to_string(),
            }]
        }
        Err(_) => Vec::new(),
    };

    Ok(ClipboardPayload { text, files })
}
