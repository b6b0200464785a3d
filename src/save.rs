use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::naming;

// How many times to re-scan the folder when a freshly chosen name is taken
const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("destination folder {0} does not exist")]
    FolderMissing(PathBuf),
    #[error("unsupported video source '{0}'")]
    UnsupportedSource(String),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("could not find a free file name in {0}")]
    NoFreeName(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub folder: PathBuf,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedVideo {
    pub file_name: String,
    pub path: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SaveOutcome {
    Saved(SavedVideo),
    /// Another save was still running; this one was dropped.
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VideoSource {
    Remote(Url),
    Local(PathBuf),
}

fn classify_source(source: &str) -> Result<VideoSource, SaveError> {
    let source = source.trim();
    match Url::parse(source) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(VideoSource::Remote(url)),
            "file" => url
                .to_file_path()
                .map(VideoSource::Local)
                .map_err(|_| SaveError::UnsupportedSource(source.to_string())),
            // Windows drive letters parse as one-letter schemes
            scheme if scheme.len() == 1 => Ok(VideoSource::Local(PathBuf::from(source))),
            _ => Err(SaveError::UnsupportedSource(source.to_string())),
        },
        Err(_) if !source.is_empty() => Ok(VideoSource::Local(PathBuf::from(source))),
        Err(_) => Err(SaveError::UnsupportedSource(source.to_string())),
    }
}

// Clears the busy flag however the transfer ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Copies a video into a local folder as `<folder>-<N>.mp4`.
///
/// One save runs at a time. There is no timeout: a stalled server keeps the
/// bridge busy until the connection drops.
pub struct SaveBridge {
    client: reqwest::Client,
    busy: AtomicBool,
}

impl Default for SaveBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveBridge {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn save(&self, request: &SaveRequest) -> Result<SaveOutcome, SaveError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            tracing::info!(source = %request.source, "save already in progress, ignoring request");
            return Ok(SaveOutcome::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        tracing::info!(source = %request.source, folder = %request.folder.display(), "save video started");
        match self.transfer(request).await {
            Ok(saved) => {
                tracing::info!(path = %saved.path, bytes = saved.bytes, "save video finished");
                Ok(SaveOutcome::Saved(saved))
            }
            Err(e) => {
                tracing::warn!(source = %request.source, "save video failed: {}", e);
                Err(e)
            }
        }
    }

    async fn transfer(&self, request: &SaveRequest) -> Result<SavedVideo, SaveError> {
        let folder = request.folder.as_path();
        match fs::metadata(folder).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(SaveError::FolderMissing(folder.to_path_buf())),
        }

        match classify_source(&request.source)? {
            VideoSource::Remote(url) => {
                let mut response = self.client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(SaveError::Status(response.status().as_u16()));
                }

                let (mut file, file_name, path) = create_target(folder).await?;
                let result = async {
                    let mut bytes = 0u64;
                    while let Some(chunk) = response.chunk().await? {
                        file.write_all(&chunk).await?;
                        bytes += chunk.len() as u64;
                    }
                    file.flush().await?;
                    Ok::<u64, SaveError>(bytes)
                }
                .await;
                drop(file);

                finish(file_name, path, result).await
            }
            VideoSource::Local(source) => {
                let mut input = fs::File::open(&source).await?;
                let (mut file, file_name, path) = create_target(folder).await?;
                let result = async {
                    let bytes = tokio::io::copy(&mut input, &mut file).await?;
                    file.flush().await?;
                    Ok::<u64, SaveError>(bytes)
                }
                .await;
                drop(file);

                finish(file_name, path, result).await
            }
        }
    }
}

// Claim the next free name. create_new never clobbers a file that appeared
// between the scan and the open.
async fn create_target(folder: &Path) -> Result<(fs::File, String, PathBuf), SaveError> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let file_name = naming::next_filename(folder).await?;
        let path = folder.join(&file_name);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((file, file_name, path)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(SaveError::NoFreeName(folder.to_path_buf()))
}

async fn finish(
    file_name: String,
    path: PathBuf,
    result: Result<u64, SaveError>,
) -> Result<SavedVideo, SaveError> {
    match result {
        Ok(bytes) => Ok(SavedVideo {
            file_name,
            path: path.to_string_lossy().into_owned(),
            bytes,
        }),
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), "could not remove partial file: {}", remove_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    const VIDEO: &[u8] = b"not really an mp4 but close enough";

    async fn serve() -> String {
        let app = Router::new()
            .route("/video.mp4", get(|| async { VIDEO }))
            .route("/missing.mp4", get(|| async { StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    // Promises `declared` bytes, sends `body`, then hangs up
    async fn serve_truncated(declared: usize, body: &'static [u8]) -> String {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!("HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n", declared);
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.flush().await.unwrap();
        });
        format!("http://{}/video.mp4", addr)
    }

    fn clips_folder(root: &tempfile::TempDir) -> PathBuf {
        let folder = root.path().join("clips");
        std::fs::create_dir(&folder).unwrap();
        folder
    }

    fn saved(outcome: SaveOutcome) -> SavedVideo {
        match outcome {
            SaveOutcome::Saved(v) => v,
            SaveOutcome::Busy => panic!("unexpected busy outcome"),
        }
    }

    #[test]
    fn test_classify_source() {
        assert!(matches!(classify_source("https://a.com/v.mp4"), Ok(VideoSource::Remote(_))));
        assert!(matches!(classify_source(" http://a.com/v.mp4 "), Ok(VideoSource::Remote(_))));
        assert_eq!(
            classify_source("/videos/v.mp4").unwrap(),
            VideoSource::Local(PathBuf::from("/videos/v.mp4"))
        );
        assert_eq!(
            classify_source("file:///videos/v.mp4").unwrap(),
            VideoSource::Local(PathBuf::from("/videos/v.mp4"))
        );
        assert!(matches!(classify_source("ftp://a.com/v.mp4"), Err(SaveError::UnsupportedSource(_))));
        assert!(matches!(classify_source("  "), Err(SaveError::UnsupportedSource(_))));
    }

    #[tokio::test]
    async fn test_downloads_with_sequential_names() {
        let base = serve().await;
        let root = tempfile::tempdir().unwrap();
        let folder = clips_folder(&root);
        std::fs::write(folder.join("clips-3.mp4"), b"old").unwrap();

        let bridge = SaveBridge::new();
        let request = SaveRequest {
            folder: folder.clone(),
            source: format!("{}/video.mp4", base),
        };

        let first = saved(bridge.save(&request).await.unwrap());
        assert_eq!(first.file_name, "clips-4.mp4");
        assert_eq!(first.bytes, VIDEO.len() as u64);
        assert_eq!(std::fs::read(folder.join("clips-4.mp4")).unwrap(), VIDEO);

        let second = saved(bridge.save(&request).await.unwrap());
        assert_eq!(second.file_name, "clips-5.mp4");
        assert_eq!(std::fs::read(folder.join("clips-3.mp4")).unwrap(), b"old");
        assert!(!bridge.is_busy());
    }

    #[tokio::test]
    async fn test_http_error_creates_no_file() {
        let base = serve().await;
        let root = tempfile::tempdir().unwrap();
        let folder = clips_folder(&root);

        let bridge = SaveBridge::new();
        let request = SaveRequest {
            folder: folder.clone(),
            source: format!("{}/missing.mp4", base),
        };
        let err = bridge.save(&request).await.unwrap_err();
        assert!(matches!(err, SaveError::Status(404)));
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
        assert!(!bridge.is_busy());
    }

    #[tokio::test]
    async fn test_truncated_download_removes_partial_file() {
        let source = serve_truncated(1000, &VIDEO[..10]).await;
        let root = tempfile::tempdir().unwrap();
        let folder = clips_folder(&root);

        let bridge = SaveBridge::new();
        let request = SaveRequest {
            folder: folder.clone(),
            source,
        };
        let err = bridge.save(&request).await.unwrap_err();
        assert!(matches!(err, SaveError::Http(_)));
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
        assert!(!bridge.is_busy());
    }

    #[tokio::test]
    async fn test_copies_local_file() {
        let root = tempfile::tempdir().unwrap();
        let folder = clips_folder(&root);
        let source = root.path().join("input.mp4");
        std::fs::write(&source, VIDEO).unwrap();

        let bridge = SaveBridge::new();
        let request = SaveRequest {
            folder: folder.clone(),
            source: source.to_string_lossy().into_owned(),
        };
        let video = saved(bridge.save(&request).await.unwrap());
        assert_eq!(video.file_name, "clips-0.mp4");
        assert_eq!(std::fs::read(folder.join("clips-0.mp4")).unwrap(), VIDEO);
    }

    #[tokio::test]
    async fn test_missing_local_source_leaves_folder_empty() {
        let root = tempfile::tempdir().unwrap();
        let folder = clips_folder(&root);

        let bridge = SaveBridge::new();
        let request = SaveRequest {
            folder: folder.clone(),
            source: root.path().join("gone.mp4").to_string_lossy().into_owned(),
        };
        assert!(matches!(bridge.save(&request).await, Err(SaveError::Io(_))));
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let root = tempfile::tempdir().unwrap();
        let bridge = SaveBridge::new();
        let request = SaveRequest {
            folder: root.path().join("nope"),
            source: "https://example.com/v.mp4".to_string(),
        };
        assert!(matches!(bridge.save(&request).await, Err(SaveError::FolderMissing(_))));
    }

    #[tokio::test]
    async fn test_busy_bridge_drops_request() {
        let root = tempfile::tempdir().unwrap();
        let folder = clips_folder(&root);
        let source = root.path().join("input.mp4");
        std::fs::write(&source, VIDEO).unwrap();

        let bridge = SaveBridge::new();
        bridge.busy.store(true, Ordering::Release);
        let request = SaveRequest {
            folder: folder.clone(),
            source: source.to_string_lossy().into_owned(),
        };
        assert_eq!(bridge.save(&request).await.unwrap(), SaveOutcome::Busy);
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
        // the dropped request must not clear someone else's flag
        assert!(bridge.is_busy());
    }
}
