//! Delivery of a serialized bundle to exactly one sink.
//!
//! A non-blank remote address always wins. Otherwise the text is written locally,
//! either as a plain file or as an archive that may then be uploaded to object
//! storage. Failures are logged and reported through [`DeliveryOutcome`]; nothing
//! is raised to the caller.

mod cloud;
mod local;
mod remote;

pub use cloud::{S3Target, S3Uploader};
pub use local::{LocalOutputStore, archive_path_for};
pub use remote::{FHIR_JSON_CONTENT_TYPE, HttpRemoteSink};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::DeliveryError;

/// Pushes serialized text to a remote server
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn send(&self, text: &str, url: &str) -> Result<(), DeliveryError>;
}

/// Local persistence. Writes are create-only.
pub trait OutputStore: Send + Sync {
    fn ensure_dir(&self, dir: &Path) -> Result<(), DeliveryError>;

    /// Write `text` plus a trailing newline to a file that must not exist yet
    fn write_new(&self, path: &Path, text: &str) -> Result<(), DeliveryError>;

    /// Package `text` into an archive next to `path` and return the archive path.
    /// Nothing is written at `path` itself.
    fn write_archive(&self, path: &Path, text: &str) -> Result<PathBuf, DeliveryError>;
}

/// Uploads an archive to object storage and returns the object key
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    async fn upload(&self, archive: &Path) -> Result<String, DeliveryError>;
}

/// Everything the dispatcher needs to route one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub remote_url: Option<String>,
    pub output_path: PathBuf,
    pub compress: bool,
    pub upload: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStage {
    Serialize,
    RemotePush,
    LocalWrite,
    LocalCompress,
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serialize => "serialize",
            Self::RemotePush => "remote push",
            Self::LocalWrite => "local write",
            Self::LocalCompress => "local compress",
        })
    }
}

/// Result of the best-effort upload that follows a local archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    NotRequested,
    Uploaded { key: String },
    Failed { cause: String },
}

/// Terminal outcome of one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Pushed { url: String },
    Written { path: PathBuf },
    Archived { path: PathBuf, upload: UploadOutcome },
    Failed { stage: DeliveryStage, cause: String },
}

impl DeliveryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pushed { url } => write!(f, "pushed to {url}"),
            Self::Written { path } => write!(f, "written to {}", path.display()),
            Self::Archived { path, upload } => {
                write!(f, "archived to {}", path.display())?;
                match upload {
                    UploadOutcome::NotRequested => Ok(()),
                    UploadOutcome::Uploaded { key } => write!(f, ", uploaded as {key}"),
                    UploadOutcome::Failed { cause } => write!(f, ", upload failed: {cause}"),
                }
            }
            Self::Failed { stage, cause } => write!(f, "failed during {stage}: {cause}"),
        }
    }
}

enum DispatchState {
    RemotePush(String),
    LocalWrite,
    LocalCompress,
    CloudUpload(PathBuf),
    Done(DeliveryOutcome),
    Failed(DeliveryStage, DeliveryError),
}

impl DispatchState {
    fn name(&self) -> &'static str {
        match self {
            Self::RemotePush(_) => "REMOTE_PUSH",
            Self::LocalWrite => "LOCAL_WRITE",
            Self::LocalCompress => "LOCAL_COMPRESS",
            Self::CloudUpload(_) => "CLOUD_UPLOAD",
            Self::Done(_) => "DONE",
            Self::Failed(..) => "FAILED",
        }
    }
}

/// Runs the sink state machine for each export
#[derive(Clone)]
pub struct SinkDispatcher {
    remote: Arc<dyn RemoteSink>,
    store: Arc<dyn OutputStore>,
    uploader: Option<Arc<dyn ObjectUploader>>,
}

impl SinkDispatcher {
    pub fn new(remote: Arc<dyn RemoteSink>, store: Arc<dyn OutputStore>) -> Self {
        Self {
            remote,
            store,
            uploader: None,
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn ObjectUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Deliver `text` according to `plan`, returning once a terminal state is reached
    pub async fn dispatch(&self, text: &str, plan: &DeliveryPlan) -> DeliveryOutcome {
        let mut state = match plan.remote_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => DispatchState::RemotePush(url.to_string()),
            _ => DispatchState::LocalWrite,
        };

        loop {
            debug!(
                state = state.name(),
                path = %plan.output_path.display(),
                "Sink dispatch transition"
            );

            state = match state {
                DispatchState::RemotePush(url) => match self.remote.send(text, &url).await {
                    Ok(()) => DispatchState::Done(DeliveryOutcome::Pushed { url }),
                    Err(e) => DispatchState::Failed(DeliveryStage::RemotePush, e),
                },
                DispatchState::LocalWrite => self.local_write(text, plan),
                DispatchState::LocalCompress => {
                    match self.store.write_archive(&plan.output_path, text) {
                        Ok(archive) if plan.upload => DispatchState::CloudUpload(archive),
                        Ok(archive) => DispatchState::Done(DeliveryOutcome::Archived {
                            path: archive,
                            upload: UploadOutcome::NotRequested,
                        }),
                        Err(e) => DispatchState::Failed(DeliveryStage::LocalCompress, e),
                    }
                }
                DispatchState::CloudUpload(archive) => {
                    let upload = self.upload(&archive).await;
                    DispatchState::Done(DeliveryOutcome::Archived {
                        path: archive,
                        upload,
                    })
                }
                DispatchState::Done(outcome) => {
                    info!(outcome = %outcome, "Delivery complete");
                    return outcome;
                }
                DispatchState::Failed(stage, e) => {
                    error!(stage = %stage, error = %e, "Delivery failed");
                    return DeliveryOutcome::Failed {
                        stage,
                        cause: e.to_string(),
                    };
                }
            };
        }
    }

    fn local_write(&self, text: &str, plan: &DeliveryPlan) -> DispatchState {
        let path = &plan.output_path;
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if let Err(e) = self.store.ensure_dir(dir) {
                return DispatchState::Failed(DeliveryStage::LocalWrite, e);
            }
        }

        if plan.compress {
            return DispatchState::LocalCompress;
        }
        match self.store.write_new(path, text) {
            Ok(()) => DispatchState::Done(DeliveryOutcome::Written { path: path.clone() }),
            Err(e) => DispatchState::Failed(DeliveryStage::LocalWrite, e),
        }
    }

    async fn upload(&self, archive: &Path) -> UploadOutcome {
        let Some(uploader) = &self.uploader else {
            warn!(archive = %archive.display(), "Upload requested but no uploader is configured");
            return UploadOutcome::Failed {
                cause: "no object uploader configured".to_string(),
            };
        };

        match uploader.upload(archive).await {
            Ok(key) => UploadOutcome::Uploaded { key },
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "Archive upload failed");
                UploadOutcome::Failed {
                    cause: e.to_string(),
                }
            }
        }
    }
}
