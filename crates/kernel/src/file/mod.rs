//! Media library: storage backends and the media service.

pub mod service;
pub mod storage;

pub use service::{IncomingFile, MediaService, ReconcileReport, UploadResult};
pub use storage::{FileStorage, LocalFileStorage};
