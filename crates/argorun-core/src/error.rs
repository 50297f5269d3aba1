use thiserror::Error;

/// Object-storage failure, as seen by the archiver.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store error: {0}")]
    Backend(String),
}

/// Failure of a single container run.
///
/// None of these are retried internally; every failure surfaces unchanged to
/// the caller of [`crate::ContainerRunner::run_container`]. Submission and
/// status-fetch errors are deliberately opaque: the server response body is
/// logged at warn level and never carried in the error itself.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("container image {image:?} is not allowed, check the runner configuration")]
    ImageNotAllowed { image: String },

    #[error("failed to upload input archive {key}")]
    ArchiveUpload {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to download output archive {key}")]
    ArchiveDownload {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete run artifacts")]
    ArchiveDelete(#[source] StoreError),

    #[error("unexpected error while creating the workflow")]
    Submission,

    #[error("unexpected error while receiving the job result")]
    StatusFetch,

    /// The engine reported a non-success terminal phase. The message is the
    /// engine's, verbatim, and may be empty.
    #[error("workflow finished in phase {phase}: {message}")]
    JobFailed { phase: String, message: String },

    #[error("workflow log stream failed: {0}")]
    LogStream(String),
}
