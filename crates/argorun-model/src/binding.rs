use std::path::PathBuf;

/// One mount binding resolved to its per-run object-storage keys.
///
/// The input key holds the archive uploaded before the job starts; the
/// output key holds the archive the engine produces for the same container
/// directory. Keys are namespaced by the run's work directory and are never
/// reused across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderBinding {
    pub host_directory: PathBuf,
    pub container_directory: String,
    pub input_key: String,
    pub output_key: String,
}
