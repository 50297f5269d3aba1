use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use indexmap::IndexMap;
use tar::{Archive, Builder, EntryType, Header};
use uuid::Uuid;

use argorun_core::{ObjectStore, RunError, StoreError};
use argorun_model::FolderBinding;

/// Marker entry added to every uploaded archive. The workflow engine skips
/// empty directories when it archives the outputs, so each upload carries one
/// regular file at a fixed nested path and the download deletes the marker
/// directory again. Directories that only ever contain the marker therefore
/// survive the round trip.
pub const TMP_MARKER_DIR: &str = "__argo-tmp";

const WORK_DIR_PREFIX: &str = "container-runner";

/// Moves mounted host directories in and out of object storage as gzip'd
/// tar archives.
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ArtifactStore {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Assign object keys to the requested mounts. Every run gets a fresh
    /// work-directory prefix so concurrent runs never collide. Returns the
    /// prefix in displayable form together with the bindings.
    pub fn calculate_bindings(
        &self,
        mount_dirs: &IndexMap<PathBuf, String>,
    ) -> (String, Vec<FolderBinding>) {
        let work_dir = format!("{WORK_DIR_PREFIX}-{}", Uuid::new_v4());
        let bindings = mount_dirs
            .iter()
            .enumerate()
            .map(|(index, (host, container))| FolderBinding {
                host_directory: host.clone(),
                container_directory: container.clone(),
                input_key: format!("{work_dir}/input-{index}.tar.gz"),
                output_key: format!("{work_dir}/output-{index}.tar.gz"),
            })
            .collect();
        (format!("{work_dir}/*"), bindings)
    }

    /// Archive each bound host directory and upload it under its input key.
    pub async fn upload(&self, bindings: &[FolderBinding]) -> Result<(), RunError> {
        for binding in bindings {
            let host = binding.host_directory.clone();
            let archive = run_blocking(move || pack_directory(&host))
                .await
                .map_err(|source| RunError::ArchiveUpload {
                    key: binding.input_key.clone(),
                    source,
                })?;
            self.store
                .put(&self.bucket, &binding.input_key, Bytes::from(archive))
                .await
                .map_err(|source| RunError::ArchiveUpload {
                    key: binding.input_key.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Download each output archive and extract it into the bound host
    /// directory, merging with whatever is already there.
    pub async fn download(&self, bindings: &[FolderBinding]) -> Result<(), RunError> {
        for binding in bindings {
            let archive = self
                .store
                .get(&self.bucket, &binding.output_key)
                .await
                .map_err(|source| RunError::ArchiveDownload {
                    key: binding.output_key.clone(),
                    source,
                })?;
            let host = binding.host_directory.clone();
            run_blocking(move || unpack_into(&host, &archive))
                .await
                .map_err(|source| RunError::ArchiveDownload {
                    key: binding.output_key.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Remove every object the run touched, inputs and outputs alike, in a
    /// single batched call.
    pub async fn delete(&self, bindings: &[FolderBinding]) -> Result<(), RunError> {
        let keys: Vec<String> = bindings
            .iter()
            .flat_map(|binding| [binding.input_key.clone(), binding.output_key.clone()])
            .collect();
        self.store
            .delete_batch(&self.bucket, &keys)
            .await
            .map_err(RunError::ArchiveDelete)
    }
}

async fn run_blocking<T>(
    work: impl FnOnce() -> Result<T, StoreError> + Send + 'static,
) -> Result<T, StoreError>
where
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(join) => Err(StoreError::Io(io::Error::other(join))),
    }
}

/// Build a gzip'd tar archive of `dir`. Symlinks are stored as links, not
/// resolved, and the marker entry is appended last.
fn pack_directory(dir: &Path) -> Result<Vec<u8>, StoreError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(".", dir)?;

    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(0);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(
        &mut header,
        format!("{TMP_MARKER_DIR}/{TMP_MARKER_DIR}"),
        io::empty(),
    )?;

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Extract an output archive into `dir`. The engine wraps everything in one
/// top-level directory, so the first path component of each entry is
/// stripped, and the marker directory is removed afterwards.
fn unpack_into(dir: &Path, archive: &[u8]) -> Result<(), StoreError> {
    let mut archive = Archive::new(GzDecoder::new(archive));
    archive.set_preserve_permissions(true);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let stripped: PathBuf = path.components().skip(1).collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }
        if stripped
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            continue;
        }
        let target = dir.join(&stripped);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }

    match std::fs::remove_dir_all(dir.join(TMP_MARKER_DIR)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
