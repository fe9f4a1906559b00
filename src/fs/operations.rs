use std::path::{Path, PathBuf};

use tokio::io::{self, AsyncWriteExt};

fn temporary_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

/// Writes `contents` to a temporary file next to `path` and renames it into place, so readers see
/// either the old file or the complete new one.
///
/// With `overwrite` unset the call fails with [io::ErrorKind::AlreadyExists] if `path` appeared
/// while the temporary file was being written.
pub async fn replace_file(path: &Path, contents: &str, overwrite: bool) -> Result<(), io::Error> {
    let temporary = temporary_sibling(path);
    let result = write_then_rename(&temporary, path, contents, overwrite).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&temporary).await;
    }
    result
}

async fn write_then_rename(
    temporary: &Path,
    path: &Path,
    contents: &str,
    overwrite: bool,
) -> Result<(), io::Error> {
    let mut file = tokio::fs::File::create(temporary).await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    if !overwrite && tokio::fs::try_exists(path).await? {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{path:?} was created concurrently"),
        ));
    }
    tokio::fs::rename(temporary, path).await
}
