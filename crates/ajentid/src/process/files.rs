use std::fs::{DirBuilder, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

use camino::Utf8Path;
use tempfile::Builder;

/// Creates `dir` and its parents with owner-only permissions when missing.
pub(crate) fn ensure_private_dir(dir: &Utf8Path) -> io::Result<()> {
    match DirBuilder::new().recursive(true).mode(0o750).create(dir) {
        Err(error) if error.kind() != io::ErrorKind::AlreadyExists => Err(error),
        _ => Ok(()),
    }
}

/// Writes `contents` to `path` so readers never see a partial file.
///
/// The payload is synced into a sibling temporary file which is then renamed
/// over the destination.
pub(crate) fn atomic_write(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("'{path}' has no parent directory"),
        )
    })?;
    ensure_private_dir(directory)?;

    let mut builder = Builder::new();
    builder
        .prefix(path.file_name().unwrap_or("ajentid"))
        .permissions(Permissions::from_mode(0o600));

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
