//! Atomic snapshot writer.
//!
//! A dump never touches the destination file directly. The encoded bytes
//! go to a sibling temp file first, get flushed and fsynced, and only then
//! replace the destination through a rename. A crash or write failure at
//! any point leaves the previous snapshot (or its absence) intact.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::codec::{encode_snapshot, SnapshotRecord};
use crate::{Result, SnapshotError};

/// Suffix of the temp file written next to the destination
const TEMP_SUFFIX: &str = ".new";

/// Encodes the records and commits them durably to `dest`.
///
/// Failures surface as [`SnapshotError::Io`] with an `Unable to dump ...`
/// message naming the pool; the temp file is cleaned up and any previous
/// snapshot at `dest` is left as it was.
pub fn write_snapshot<R: SnapshotRecord>(records: &[R], dest: &Path) -> Result<()> {
    let data = encode_snapshot(records)?;
    let temp = temp_path(dest);

    if let Err(source) = commit_bytes(&data, &temp, dest) {
        // Best effort; the temp path may not exist or not be ours to remove
        let _ = fs::remove_file(&temp);
        return Err(SnapshotError::Io {
            message: format!("Unable to dump {} to disk", R::KIND.label()),
            source,
        });
    }

    info!(
        "dumped {} snapshot: {} records, {} bytes to {}",
        R::KIND,
        records.len(),
        data.len(),
        dest.display()
    );
    Ok(())
}

/// Writes bytes to the temp path, syncs them, and renames over `dest`.
fn commit_bytes(data: &[u8], temp: &Path, dest: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(temp)?);
    writer.write_all(data)?;
    writer.flush()?;

    // fsync before rename: the rename must never publish unsynced bytes
    writer.get_ref().sync_all()?;
    fs::rename(temp, dest)?;
    Ok(())
}

/// Temp path next to the destination (`<dest>.new`).
fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}
