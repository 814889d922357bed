//! Positional writes into a shared destination file.
//!
//! Workers finish chunks out of order, so bytes are written at their own
//! offset through a handle shared by every worker of the file. Ranges never
//! overlap, which is what makes the sharing sound.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Open `path` for positional writes and size it to `size` bytes.
///
/// Existing content is kept so chunks recovered from an earlier run stay
/// valid.
pub(crate) fn prepare_destination(path: &Path, size: u64) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.set_len(size)?;
    Ok(file)
}

/// Write `data` at `offset` and flush it to disk before returning.
pub(crate) async fn write_at(file: Arc<File>, offset: u64, data: Vec<u8>) -> io::Result<()> {
    tokio::task::spawn_blocking(move || {
        write_all_at(&file, &data, offset)?;
        file.sync_data()
    })
    .await
    .map_err(io::Error::other)?
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn out_of_order_writes_land_at_their_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.bin");
        let file = Arc::new(prepare_destination(&path, 6).unwrap());

        write_at(file.clone(), 4, b"ef".to_vec()).await.unwrap();
        write_at(file.clone(), 0, b"ab".to_vec()).await.unwrap();
        write_at(file, 2, b"cd".to_vec()).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[test]
    fn prepare_keeps_existing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, b"xyz").unwrap();

        prepare_destination(&path, 5).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"xyz\0\0");
    }
}
