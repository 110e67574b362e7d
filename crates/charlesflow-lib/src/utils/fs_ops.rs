// Filesystem helpers
// Recursive copy, staged directory replacement and write-then-rename
//
// Directory replacement is two-phase: the new tree is fully built in a
// sibling staging directory before the old tree is moved aside, so an
// interruption never leaves the destination empty.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sibling path `.<name>.<suffix>` next to `path`
fn sibling(path: &Path, suffix: &str) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path has no file name: {}", path.display()),
        )
    })?;
    let sibling_name = format!(".{}.{}", name.to_string_lossy(), suffix);
    Ok(match path.parent() {
        Some(parent) => parent.join(sibling_name),
        None => PathBuf::from(sibling_name),
    })
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Recursively copy `src` into `dst`, creating `dst`
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Move an already built directory into place, replacing `dst` wholesale
pub fn swap_dir_into_place(staged: &Path, dst: &Path) -> io::Result<()> {
    let old = sibling(dst, "old")?;
    remove_if_exists(&old)?;

    let had_previous = dst.exists();
    if had_previous {
        fs::rename(dst, &old)?;
    }

    if let Err(e) = fs::rename(staged, dst) {
        if had_previous {
            // put the previous tree back
            let _ = fs::rename(&old, dst);
        }
        return Err(e);
    }

    if had_previous {
        fs::remove_dir_all(&old)?;
    }
    Ok(())
}

/// Replace `dst` with a recursive copy of `src`
pub fn replace_dir(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = sibling(dst, "staging")?;
    remove_if_exists(&staging)?;

    if let Err(e) = copy_dir_recursive(src, &staging) {
        let _ = remove_if_exists(&staging);
        return Err(e);
    }
    swap_dir_into_place(&staging, dst)
}

/// Write `contents` to a temporary sibling, then rename over `path`
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = sibling(path, "tmp")?;
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Copy a single file through a temporary sibling
pub fn copy_file_atomic(src: &Path, dst: &Path) -> io::Result<()> {
    let contents = fs::read(src)?;
    write_atomic(dst, &contents)
}

/// Delete `path` recursively (if present) and create it again empty
pub fn recreate_dir(path: &Path) -> io::Result<()> {
    remove_if_exists(path)?;
    fs::create_dir_all(path)
}
