use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

/// A trash directory that deleted items are moved into.
///
/// On macOS this is `~/.Trash`. Elsewhere it is the freedesktop trash
/// (`files/` + `info/`), and a `.trashinfo` record is written next to each
/// moved item so the desktop can restore it.
#[derive(Debug, Clone)]
pub struct TrashBin {
    files_dir: PathBuf,
    info_dir: Option<PathBuf>,
}

impl TrashBin {
    /// The current user's trash
    pub fn for_current_user() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        if cfg!(target_os = "macos") {
            Self::at(home.join(".Trash"))
        } else {
            let base = dirs::data_dir()
                .unwrap_or_else(|| home.join(".local/share"))
                .join("Trash");
            Self::freedesktop(base)
        }
    }

    /// A plain directory used as trash, without restore records
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: dir.into(),
            info_dir: None,
        }
    }

    /// A freedesktop-style trash rooted at `base`
    pub fn freedesktop(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            files_dir: base.join("files"),
            info_dir: Some(base.join("info")),
        }
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Whether `path` is the trash directory or something inside it
    pub fn holds(&self, path: &Path) -> bool {
        path.starts_with(&self.files_dir)
    }

    /// Remove the restore record of an item being purged from the trash
    pub fn forget(&self, trashed: &Path) {
        let (Some(info_dir), Some(name)) = (&self.info_dir, trashed.file_name()) else {
            return;
        };
        if trashed.parent() != Some(self.files_dir.as_path()) {
            return;
        }
        let record = info_dir.join(format!("{}.trashinfo", name.to_string_lossy()));
        match std::fs::remove_file(&record) {
            Ok(()) => tracing::debug!("Removed trash record: {}", record.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove trash record {}: {}", record.display(), e),
        }
    }

    /// Move `original` into the trash and return where it landed
    pub fn put(&self, original: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.files_dir)?;
        if let Some(info_dir) = &self.info_dir {
            std::fs::create_dir_all(info_dir)?;
        }

        let name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "item".to_string());
        let trashed = unique_destination(&self.files_dir, &name);

        // Info record must exist before the item lands in files/
        let info_path = self.info_dir.as_ref().map(|dir| {
            dir.join(format!(
                "{}.trashinfo",
                trashed.file_name().unwrap_or_default().to_string_lossy()
            ))
        });
        if let Some(info_path) = &info_path {
            std::fs::write(info_path, trash_info(original))?;
        }

        if let Err(e) = move_path(original, &trashed) {
            if let Some(info_path) = &info_path {
                let _ = std::fs::remove_file(info_path);
            }
            return Err(e);
        }
        Ok(trashed)
    }
}

/// First free `name`, `name 2`, `name 3`, ... in `dir`
fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if std::fs::symlink_metadata(&candidate).is_err() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s.to_string(), format!(".{}", e)),
        _ => (name.to_string(), String::new()),
    };
    let mut n = 2usize;
    loop {
        let candidate = dir.join(format!("{} {}{}", stem, n, ext));
        if std::fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        n += 1;
    }
}

fn trash_info(original: &Path) -> String {
    format!(
        "[Trash Info]\nPath={}\nDeletionDate={}\n",
        encode_path(original),
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S")
    )
}

/// Percent-encode every byte except `/` and the URI unreserved set
fn encode_path(path: &Path) -> String {
    let mut out = String::new();
    for &b in path_bytes(path).iter() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    Cow::Owned(path.to_string_lossy().into_owned().into_bytes())
}

/// Rename, or copy then remove when crossing filesystems
fn move_path(original: &Path, dest: &Path) -> io::Result<()> {
    if std::fs::rename(original, dest).is_ok() {
        return Ok(());
    }

    let meta = std::fs::symlink_metadata(original)?;
    if meta.is_dir() {
        copy_dir_recursive(original, dest)?;
        std::fs::remove_dir_all(original)?;
    } else if meta.file_type().is_symlink() {
        copy_symlink(original, dest)?;
        std::fs::remove_file(original)?;
    } else {
        std::fs::copy(original, dest)?;
        std::fs::remove_file(original)?;
    }

    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = std::fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::copy(src, dst).map(|_| ())
}
