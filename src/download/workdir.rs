//! Per-user working directories and self-removing local files
//!
//! Every file the pipeline writes lives under `<root>/<user_id>/` and is owned
//! by a guard that deletes it when dropped, so success, oversize and error
//! paths all end with the directory as clean as it started.

use std::io;
use std::path::{Path, PathBuf};

use crate::core::config;
use crate::core::utils::sanitize_display_name;

/// Fallback stem when neither the display name nor the URL gives a usable one
pub const DEFAULT_TRACK_STEM: &str = "track";

/// Longest stem in bytes; leaves room for a `-N` suffix and the extension
/// under the common 255-byte file name limit
pub const MAX_STEM_BYTES: usize = 180;

/// Root of the per-user working directories.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Working directory root from `TEMP_ROOT` (with `~` expansion)
    pub fn from_config() -> Self {
        Self::new(shellexpand::tilde(config::TEMP_ROOT.as_str()).to_string())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the user's directory (not created)
    pub fn user_dir(&self, user_id: i64) -> PathBuf {
        self.root.join(user_id.to_string())
    }

    /// Creates `<root>/<user_id>` if absent and returns it.
    ///
    /// Existing content is left untouched.
    pub async fn ensure_user_dir(&self, user_id: i64) -> io::Result<PathBuf> {
        let dir = self.user_dir(user_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}

/// Removes the file at `path` when dropped unless [`ScopedFile::keep`] was called.
#[derive(Debug)]
pub struct ScopedFile {
    path: Option<PathBuf>,
}

impl ScopedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Disarms the guard and hands the path back to the caller
    pub fn keep(mut self) -> PathBuf {
        self.path.take().unwrap_or_default()
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("🗑️ Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("⚠️ Failed to remove {}: {}", path.display(), e),
        }
    }
}

/// A directory removed together with its content when dropped.
#[derive(Debug)]
pub struct ScopedDir {
    path: PathBuf,
}

impl ScopedDir {
    /// Creates `<parent>/<prefix><uuid>`.
    pub async fn create(parent: &Path, prefix: &str) -> io::Result<Self> {
        let path = parent.join(format!("{}{}", prefix, uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => log::debug!("🗑️ Removed {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("⚠️ Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// A local audio file owned by one pipeline run.
///
/// Dropping it deletes the file.
#[derive(Debug)]
pub struct LocalAudioFile {
    file: ScopedFile,
    size: u64,
}

impl LocalAudioFile {
    /// Takes ownership of an existing file.
    ///
    /// If the file cannot be inspected it is removed and the error returned.
    pub async fn adopt(path: impl Into<PathBuf>) -> io::Result<Self> {
        let file = ScopedFile::new(path);
        let meta = tokio::fs::metadata(file.path()).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", file.path().display()),
            ));
        }
        Ok(Self { file, size: meta.len() })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// File name without extension, used as the default audio title
    pub fn stem(&self) -> String {
        self.path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn exceeds(&self, limit: u64) -> bool {
        self.size > limit
    }
}

/// Picks the file stem for a fetched track.
///
/// Sanitized display name first, then the sanitized last URL path segment
/// (without extension), then [`DEFAULT_TRACK_STEM`]. The result is cut to
/// [`MAX_STEM_BYTES`] on a char boundary.
pub fn track_file_stem(display_name: &str, resource_url: &str) -> String {
    let from_name = truncate_stem(&sanitize_display_name(display_name));
    if !from_name.is_empty() {
        return from_name;
    }

    let from_url = url::Url::parse(resource_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::decode(&s).map(|d| d.into_owned()).unwrap_or(s))
        .map(|s| match s.rfind('.') {
            Some(pos) if pos > 0 => s[..pos].to_string(),
            _ => s,
        })
        .map(|s| truncate_stem(&sanitize_display_name(&s)))
        .unwrap_or_default();

    if from_url.is_empty() {
        DEFAULT_TRACK_STEM.to_string()
    } else {
        from_url
    }
}

fn truncate_stem(stem: &str) -> String {
    if stem.len() <= MAX_STEM_BYTES {
        return stem.to_string();
    }
    let mut end = MAX_STEM_BYTES;
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    stem[..end].trim().to_string()
}

/// Atomically creates a new empty file `<dir>/<stem>.<ext>`.
///
/// If the name is taken, tries `<stem>-2.<ext>`, `<stem>-3.<ext>`, … The
/// returned guard removes the file unless kept.
pub async fn create_unique_file(dir: &Path, stem: &str, ext: &str) -> io::Result<(ScopedFile, tokio::fs::File)> {
    tokio::fs::create_dir_all(dir).await?;

    let mut attempt: u32 = 1;
    loop {
        let name = if attempt == 1 {
            format!("{}.{}", stem, ext)
        } else {
            format!("{}-{}.{}", stem, attempt, ext)
        };
        let candidate = dir.join(name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((ScopedFile::new(candidate), file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_user_dir_creates_and_reuses() {
        let root = TempDir::new().unwrap();
        let workdir = WorkDir::new(root.path().join("temp"));

        let dir = workdir.ensure_user_dir(42).await.unwrap();
        assert_eq!(dir, root.path().join("temp").join("42"));
        assert!(dir.is_dir());

        std::fs::write(dir.join("keep.txt"), b"x").unwrap();
        let again = workdir.ensure_user_dir(42).await.unwrap();
        assert_eq!(again, dir);
        assert!(dir.join("keep.txt").exists());
    }

    #[test]
    fn test_scoped_file_removes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"data").unwrap();

        drop(ScopedFile::new(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_scoped_file_keep_disarms() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"data").unwrap();

        let kept = ScopedFile::new(&path).keep();
        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[test]
    fn test_scoped_file_missing_is_fine() {
        let dir = TempDir::new().unwrap();
        drop(ScopedFile::new(dir.path().join("never-created.mp3")));
    }

    #[tokio::test]
    async fn test_local_audio_file_adopt_and_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Artist - Song.mp3");
        std::fs::write(&path, vec![0u8; 1234]).unwrap();

        let audio = LocalAudioFile::adopt(&path).await.unwrap();
        assert_eq!(audio.size(), 1234);
        assert_eq!(audio.stem(), "Artist - Song");
        assert!(audio.exceeds(1000));
        assert!(!audio.exceeds(1234));

        drop(audio);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_local_audio_file_adopt_missing() {
        let dir = TempDir::new().unwrap();
        assert!(LocalAudioFile::adopt(dir.path().join("nope.mp3")).await.is_err());
    }

    #[test]
    fn test_track_file_stem_fallbacks() {
        assert_eq!(track_file_stem("AC/DC - T.N.T.", "https://x.test/a.mp3"), "ACDC - TNT");
        assert_eq!(track_file_stem("", "https://x.test/music/My%20Song.mp3"), "My Song");
        assert_eq!(track_file_stem("???", "https://x.test/"), DEFAULT_TRACK_STEM);
        assert_eq!(track_file_stem("", "not a url"), DEFAULT_TRACK_STEM);
    }

    #[test]
    fn test_track_file_stem_long_name_is_capped() {
        // 2-byte Cyrillic chars: 180 is a boundary, 181 is not
        let name = "Я".repeat(150);
        let stem = track_file_stem(&name, "https://x.test/a.mp3");
        assert_eq!(stem.len(), MAX_STEM_BYTES);
        assert!(stem.chars().all(|c| c == 'Я'));

        let name = format!("a{}", "Я".repeat(150));
        let stem = track_file_stem(&name, "https://x.test/a.mp3");
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert_eq!(stem.len(), MAX_STEM_BYTES - 1);

        let long_url = format!("https://x.test/{}.mp3", "b".repeat(400));
        assert_eq!(track_file_stem("", &long_url).len(), MAX_STEM_BYTES);
    }

    #[tokio::test]
    async fn test_scoped_dir_removes_content_on_drop() {
        let root = TempDir::new().unwrap();
        let scoped = ScopedDir::create(root.path(), ".run-").await.unwrap();
        let path = scoped.path().to_path_buf();
        assert!(path.starts_with(root.path()));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(".run-"));
        std::fs::write(path.join("Song.webm.part"), b"partial").unwrap();

        drop(scoped);
        assert!(!path.exists());
        assert!(root.path().exists());
    }

    #[tokio::test]
    async fn test_create_unique_file_suffixes() {
        let dir = TempDir::new().unwrap();

        let (first, _f1) = create_unique_file(dir.path(), "Song", "mp3").await.unwrap();
        let (second, _f2) = create_unique_file(dir.path(), "Song", "mp3").await.unwrap();
        let (third, _f3) = create_unique_file(dir.path(), "Song", "mp3").await.unwrap();

        assert_eq!(first.path(), dir.path().join("Song.mp3"));
        assert_eq!(second.path(), dir.path().join("Song-2.mp3"));
        assert_eq!(third.path(), dir.path().join("Song-3.mp3"));

        drop((first, second, third));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
