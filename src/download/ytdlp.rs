use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::process::{probe_version, wait_with_output_timeout};
use crate::download::error::DownloadError;
use crate::download::workdir::{create_unique_file, LocalAudioFile, ScopedDir, DEFAULT_TRACK_STEM};

/// Hosts handled by the external extraction tool (subdomains included)
pub const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be"];

/// Проверяет, ведёт ли ссылка на видеохостинг.
///
/// Совпадение по хосту или его поддомену (`www.`, `m.`, `music.`),
/// а не по подстроке, так что `notyoutube.com` сюда не попадает.
///
/// # Example
///
/// ```
/// use trackdrop::download::ytdlp::is_video_hosting_url;
///
/// assert!(is_video_hosting_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
/// assert!(is_video_hosting_url("https://youtu.be/dQw4w9WgXcQ"));
/// assert!(!is_video_hosting_url("https://example.com/youtube.com"));
/// ```
pub fn is_video_hosting_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    VIDEO_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
}

/// Produces a local audio file from a video-hosting URL.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download_audio(&self, source_url: &str, dest_dir: &Path) -> Result<LocalAudioFile, AppError>;
}

/// yt-dlp wrapper: best audio, converted to mp3 by yt-dlp's ffmpeg postprocessor
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    ytdl_bin: String,
    timeout: Duration,
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpDownloader {
    pub fn new() -> Self {
        Self {
            ytdl_bin: config::YTDL_BIN.clone(),
            timeout: config::tools::ytdlp_timeout(),
        }
    }

    pub fn with_binary(mut self, bin: impl Into<String>) -> Self {
        self.ytdl_bin = bin.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Arguments for a single-video audio download into `dest_dir`
pub fn build_ytdlp_args(source_url: &str, dest_dir: &Path) -> Vec<String> {
    let output_template = dest_dir.join("%(title)s.%(ext)s");
    vec![
        "--format".to_string(),
        "bestaudio/best".to_string(),
        "-o".to_string(),
        output_template.to_string_lossy().into_owned(),
        "--extract-audio".to_string(),
        "--audio-format".to_string(),
        config::audio::EXTENSION.to_string(),
        "--audio-quality".to_string(),
        config::audio::YTDLP_QUALITY.to_string(),
        "--no-playlist".to_string(),
        "--no-progress".to_string(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
        source_url.to_string(),
    ]
}

/// Prefix of the per-run directory yt-dlp writes into
pub const STAGING_DIR_PREFIX: &str = ".ytdlp-";

/// Final file path reported by `--print after_move:filepath`.
///
/// Picks the last non-empty stdout line and forces the `.mp3` extension.
pub fn reported_audio_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .map(|l| Path::new(l).with_extension(config::audio::EXTENSION))
}

fn spawn_ytdlp(bin: &str, args: &[String], timeout: Duration) -> Result<PathBuf, DownloadError> {
    let child = Command::new(bin)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DownloadError::YtDlp(format!("Failed to spawn {}: {}", bin, e)))?;

    let output = wait_with_output_timeout(child, timeout)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::error!("yt-dlp exited with {}: {}", output.status, stderr.trim());
        return Err(DownloadError::from_ytdlp_stderr(&stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let path = reported_audio_path(&stdout)
        .ok_or_else(|| DownloadError::MissingOutput("yt-dlp did not report an output file".to_string()))?;

    if !path.is_file() {
        return Err(DownloadError::MissingOutput(format!(
            "yt-dlp output is missing: {}",
            path.display()
        )));
    }
    Ok(path)
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download_audio(&self, source_url: &str, dest_dir: &Path) -> Result<LocalAudioFile, AppError> {
        // yt-dlp leftovers (.part, pre-conversion files) stay inside this run's
        // directory and go away with it
        let staging = ScopedDir::create(dest_dir, STAGING_DIR_PREFIX).await?;

        let args = build_ytdlp_args(source_url, staging.path());
        log::info!("📥 yt-dlp audio download: {}", source_url);
        log::debug!("yt-dlp command: {} {}", self.ytdl_bin, args.join(" "));

        let bin = self.ytdl_bin.clone();
        let timeout = self.timeout;
        let staged = tokio::task::spawn_blocking(move || spawn_ytdlp(&bin, &args, timeout))
            .await
            .map_err(|e| DownloadError::Process(format!("yt-dlp task failed: {}", e)))??;

        if !staged.starts_with(staging.path()) {
            return Err(DownloadError::MissingOutput(format!(
                "yt-dlp reported a file outside its directory: {}",
                staged.display()
            ))
            .into());
        }

        let stem = staged
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TRACK_STEM.to_string());
        let (reserved, file) = create_unique_file(dest_dir, &stem, config::audio::EXTENSION).await?;
        drop(file);
        tokio::fs::rename(&staged, reserved.path()).await?;

        let audio = LocalAudioFile::adopt(reserved.keep()).await?;
        drop(staging);
        log::info!(
            "✅ yt-dlp produced {} ({:.2} MB)",
            audio.path().display(),
            audio.size() as f64 / (1024.0 * 1024.0)
        );
        Ok(audio)
    }
}

/// First line of `yt-dlp --version`
pub async fn ytdlp_version() -> Option<String> {
    probe_version(
        config::YTDL_BIN.as_str(),
        "--version",
        config::tools::version_probe_timeout(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_video_hosting_url() {
        assert!(is_video_hosting_url("https://youtube.com/watch?v=abc"));
        assert!(is_video_hosting_url("https://m.youtube.com/watch?v=abc"));
        assert!(is_video_hosting_url("https://music.youtube.com/watch?v=abc"));
        assert!(is_video_hosting_url("http://YOUTU.BE/abc"));

        assert!(!is_video_hosting_url("https://notyoutube.com/watch?v=abc"));
        assert!(!is_video_hosting_url("https://example.com/?u=youtube.com"));
        assert!(!is_video_hosting_url("youtube.com/watch?v=abc"));
        assert!(!is_video_hosting_url("ftp://youtube.com/a"));
    }

    #[test]
    fn test_build_ytdlp_args() {
        let args = build_ytdlp_args("https://youtu.be/abc", Path::new("/data/temp/7"));
        assert_eq!(args[0..2], ["--format", "bestaudio/best"]);
        assert_eq!(args[2..4], ["-o", "/data/temp/7/%(title)s.%(ext)s"]);
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "192K"]));
        assert!(args.windows(2).any(|w| w == ["--print", "after_move:filepath"]));
        assert!(args.contains(&"--extract-audio".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[test]
    fn test_reported_audio_path_normalizes_extension() {
        assert_eq!(
            reported_audio_path("/t/1/Song.webm\n"),
            Some(PathBuf::from("/t/1/Song.mp3"))
        );
        assert_eq!(
            reported_audio_path("[info] noise\n/t/1/Song.m4a\n\n"),
            Some(PathBuf::from("/t/1/Song.mp3"))
        );
        assert_eq!(reported_audio_path("/t/1/Song.mp3"), Some(PathBuf::from("/t/1/Song.mp3")));
        assert_eq!(reported_audio_path("  \n"), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_download_error() {
        let dir = TempDir::new().unwrap();
        let downloader = YtDlpDownloader::new().with_binary("/nonexistent/yt-dlp-binary-12345");

        let result = downloader.download_audio("https://youtu.be/abc", dir.path()).await;

        assert!(matches!(result, Err(AppError::Download(DownloadError::YtDlp(_)))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    /// Shell stand-in for yt-dlp: writes a partial and a final file into the
    /// `-o` directory, waits, then prints the final path
    #[cfg(unix)]
    fn fake_ytdlp(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-yt-dlp");
        std::fs::write(
            &script,
            r#"#!/bin/sh
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
dir=$(dirname "$out")
printf partial > "$dir/Song.webm.part"
sleep 1
printf audio > "$dir/Song.mp3"
echo "$dir/Song.mp3"
"#,
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_keeps_other_files_in_user_dir() {
        let tools = TempDir::new().unwrap();
        let user_dir = TempDir::new().unwrap();
        let downloader = YtDlpDownloader::new().with_binary(fake_ytdlp(tools.path()).to_string_lossy().into_owned());

        std::fs::write(user_dir.path().join("Song.mp3"), b"earlier").unwrap();
        let other = user_dir.path().join("Other Track.mp3");
        let write_other = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            tokio::fs::write(&other, b"other request").await.unwrap();
        };

        let (result, ()) = tokio::join!(
            downloader.download_audio("https://youtu.be/abc", user_dir.path()),
            write_other
        );
        let audio = result.unwrap();

        assert_eq!(audio.path(), user_dir.path().join("Song-2.mp3"));
        assert_eq!(std::fs::read(audio.path()).unwrap(), b"audio");
        assert_eq!(std::fs::read(&other).unwrap(), b"other request");
        assert_eq!(std::fs::read(user_dir.path().join("Song.mp3")).unwrap(), b"earlier");

        let staging_left = std::fs::read_dir(user_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with(STAGING_DIR_PREFIX));
        assert!(!staging_left);

        drop(audio);
        assert_eq!(std::fs::read_dir(user_dir.path()).unwrap().count(), 2);
    }
}
