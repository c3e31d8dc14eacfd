use thiserror::Error;

/// Failures of the external tools behind audio acquisition.
///
/// `subcategory()` goes into logs; `message()` is the raw tool output and may
/// be shown to the user (first line only).
#[derive(Debug, Error)]
pub enum DownloadError {
    /// yt-dlp exited non-zero or could not be started
    #[error("{0}")]
    YtDlp(String),
    /// The tool succeeded but its output file is not where it said
    #[error("{0}")]
    MissingOutput(String),
    #[error("{0}")]
    Timeout(String),
    /// Spawning, polling or joining a child process failed
    #[error("{0}")]
    Process(String),
}

impl DownloadError {
    /// yt-dlp failure from its stderr; the `ERROR:` line is preferred when present
    pub fn from_ytdlp_stderr(stderr: &str) -> Self {
        let line = stderr
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("ERROR:"))
            .or_else(|| stderr.lines().map(str::trim).find(|l| !l.is_empty()))
            .unwrap_or("yt-dlp failed without output");
        DownloadError::YtDlp(line.to_string())
    }

    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::YtDlp(_) => "ytdlp",
            DownloadError::MissingOutput(_) => "missing_output",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::Process(_) => "process",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DownloadError::YtDlp(msg)
            | DownloadError::MissingOutput(msg)
            | DownloadError::Timeout(msg)
            | DownloadError::Process(msg) => msg,
        }
    }
}
