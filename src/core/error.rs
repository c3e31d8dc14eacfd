use thiserror::Error;

use crate::conversion::ConversionError;
use crate::core::utils::format_megabytes;
use crate::download::error::DownloadError;
use crate::recognition::RecognitionError;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Every variant is caught at the request boundary and turned into a single reply
/// via [`AppError::user_message`].
///
/// # Example
///
/// ```no_run
/// use trackdrop::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Network/transport failures (page fetch, track fetch)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// External download/transcode tool errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Video to audio extraction errors
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// File too large for the messaging transport
    #[error("File too large: {size} bytes > {limit} bytes")]
    SizeLimitExceeded { size: u64, limit: u64 },

    /// Fingerprinting service errors (unreachable, malformed response)
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Telegram file download errors
    #[error("Telegram download error: {0}")]
    TelegramDownload(#[from] teloxide::DownloadError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Short category name for logs
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Http(_) | AppError::HttpStatus(_) => "transport",
            AppError::Download(e) => e.subcategory(),
            AppError::Conversion(_) => "ffmpeg",
            AppError::SizeLimitExceeded { .. } => "size_limit",
            AppError::Recognition(_) => "recognition",
            AppError::Telegram(_) | AppError::TelegramDownload(_) => "telegram",
            AppError::Io(_) => "io",
            AppError::Url(_) | AppError::Validation(_) => "validation",
        }
    }

    /// Human-readable reply for the requester.
    ///
    /// Never includes local paths or credentials.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Http(e) if e.is_timeout() => "❌ Сервер не ответил вовремя. Попробуй позже.".to_string(),
            AppError::Http(_) => "❌ Ошибка сети при загрузке. Проверь ссылку и попробуй ещё раз.".to_string(),
            AppError::HttpStatus(status) => format!("❌ Сервер вернул ошибку: {}", status),
            AppError::Download(DownloadError::Timeout(_)) => "❌ Загрузка заняла слишком много времени.".to_string(),
            AppError::Download(e) => format!("❌ Не удалось скачать аудио: {}", first_line(e.message())),
            AppError::Conversion(_) => "❌ Ошибка при извлечении аудио из видео.".to_string(),
            AppError::SizeLimitExceeded { size, .. } => format!(
                "❌ Файл слишком большой для отправки через Telegram ({} МБ).",
                format_megabytes(*size)
            ),
            AppError::Recognition(RecognitionError::Unavailable(_)) => {
                "⚠️ Сервис распознавания недоступен.".to_string()
            }
            AppError::Recognition(_) => "⚠️ Сервис распознавания вернул непонятный ответ.".to_string(),
            AppError::Telegram(_) | AppError::TelegramDownload(_) => "❌ Ошибка Telegram. Попробуй ещё раз.".to_string(),
            AppError::Io(_) => "❌ Ошибка при работе с файлом.".to_string(),
            AppError::Url(_) | AppError::Validation(_) => "❌ Некорректная ссылка.".to_string(),
        }
    }
}

fn first_line(msg: &str) -> &str {
    msg.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("неизвестная ошибка")
}
