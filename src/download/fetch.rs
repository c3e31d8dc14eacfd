use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::workdir::{create_unique_file, track_file_stem, LocalAudioFile};

/// HTTP side of the scrape path: page markup and direct track bodies.
///
/// Both requests go out with a browser User-Agent; the music pages refuse
/// anything else.
#[derive(Debug, Clone)]
pub struct TrackFetcher {
    client: Client,
}

impl TrackFetcher {
    /// Создаёт клиент с браузерным User-Agent и таймаутом на соединение.
    ///
    /// # Errors
    ///
    /// Возвращает `AppError::Http`, если reqwest не смог собрать клиент
    /// (например, не инициализировался TLS backend).
    pub fn new() -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config::network::BROWSER_USER_AGENT)
            .connect_timeout(config::network::connect_timeout())
            .build()?;
        Ok(Self { client })
    }

    /// Uses a preconfigured client (tests, custom proxies)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Загружает HTML-страницу.
    ///
    /// # Arguments
    ///
    /// * `url` - Адрес страницы со списком треков
    ///
    /// # Returns
    ///
    /// Текст страницы или ошибку:
    /// - `AppError::Http` - сетевая ошибка
    /// - `AppError::HttpStatus` - ответ не 2xx
    ///
    /// Если сервер вернул не HTML (например, сразу аудиофайл), тело не читается
    /// и возвращается пустая строка: на такой странице просто нет треков.
    pub async fn fetch_page(&self, url: &Url) -> AppResult<String> {
        log::info!("🌐 Fetching page: {}", url);

        let resp = self.client.get(url.clone()).send().await?;

        if !resp.status().is_success() {
            return Err(AppError::HttpStatus(resp.status()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase());
        if let Some(ct) = content_type {
            if !(ct.starts_with("text/") || ct.contains("html") || ct.contains("xml")) {
                // No markup to scrape; the body is not read
                log::warn!("⚠️ {} is not an HTML page ({}), treating as empty", url, ct);
                return Ok(String::new());
            }
        }

        Ok(resp.text().await?)
    }

    /// Скачивает трек потоком в `dest_dir/<имя>.mp3`.
    ///
    /// Имя берётся из `display_name` (после очистки), при пустом имени из URL,
    /// иначе `track`. Занятые имена получают суффикс `-2`, `-3`, …
    /// Тело ответа пишется на диск по частям и целиком в памяти не держится.
    ///
    /// # Errors
    ///
    /// Любая ошибка запроса, статуса или чтения потока. Частично записанный
    /// файл при этом удаляется.
    pub async fn fetch(&self, resource_url: &str, display_name: &str, dest_dir: &Path) -> AppResult<LocalAudioFile> {
        let url = Url::parse(resource_url)?;
        let stem = track_file_stem(display_name, resource_url);
        let (guard, mut file) = create_unique_file(dest_dir, &stem, config::audio::EXTENSION).await?;

        log::info!("📥 Downloading track {} -> {}", url, guard.path().display());

        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::HttpStatus(resp.status()));
        }

        let mut downloaded: u64 = 0;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        let audio = LocalAudioFile::adopt(guard.keep()).await?;
        log::info!(
            "✅ Track saved: {} ({:.2} MB, {} bytes streamed)",
            audio.path().display(),
            audio.size() as f64 / (1024.0 * 1024.0),
            downloaded
        );
        Ok(audio)
    }
}
