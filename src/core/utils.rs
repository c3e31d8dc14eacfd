/// Очищает отображаемое имя трека для использования в имени файла.
///
/// Оставляет только буквы и цифры (включая кириллицу), пробелы, `_` и `-`,
/// затем обрезает пробелы по краям. Повторное применение ничего не меняет.
///
/// # Arguments
///
/// * `name` - Отображаемое имя, обычно "Artist - Title"
///
/// # Returns
///
/// Безопасное имя без расширения. Может быть пустым.
///
/// # Example
///
/// ```
/// use trackdrop::core::utils::sanitize_display_name;
///
/// assert_eq!(sanitize_display_name("AC/DC - T.N.T."), "ACDC - TNT");
/// assert_eq!(sanitize_display_name("Кино - Звезда по имени Солнце"), "Кино - Звезда по имени Солнце");
/// ```
pub fn sanitize_display_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Склеивает исполнителя и название в "Artist - Title".
///
/// Пустые части пропускаются, чтобы не получить висячий дефис.
///
/// # Example
///
/// ```
/// use trackdrop::core::utils::format_display_name;
///
/// assert_eq!(format_display_name("Linkin Park", "Numb"), "Linkin Park - Numb");
/// assert_eq!(format_display_name("", "Numb"), "Numb");
/// ```
pub fn format_display_name(artist: &str, title: &str) -> String {
    let artist = artist.trim();
    let title = title.trim();
    match (artist.is_empty(), title.is_empty()) {
        (false, false) => format!("{} - {}", artist, title),
        (false, true) => artist.to_string(),
        (true, false) => title.to_string(),
        (true, true) => String::new(),
    }
}

/// Размер в мегабайтах с двумя знаками после запятой (без единиц).
///
/// ```
/// use trackdrop::core::utils::format_megabytes;
///
/// assert_eq!(format_megabytes(20 * 1024 * 1024), "20.00");
/// ```
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_display_name() {
        // Разделители путей и точки
        assert_eq!(sanitize_display_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_display_name("Artist - Song (Live).mp3"), "Artist - Song Livemp3");

        // Разрешённые символы остаются
        assert_eq!(sanitize_display_name("my_track-01"), "my_track-01");

        // Пробелы по краям
        assert_eq!(sanitize_display_name("  ?Song?  "), "Song");

        // Пустое имя
        assert_eq!(sanitize_display_name(""), "");
        assert_eq!(sanitize_display_name("!!!"), "");
    }

    #[test]
    fn test_sanitize_display_name_is_idempotent() {
        let samples = [
            "Linkin Park - In the End",
            "  AC/DC: Highway to Hell!  ",
            "Мумий Тролль - Владивосток 2000",
            "feat. [Remix] * ? < > |",
            "   ",
        ];
        for sample in samples {
            let once = sanitize_display_name(sample);
            assert_eq!(sanitize_display_name(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_sanitized_charset() {
        let name = sanitize_display_name("a/b\\c:d*e?f\"g<h>i|j.k\u{0}l");
        assert!(name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-')));
        assert_eq!(name, "abcdefghijkl");
    }

    #[test]
    fn test_format_display_name() {
        assert_eq!(format_display_name(" A ", " T "), "A - T");
        assert_eq!(format_display_name("A", ""), "A");
        assert_eq!(format_display_name("", ""), "");
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(0), "0.00");
        assert_eq!(format_megabytes(1536 * 1024), "1.50");
    }
}
