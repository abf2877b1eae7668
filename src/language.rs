//! Fixed table of supported transcription languages.

/// A supported language: whisper language code, display name, and the short
/// badge shown in the tray icon / window header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Whisper language code (e.g. "ko", "en")
    pub code: &'static str,
    /// Human-readable name shown in menus
    pub display_name: &'static str,
    /// Two-letter badge shown next to the status indicator
    pub badge: &'static str,
}

/// Supported languages, in menu and cycle order.
pub const LANGUAGES: &[Language] = &[
    Language {
        code: "ko",
        display_name: "한국어",
        badge: "KR",
    },
    Language {
        code: "en",
        display_name: "English",
        badge: "EN",
    },
    Language {
        code: "ja",
        display_name: "日本語",
        badge: "JP",
    },
    Language {
        code: "zh",
        display_name: "中文",
        badge: "CH",
    },
    Language {
        code: "vi",
        display_name: "Tiếng Việt",
        badge: "VN",
    },
];

/// Look up the table index for a language code.
#[must_use]
pub fn index_of(code: &str) -> Option<usize> {
    LANGUAGES.iter().position(|lang| lang.code == code)
}

/// Language at `index`, wrapping modulo the table length.
#[must_use]
pub fn at(index: usize) -> &'static Language {
    &LANGUAGES[index % LANGUAGES.len()]
}
