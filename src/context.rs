/// Per-session settings that operations take explicitly instead of reading
/// process-wide state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Language id of the text banks to expose. `None` exposes every language.
    pub language: Option<u32>,
    /// Verbose diagnostics requested by the caller.
    pub debug: bool,
}

impl SessionContext {
    pub const LANGUAGE_VAR: &'static str = "TOC_MODDER_LANGUAGE";
    pub const DEBUG_VAR: &'static str = "TOC_MODDER_DEBUG";

    pub fn with_language(language: u32) -> Self {
        Self {
            language: Some(language),
            ..Self::default()
        }
    }

    /// Reads `TOC_MODDER_LANGUAGE` (decimal or `0x`-prefixed hex) and
    /// `TOC_MODDER_DEBUG=1`.
    pub fn from_env() -> Self {
        let language = std::env::var(Self::LANGUAGE_VAR)
            .ok()
            .and_then(|v| parse_id(&v));
        let debug = std::env::var(Self::DEBUG_VAR).map(|v| v == "1").unwrap_or(false);
        Self { language, debug }
    }

    /// Whether a text bank in `language` is visible in this session.
    pub fn exposes(&self, language: u32) -> bool {
        self.language.map_or(true, |l| l == language)
    }
}

/// Decimal or `0x`-prefixed hexadecimal.
pub fn parse_id(value: &str) -> Option<u32> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
