use serde::{Deserialize, Serialize};

/// Immutable settings handed to the decoration and trigger components.
///
/// Everything the live preview would otherwise read from ambient UI state
/// (theme flags, local storage toggles) lives here and is passed in
/// explicitly. Every field has a default so a partial `[preview]` table in
/// the config file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Master switch: when off, nothing is hidden or replaced and only
    /// marks and line attributes are produced.
    pub live_preview: bool,
    /// Treat `_text_` as underline rather than italic.
    pub underscore_underline: bool,
    /// Decorate `==highlight==` spans.
    pub highlight: bool,
    /// Render `$...$` and `$$...$$` as equations.
    pub math: bool,
    /// Mark `#tags`.
    pub hashtags: bool,
    /// Mark bare `http(s)://` URLs as links.
    pub bare_urls: bool,
    /// Image reference inserted while an asset upload is still running.
    pub upload_placeholder: String,
    /// Length of generated stable block identifiers.
    pub block_id_length: usize,
    /// Directory (relative to the notes root) that holds saved assets.
    pub asset_dir: String,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            live_preview: true,
            underscore_underline: true,
            highlight: true,
            math: true,
            hashtags: true,
            bare_urls: true,
            upload_placeholder: "uploading...".to_string(),
            block_id_length: 6,
            asset_dir: "assets".to_string(),
        }
    }
}

impl PreviewSettings {
    /// Settings with live preview turned off (raw source view).
    pub fn source_mode() -> Self {
        Self {
            live_preview: false,
            ..Self::default()
        }
    }

    /// Block id length clamped to something usable.
    pub fn effective_block_id_length(&self) -> usize {
        self.block_id_length.clamp(4, 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_table_fills_defaults() {
        let settings: PreviewSettings = toml::from_str("math = false\n").unwrap();

        assert!(!settings.math);
        assert!(settings.live_preview);
        assert_eq!(settings.upload_placeholder, "uploading...");
    }

    #[test]
    fn block_id_length_is_clamped() {
        let mut settings = PreviewSettings {
            block_id_length: 1,
            ..PreviewSettings::default()
        };
        assert_eq!(settings.effective_block_id_length(), 4);

        settings.block_id_length = 64;
        assert_eq!(settings.effective_block_id_length(), 16);
    }

    #[test]
    fn source_mode_disables_live_preview_only() {
        let settings = PreviewSettings::source_mode();
        assert!(!settings.live_preview);
        assert!(settings.highlight);
    }
}
