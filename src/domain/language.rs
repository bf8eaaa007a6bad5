// (ISO 639-2/T, ISO 639-2/B, ISO 639-1, English name)
const LANGUAGES: &[(&str, &str, &str, &str)] = &[
    ("ara", "ara", "ar", "Arabic"),
    ("bul", "bul", "bg", "Bulgarian"),
    ("cat", "cat", "ca", "Catalan"),
    ("ces", "cze", "cs", "Czech"),
    ("dan", "dan", "da", "Danish"),
    ("deu", "ger", "de", "German"),
    ("ell", "gre", "el", "Greek"),
    ("eng", "eng", "en", "English"),
    ("eus", "baq", "eu", "Basque"),
    ("fas", "per", "fa", "Persian"),
    ("fin", "fin", "fi", "Finnish"),
    ("fra", "fre", "fr", "French"),
    ("glg", "glg", "gl", "Galician"),
    ("heb", "heb", "he", "Hebrew"),
    ("hin", "hin", "hi", "Hindi"),
    ("hrv", "hrv", "hr", "Croatian"),
    ("hun", "hun", "hu", "Hungarian"),
    ("ind", "ind", "id", "Indonesian"),
    ("ita", "ita", "it", "Italian"),
    ("jpn", "jpn", "ja", "Japanese"),
    ("kor", "kor", "ko", "Korean"),
    ("nld", "dut", "nl", "Dutch"),
    ("nor", "nor", "no", "Norwegian"),
    ("pol", "pol", "pl", "Polish"),
    ("por", "por", "pt", "Portuguese"),
    ("ron", "rum", "ro", "Romanian"),
    ("rus", "rus", "ru", "Russian"),
    ("slk", "slo", "sk", "Slovak"),
    ("slv", "slv", "sl", "Slovenian"),
    ("spa", "spa", "es", "Spanish"),
    ("srp", "srp", "sr", "Serbian"),
    ("swe", "swe", "sv", "Swedish"),
    ("tha", "tha", "th", "Thai"),
    ("tur", "tur", "tr", "Turkish"),
    ("ukr", "ukr", "uk", "Ukrainian"),
    ("vie", "vie", "vi", "Vietnamese"),
    ("zho", "chi", "zh", "Chinese"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    alpha3: &'static str,
    alpha3b: &'static str,
    alpha2: &'static str,
    name: &'static str,
}

impl Language {
    fn from_row(row: &(&'static str, &'static str, &'static str, &'static str)) -> Self {
        Self {
            alpha3: row.0,
            alpha3b: row.1,
            alpha2: row.2,
            name: row.3,
        }
    }

    /// Accepts a 639-2 (either variant) or 639-1 code.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_lowercase();
        LANGUAGES
            .iter()
            .find(|(t, b, a2, _)| *t == code || *b == code || *a2 == code)
            .map(Self::from_row)
    }

    pub fn from_alpha3b(code: &str) -> Option<Self> {
        let code = code.trim().to_lowercase();
        LANGUAGES
            .iter()
            .find(|(_, b, _, _)| *b == code)
            .map(Self::from_row)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        LANGUAGES
            .iter()
            .find(|(_, _, _, n)| n.eq_ignore_ascii_case(name))
            .map(Self::from_row)
    }

    pub fn alpha3(&self) -> &'static str {
        self.alpha3
    }

    /// Tag used in subtitle file names.
    pub fn tag(&self) -> &'static str {
        if self.alpha2.is_empty() {
            self.alpha3
        } else {
            self.alpha2
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_any_code() {
        let spanish = Language::from_code("spa").unwrap();
        assert_eq!(spanish.tag(), "es");
        assert_eq!(Language::from_code("es"), Some(spanish));
        assert_eq!(Language::from_code("SPA"), Some(spanish));
        assert_eq!(Language::from_code("xx"), None);
    }

    #[test]
    fn test_bibliographic_codes() {
        assert_eq!(Language::from_alpha3b("ger").unwrap().alpha3(), "deu");
        // Terminologic-only codes are not bibliographic codes
        assert_eq!(Language::from_alpha3b("deu"), None);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Language::from_name("spanish").unwrap().alpha3(), "spa");
        assert_eq!(Language::from_name("Klingon"), None);
    }
}
