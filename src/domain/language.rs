/// (ISO 639-1 code, catalog code, English name) for every language the catalog serves.
static LANGUAGES: &[(&str, &str, &str)] = &[
    ("sq", "alb", "Albanian"),
    ("ar", "ara", "Arabic"),
    ("hy", "arm", "Armenian"),
    ("ay", "ass", "Neo-Aramaic, Assyrian"),
    ("eu", "eus", "Basque"),
    ("bs", "bos", "Bosnian"),
    ("pb", "pob", "Brazilian Portuguese"),
    ("bg", "bul", "Bulgarian"),
    ("ca", "cat", "Catalan"),
    ("zh", "chi", "Chinese"),
    ("hr", "hrv", "Croatian"),
    ("cs", "cze", "Czech"),
    ("da", "dan", "Danish"),
    ("nl", "dut", "Dutch"),
    ("en", "eng", "English"),
    ("eo", "epo", "Esperanto"),
    ("et", "est", "Estonian"),
    ("fi", "fin", "Finnish"),
    ("fr", "fre", "French"),
    ("gl", "glg", "Galician"),
    ("ka", "geo", "Georgian"),
    ("de", "ger", "German"),
    ("el", "ell", "Greek"),
    ("he", "heb", "Hebrew"),
    ("hi", "hin", "Hindi"),
    ("hu", "hun", "Hungarian"),
    ("is", "ice", "Icelandic"),
    ("id", "ind", "Indonesian"),
    ("it", "ita", "Italian"),
    ("ja", "jpn", "Japanese"),
    ("kk", "kaz", "Kazakh"),
    ("ko", "kor", "Korean"),
    ("lv", "lav", "Latvian"),
    ("lt", "lit", "Lithuanian"),
    ("lb", "ltz", "Luxembourgish"),
    ("mk", "mac", "Macedonian"),
    ("ms", "may", "Malay"),
    ("no", "nor", "Norwegian"),
    ("oc", "oci", "Occitan"),
    ("fa", "per", "Persian"),
    ("pl", "pol", "Polish"),
    ("pt", "por", "Portuguese"),
    ("ro", "rum", "Romanian"),
    ("ru", "rus", "Russian"),
    ("sr", "scc", "Serbian"),
    ("sk", "slo", "Slovak"),
    ("sl", "slv", "Slovenian"),
    ("es", "spa", "Spanish"),
    ("sv", "swe", "Swedish"),
    ("th", "tha", "Thai"),
    ("tr", "tur", "Turkish"),
    ("uk", "ukr", "Ukrainian"),
    ("vi", "vie", "Vietnamese"),
];

/// Map a 2-letter code, 3-letter catalog code or English name to the catalog code.
pub fn normalize_language(language: &str) -> Option<&'static str> {
    let needle = language.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(two, three, name)| {
            *two == needle || *three == needle || name.to_lowercase() == needle
        })
        .map(|(_, three, _)| *three)
}

/// Normalize a preference list, dropping unknown entries and repeats.
pub fn normalize_languages<S: AsRef<str>>(languages: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for language in languages {
        match normalize_language(language.as_ref()) {
            Some(code) if !normalized.iter().any(|c| c == code) => normalized.push(code.into()),
            Some(_) => {}
            None => tracing::warn!("Ignoring unknown language {:?}", language.as_ref()),
        }
    }
    normalized
}

pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, three, _)| *three == code)
        .map(|(_, _, name)| *name)
}
