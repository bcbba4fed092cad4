//! Scene-style release name analysis.
//!
//! Every property category is a vocabulary of terms compiled once into a
//! single alternation, longest term first, so that `WEB-DLRip` wins over
//! `WEB-DL` and `WEB`. Separator characters inside a term are optional when
//! matching, which makes `Blu-Ray`, `Blu.Ray` and `BluRay` equivalent.
//! Matches must sit between separators (or the string edges); whatever is
//! left before the first match is the title, and whatever is left between
//! the last match and the container extension is the release group.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const SEPARATOR_CLASS: &str = r"[.\-_ \t\n\[\]]";

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '-' | '_' | ' ' | '\t' | '\n' | '[' | ']')
}

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("{SEPARATOR_CLASS}+")).unwrap());

static VIDEO_QUALITIES: &[&str] = &["480p", "720p", "1080p", "2160p", "4096p", "4K"];

static VIDEO_CONTAINERS: &[&str] = &[
    "avi", "mkv", "mp4", "mp3", "mpeg", "mpg", "mpg2", "mpeg2", "mpeg3", "mpg3", "ogv", "xvid",
    "divx", "mov", "movw", "wmv", "avchd", "webm",
];

/// Ends the group on subtitle names too, without being recorded as a property.
static SUBTITLE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(?:srt|sub|ass|ssa|smi|asc|txt|idx|vtt)$").unwrap()
});

static RELEASE_FORMATS: &[&str] = &[
    // cam / telesync / workprint / telecine
    "CAM-Rip", "CAM", "HDCAM", "TS", "HDTS", "TELESYNC", "PDVD", "PreDVDRip", "WP", "WORKPRINT",
    "TC", "HDTC", "TELECINE",
    // pay-per-view / screeners
    "PPVRip", "PPV", "SCR", "SCREENER", "DVDSCR", "DVDSCREENER", "BDSCR", "WEBSCREENER", "DDC",
    "R5", "R5.LINE", "R5.AC3.5.1.HQ",
    // dvd
    "DVDRip", "DVDMux", "DVDR", "DVD-Full", "Full-Rip", "ISO-rip", "lossless-rip",
    "untouched-rip", "DVD-5", "DVD-9",
    // broadcast
    "DSRip", "DSR", "SATRip", "DTHRip", "DVBRip", "HDTV", "PDTV", "DTVRip", "TVRip", "HDTVRip",
    "VODRip", "VODR", "HC", "HD-Rip",
    // web
    "WEB-Cap", "WEBCAP", "HDRip", "WEB-DLRip", "WEBRip", "WEB-Rip", "WEBDL", "WEB-DL", "WEB-MUX",
    "WEB",
    // blu-ray
    "Blu-Ray", "BluRay", "BDRip", "BRip", "BRRip", "BDR-The.2010.BDR.Releasing.Standards", "BD25",
    "BD50", "BD66", "BD100", "BD5", "BD9", "BDMV", "BDISO", "COMPLETE.BLURAY",
];

/// Broadcasters and streaming services.
static TV_TERMS: &[&str] = &[
    "ABC", "AUBC", "ATVP", "AMZN", "BBC", "BCORE", "BMS", "BOOM", "CBC", "CBS", "CC", "CRAV",
    "CRITERION", "CW", "DCU", "DSCP", "DSNP", "DSNY", "FBWatch", "FREE", "FOX", "GPLAY", "HMAX",
    "HULU", "HTSR", "HS", "iP", "iT", "JC", "LGP", "LIFE", "MA", "MMAX", "MTV", "MUBI", "NBC",
    "NF", "NICK", "OAR", "PCOK", "PMTP", "PF", "RED", "ROKU", "SAINA", "SP", "SHO", "SS", "STAN",
    "STZ", "TBS", "TK", "TVNZ", "ADN", "ANIMAX", "AO", "AT-X", "Baha", "B-Global", "Bstation",
    "BSP", "BS4", "BS6", "BS7", "BSJ", "BS-TX", "BS8", "BS-Fuji", "BS11", "BS12", "CR",
    "CS-Fuji ONE", "CX", "EX", "EX-BS", "BS-EX", "CS3", "EX-CS1", "CS-EX1", "CSA", "FOD", "FUNi",
    "HIDIVE", "KBC", "M-ON!", "MX", "NHKG", "NHKE", "NTV", "TSC", "TVA", "TVh", "TVK", "TVO",
    "TVQ", "TX", "U-NEXT", "WAKA", "WOWOW", "YTV",
];

static VIDEO_LABELS: &[&str] = &[
    "REMUX", "BDREMUX", "BDRIP", "HEVC", "H-264", "H-265", "x-264", "x-265", "MPEG-4", "MPEG-H",
    "MPEG", "AVC", "AV-1", "DivX", "Xvid", "HDR-10", "HDR", "UHD", "10-bit",
];

static AUDIO_LABELS: &[&str] = &[
    "DTS-HD", "DTS", "AAC", "AC-3", "Atmos", "DDP", "DDP-A", "MultiAudio",
];

const AUDIO_QUALITY: &str = r"[5-7](?:\.1|CH)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Year,
    SeasonEpisode,
    Season,
    Episode,
    AudioQuality,
    VideoQuality,
    VideoContainer,
    ReleaseFormat,
    TvTerm,
    VideoLabel,
    AudioLabel,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::SeasonEpisode => "season-episode",
            Self::Season => "season",
            Self::Episode => "episode",
            Self::AudioQuality => "audio-quality",
            Self::VideoQuality => "video-quality",
            Self::VideoContainer => "video-container",
            Self::ReleaseFormat => "release-format",
            Self::TvTerm => "tv-term",
            Self::VideoLabel => "video-label",
            Self::AudioLabel => "audio-label",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Separator (or string edge) on both sides.
    Separated,
    /// Separator (or end) after the match only; may start inside a token.
    Trailing,
    /// Dot-prefixed, at the very end of the name.
    Extension,
}

struct Matcher {
    category: Category,
    anchor: Anchor,
    regex: Regex,
}

struct Hit {
    category: Category,
    start: usize,
    end: usize,
    token: String,
}

impl Matcher {
    fn new(category: Category, anchor: Anchor, body: &str) -> Self {
        let pattern = match anchor {
            Anchor::Separated | Anchor::Trailing => {
                format!(r"(?i)^({body})(?:$|{SEPARATOR_CLASS})")
            }
            Anchor::Extension => format!(r"(?i)\.(?:{body})$"),
        };
        let regex = Regex::new(&pattern).unwrap();
        Self {
            category,
            anchor,
            regex,
        }
    }

    fn terms(category: Category, terms: &[&str]) -> Self {
        Self::new(category, Anchor::Separated, &alternation(terms))
    }

    fn scan(&self, name: &str, hits: &mut Vec<Hit>) {
        if self.anchor == Anchor::Extension {
            if let Some(m) = self.regex.find(name) {
                hits.push(self.hit(m.start(), m.end(), m.as_str()));
            }
            return;
        }

        let mut pos = 0;
        while pos < name.len() {
            let at_boundary =
                pos == 0 || name[..pos].chars().next_back().is_some_and(is_separator);
            if at_boundary || self.anchor == Anchor::Trailing {
                if let Some(caps) = self.regex.captures(&name[pos..]) {
                    let token = &caps[1];
                    let mut hit = self.hit(pos, pos + token.len(), token);
                    if self.category == Category::SeasonEpisode {
                        hit.token = hit.token.to_uppercase();
                        for (group, category) in [(2, Category::Season), (3, Category::Episode)] {
                            if let Some(digits) = caps.get(group) {
                                hits.push(Hit {
                                    category,
                                    start: hit.start,
                                    end: hit.end,
                                    token: digits.as_str().to_string(),
                                });
                            }
                        }
                    }
                    pos = hit.end;
                    hits.push(hit);
                    continue;
                }
            }
            pos += name[pos..].chars().next().map_or(1, char::len_utf8);
        }
    }

    fn hit(&self, start: usize, end: usize, token: &str) -> Hit {
        Hit {
            category: self.category,
            start,
            end,
            token: token.to_string(),
        }
    }
}

/// Longest-first alternation with optional separators inside each term.
fn alternation(terms: &[&str]) -> String {
    let mut unique: Vec<&str> = terms
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    unique.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let optional_separator = format!("{SEPARATOR_CLASS}*");
    unique
        .iter()
        .map(|term| {
            SEPARATOR_RUN
                .split(term)
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(&optional_separator)
        })
        .collect::<Vec<_>>()
        .join("|")
}

static MATCHERS: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    vec![
        Matcher::new(Category::Year, Anchor::Separated, r"19\d{2}|20\d{2}"),
        Matcher::new(
            Category::SeasonEpisode,
            Anchor::Separated,
            r"S(\d{2})(?:E(\d{2}))?",
        ),
        Matcher::new(Category::AudioQuality, Anchor::Trailing, AUDIO_QUALITY),
        Matcher::terms(Category::VideoQuality, VIDEO_QUALITIES),
        Matcher::new(
            Category::VideoContainer,
            Anchor::Extension,
            &alternation(VIDEO_CONTAINERS),
        ),
        Matcher::terms(Category::ReleaseFormat, RELEASE_FORMATS),
        Matcher::terms(Category::TvTerm, TV_TERMS),
        Matcher::terms(Category::VideoLabel, VIDEO_LABELS),
        // Audio labels are often glued to the channel layout, e.g. DDP5.1.
        Matcher::new(
            Category::AudioLabel,
            Anchor::Separated,
            &format!(
                "(?:{}){SEPARATOR_CLASS}*(?:{AUDIO_QUALITY})|(?:{})",
                alternation(AUDIO_LABELS),
                alternation(AUDIO_LABELS)
            ),
        ),
    ]
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilenameMetadata {
    pub title: String,
    pub group: String,
    pub search_term: String,
    pub properties: BTreeMap<Category, BTreeSet<String>>,
}

impl FilenameMetadata {
    pub fn get(&self, category: Category) -> Option<&BTreeSet<String>> {
        self.properties.get(&category)
    }

    pub fn values(&self, category: Category) -> impl Iterator<Item = &str> {
        self.get(category).into_iter().flatten().map(String::as_str)
    }
}

/// Split a release name into its recognised properties. Never fails.
pub fn parse(input: &str) -> FilenameMetadata {
    let name = input.rsplit(['/', '\\']).next().unwrap_or(input);

    let mut hits = Vec::new();
    for matcher in MATCHERS.iter() {
        matcher.scan(name, &mut hits);
    }

    let mut properties: BTreeMap<Category, BTreeSet<String>> = BTreeMap::new();
    let mut first_start = name.len();
    let mut last_end: Option<usize> = None;
    let mut container_start = SUBTITLE_EXTENSION
        .find(name)
        .map_or(name.len(), |m| m.start());

    for hit in hits {
        if hit.category == Category::VideoContainer {
            container_start = container_start.min(hit.start);
        } else {
            first_start = first_start.min(hit.start);
            last_end = Some(last_end.map_or(hit.end, |end| end.max(hit.end)));
        }
        properties.entry(hit.category).or_default().insert(hit.token);
    }

    let title = title_case(&normalize(&name[..first_start.min(container_start)]));
    let group = match last_end {
        Some(end) if end < container_start => normalize(&name[end..container_start]),
        _ => String::new(),
    };

    let mut search_term = vec![title.clone()];
    for category in [Category::SeasonEpisode, Category::Year] {
        search_term.extend(properties.get(&category).into_iter().flatten().cloned());
    }
    search_term.retain(|part| !part.is_empty());

    FilenameMetadata {
        title,
        group,
        search_term: search_term.join(" "),
        properties,
    }
}

fn normalize(raw: &str) -> String {
    SEPARATOR_RUN.replace_all(raw, " ").trim().to_string()
}

/// Capitalise the first letter of every alphabetic run, lowercase the rest.
fn title_case(raw: &str) -> String {
    let mut previous_alphabetic = false;
    raw.chars()
        .flat_map(|c| {
            let cased: Vec<char> = if !c.is_alphabetic() {
                vec![c]
            } else if previous_alphabetic {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            };
            previous_alphabetic = c.is_alphabetic();
            cased
        })
        .collect()
}
