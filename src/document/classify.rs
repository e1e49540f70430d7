//! Line classifier for the gazetteer heading grammar.
//!
//! Real data examples:
//!   `# 第5章 河北省`          province heading
//!   `## 零、上位类说明`        province general-description marker
//!   `## 十一、保定市`          city heading (Chinese ordinal 一 .. 三十八)
//!   `### 0.上位类说明`         city general-description marker
//!   `### 3.桥西区`             district heading (ordinal 1 .. 25)
//!
//! Precedence is fixed: province heading, province marker, city heading,
//! city marker, district heading, plain text. The markers and the city and
//! district headings only apply while the enclosing scope is open; otherwise
//! the line is plain text.

use regex::Regex;
use std::sync::LazyLock;

/// Literal province general-description marker line.
pub const PROVINCE_GENERAL_MARKER: &str = "## 零、上位类说明";

/// Literal city general-description marker line.
pub const CITY_GENERAL_MARKER: &str = "### 0.上位类说明";

/// Highest city ordinal the grammar admits (三十八).
pub const MAX_CITY_ORDINAL: usize = 38;

/// Highest district ordinal the grammar admits.
pub const MAX_DISTRICT_ORDINAL: u8 = 25;

// ── Regex patterns ─────────────────────────────────────────────────

static RE_LEVEL1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+第[0-9]+章\s*(?P<name>.+)$").unwrap());

static RE_LEVEL2_GENERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##\s+零、上位类说明$").unwrap());

static RE_LEVEL2: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = city_numerals().join("|");
    Regex::new(&format!(r"^##\s+(?:{alternation})、\s*(?P<name>.+)$")).unwrap()
});

static RE_LEVEL3_GENERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^###\s+0\.上位类说明$").unwrap());

static RE_LEVEL3: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^###\s*(?P<ordinal>[1-9][0-9]?)\.\s*(?P<name>.+)$").unwrap()
});

/// The 38 Chinese ordinal spellings accepted before a city heading,
/// longest first so that 十一 is tried before 十 and 一.
pub fn city_numerals() -> Vec<String> {
    const UNITS: [&str; 9] = ["一", "二", "三", "四", "五", "六", "七", "八", "九"];

    let mut numerals: Vec<String> = UNITS.iter().map(|u| u.to_string()).collect();
    for tens in ["十", "二十", "三十"] {
        numerals.push(tens.to_string());
        for unit in UNITS {
            numerals.push(format!("{tens}{unit}"));
        }
    }
    numerals.truncate(MAX_CITY_ORDINAL);

    // Stable sort keeps numeric order within one length.
    numerals.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
    numerals
}

/// Which enclosing scopes are open when a line is classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenScope {
    pub province: bool,
    pub city: bool,
}

/// One classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `# 第N章 <name>`
    Level1Heading { name: &'a str },
    /// `## 零、上位类说明` inside a province
    Level2GeneralMarker,
    /// `## <numeral>、<name>` inside a province
    Level2Heading { name: &'a str },
    /// `### 0.上位类说明` inside a city
    Level3GeneralMarker,
    /// `### <n>.<name>` inside a city; `ordinal` is an ordering hint only
    Level3Heading { ordinal: u8, name: &'a str },
    /// Anything else, with the line terminator removed
    PlainText(&'a str),
}

impl LineKind<'_> {
    pub fn is_heading(&self) -> bool {
        !matches!(self, LineKind::PlainText(_))
    }
}

/// Classify one line of the document.
pub fn classify(line: &str, scope: OpenScope) -> LineKind<'_> {
    let raw = line.trim_end_matches(['\n', '\r']);
    let trimmed = raw.trim();

    if let Some(name) = capture_name(&RE_LEVEL1, trimmed) {
        return LineKind::Level1Heading { name };
    }

    if scope.province {
        if RE_LEVEL2_GENERAL.is_match(trimmed) {
            return LineKind::Level2GeneralMarker;
        }
        if let Some(name) = capture_name(&RE_LEVEL2, trimmed) {
            return LineKind::Level2Heading { name };
        }
    }

    if scope.city {
        if RE_LEVEL3_GENERAL.is_match(trimmed) {
            return LineKind::Level3GeneralMarker;
        }
        if let Some(caps) = RE_LEVEL3.captures(trimmed) {
            let ordinal = caps
                .name("ordinal")
                .and_then(|m| m.as_str().parse::<u8>().ok())
                .filter(|n| *n <= MAX_DISTRICT_ORDINAL);
            let name = caps.name("name").map(|m| m.as_str().trim());
            if let (Some(ordinal), Some(name)) = (ordinal, name) {
                if !name.is_empty() {
                    return LineKind::Level3Heading { ordinal, name };
                }
            }
        }
    }

    LineKind::PlainText(raw)
}

fn capture_name<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    let name = re.captures(line)?.name("name")?.as_str().trim();
    (!name.is_empty()).then_some(name)
}
