//! Single-pass document parser.
//!
//! Consumes classified lines and builds the Region Tree. Free text is
//! buffered and flushed into the active node's active field whenever a
//! heading or marker line arrives, and once more at end of input.
//! Whitespace-only lines are skipped and never buffered.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::classify::{classify, LineKind, OpenScope};
use crate::error::DocumentReadError;
use crate::models::{RegionLevel, RegionNode, RegionTree, TextField};

/// Where the parser currently is in the heading hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    NoContext,
    InProvince,
    InProvinceGeneral,
    InCity,
    InCityGeneral,
    InDistrict,
}

impl ParseState {
    fn scope(&self) -> OpenScope {
        match self {
            ParseState::NoContext => OpenScope::default(),
            ParseState::InProvince | ParseState::InProvinceGeneral => OpenScope {
                province: true,
                city: false,
            },
            ParseState::InCity | ParseState::InCityGeneral | ParseState::InDistrict => OpenScope {
                province: true,
                city: true,
            },
        }
    }
}

/// The node receiving flushed text and which of its fields gets it.
///
/// The target is always the most recently created node of `level`, since
/// nodes are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub level: RegionLevel,
    pub field: TextField,
}

/// Streaming parser state.
///
/// Feed lines with [`DocumentParser::feed`] and call
/// [`DocumentParser::finish`] to flush the last buffer and take the tree.
#[derive(Debug)]
pub struct DocumentParser {
    provinces: Vec<RegionNode>,
    state: ParseState,
    cursor: Option<Cursor>,
    buffer: Vec<String>,
    /// Next district ordinal expected under the open city
    expected_ordinal: u8,
    line_number: usize,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser {
    pub fn new() -> Self {
        Self {
            provinces: Vec::new(),
            state: ParseState::NoContext,
            cursor: None,
            buffer: Vec::new(),
            expected_ordinal: 1,
            line_number: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// Consume one raw input line. Whitespace-only lines are skipped
    /// before classification and never reach the text buffer.
    pub fn feed(&mut self, line: &str) {
        self.line_number += 1;

        if line.trim().is_empty() {
            return;
        }

        match classify(line, self.scope()) {
            LineKind::Level1Heading { name } => {
                self.flush();
                self.provinces.push(RegionNode::province(name));
                self.open(RegionLevel::Province, ParseState::InProvince);
            }
            LineKind::Level2GeneralMarker => {
                self.flush();
                self.cursor = Some(Cursor {
                    level: RegionLevel::Province,
                    field: TextField::General,
                });
                self.state = ParseState::InProvinceGeneral;
            }
            LineKind::Level2Heading { name } => {
                self.flush();
                if let Some(province) = self.provinces.last_mut() {
                    if let Some(city) = province.child_node(name) {
                        province.children.push(city);
                    }
                }
                self.expected_ordinal = 1;
                self.open(RegionLevel::City, ParseState::InCity);
            }
            LineKind::Level3GeneralMarker => {
                self.flush();
                self.cursor = Some(Cursor {
                    level: RegionLevel::City,
                    field: TextField::General,
                });
                self.state = ParseState::InCityGeneral;
            }
            LineKind::Level3Heading { ordinal, name } => {
                self.flush();
                self.check_ordinal(ordinal, name);
                if let Some(city) = self.node_mut(RegionLevel::City) {
                    if let Some(district) = city.child_node(name) {
                        city.children.push(district);
                    }
                }
                self.open(RegionLevel::District, ParseState::InDistrict);
            }
            LineKind::PlainText(text) => self.buffer.push(text.to_string()),
        }
    }

    /// Flush the remaining buffer and return the tree.
    pub fn finish(mut self) -> RegionTree {
        self.flush();
        RegionTree::new(self.provinces)
    }

    /// Open scopes for the next line. A province marker met after a city
    /// heading moves the cursor back to the province but leaves that city
    /// open, so its marker and district headings still apply.
    fn scope(&self) -> OpenScope {
        let mut scope = self.state.scope();
        if self.state == ParseState::InProvinceGeneral {
            scope.city = self
                .provinces
                .last()
                .is_some_and(|province| !province.children.is_empty());
        }
        scope
    }

    fn open(&mut self, level: RegionLevel, state: ParseState) {
        self.cursor = Some(Cursor {
            level,
            field: TextField::Detail,
        });
        self.state = state;
    }

    /// Append the buffered lines to the cursor's target field.
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let joined = self.buffer.join("\n");
        self.buffer.clear();

        let text = joined.trim();
        if text.is_empty() {
            return;
        }

        let Some(cursor) = self.cursor else {
            debug!(
                "Discarding {} chars of text before the first province heading",
                text.chars().count()
            );
            return;
        };

        if let Some(node) = self.node_mut(cursor.level) {
            node.append_text(cursor.field, text);
        }
    }

    /// The most recently created node at `level`.
    fn node_mut(&mut self, level: RegionLevel) -> Option<&mut RegionNode> {
        let province = self.provinces.last_mut()?;
        match level {
            RegionLevel::Province => Some(province),
            RegionLevel::City => province.children.last_mut(),
            RegionLevel::District => province.children.last_mut()?.children.last_mut(),
        }
    }

    fn check_ordinal(&mut self, ordinal: u8, name: &str) {
        if ordinal != self.expected_ordinal {
            let city = self
                .node_mut(RegionLevel::City)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            warn!(
                "L{}: district numbering gap under '{}': expected {}., found {}. ({})",
                self.line_number, city, self.expected_ordinal, ordinal, name
            );
        }
        self.expected_ordinal = ordinal.saturating_add(1);
    }
}

/// Parse a whole document held in memory.
pub fn parse_str(content: &str) -> RegionTree {
    let mut parser = DocumentParser::new();
    for line in content.lines() {
        parser.feed(line);
    }
    parser.finish()
}

/// Read and parse a UTF-8 gazetteer document.
///
/// Read or decode failures are returned to the caller; no partial tree is
/// produced.
pub fn parse_document(path: &Path) -> Result<RegionTree, DocumentReadError> {
    info!("Parsing document {}", path.display());

    let bytes = fs::read(path).map_err(|source| DocumentReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8(bytes).map_err(|e| DocumentReadError::Undecodable {
        path: path.to_path_buf(),
        offset: e.utf8_error().valid_up_to(),
    })?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let tree = parse_str(content);

    let cities: usize = tree.provinces().iter().map(|p| p.children.len()).sum();
    info!(
        "Parsed {} provinces, {} cities, {} nodes total",
        tree.provinces().len(),
        cities,
        tree.len()
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::classify::{CITY_GENERAL_MARKER, PROVINCE_GENERAL_MARKER};
    use std::io::Write;

    const SCENARIO: &str = "\
# 第5章 河北省
## 零、上位类说明
河北省上位类说明正文。
## 一、石家庄市
### 0.上位类说明
石家庄市上位类说明正文。
### 1.长安区
长安区沿革正文。
";

    fn sample_document() -> String {
        [
            "前言：本书依据旧志整理。",
            "# 第5章 河北省",
            "河北省总述第一行。",
            "",
            "河北省总述第二行。",
            PROVINCE_GENERAL_MARKER,
            "燕赵故地。",
            "## 一、石家庄市",
            "石家庄市沿革。",
            CITY_GENERAL_MARKER,
            "石家庄市上位类。",
            "### 1.长安区",
            "长安区沿革。",
            "### 2.桥西区",
            "桥西区沿革。",
            "## 二、唐山市",
            "### 1.路南区",
            "路南区沿革。",
            "# 第6章 山西省",
            "## 一、太原市",
            "太原市沿革。",
        ]
        .join("\n")
    }

    #[test]
    fn test_scenario_general_and_detail_routing() {
        let tree = parse_str(SCENARIO);
        assert_eq!(tree.provinces().len(), 1);

        let hebei = &tree.provinces()[0];
        assert_eq!(hebei.name, "河北省");
        assert_eq!(hebei.text_general, "河北省上位类说明正文。");
        assert_eq!(hebei.text_detail, "");

        assert_eq!(hebei.children.len(), 1);
        let sjz = &hebei.children[0];
        assert_eq!(sjz.name, "石家庄市");
        assert_eq!(sjz.text_general, "石家庄市上位类说明正文。");
        assert_eq!(sjz.text_detail, "");

        assert_eq!(sjz.children.len(), 1);
        let changan = &sjz.children[0];
        assert_eq!(changan.name, "长安区");
        assert_eq!(changan.level, RegionLevel::District);
        assert_eq!(changan.text_detail, "长安区沿革正文。");
        assert_eq!(changan.text_general, "");
    }

    #[test]
    fn test_full_document_structure() {
        let tree = parse_str(&sample_document());
        let names: Vec<&str> = tree.walk().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["河北省", "石家庄市", "长安区", "桥西区", "唐山市", "路南区", "山西省", "太原市"]
        );

        let hebei = &tree.provinces()[0];
        assert_eq!(hebei.text_detail, "河北省总述第一行。\n河北省总述第二行。");
        assert_eq!(hebei.text_general, "燕赵故地。");
        assert_eq!(hebei.children[0].text_detail, "石家庄市沿革。");
        assert_eq!(hebei.children[0].text_general, "石家庄市上位类。");
        assert_eq!(tree.provinces()[1].children[0].text_detail, "太原市沿革。");
    }

    #[test]
    fn test_preamble_is_not_attributed_to_first_province() {
        let tree = parse_str(&sample_document());
        for node in tree.walk() {
            assert!(!node.text_detail.contains("前言"));
            assert!(!node.text_general.contains("前言"));
        }
    }

    #[test]
    fn test_depth_and_parent_names() {
        let tree = parse_str(&sample_document());
        assert!(tree.depth() <= 3);
        for province in tree.provinces() {
            assert!(province.parent_name.is_none());
            for city in &province.children {
                assert_eq!(city.parent_name.as_deref(), Some(province.name.as_str()));
                for district in &city.children {
                    assert_eq!(district.parent_name.as_deref(), Some(city.name.as_str()));
                    assert!(district.children.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let doc = sample_document();
        let first = serde_json::to_string(&parse_str(&doc)).unwrap();
        let second = serde_json::to_string(&parse_str(&doc)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_text_never_contains_markers() {
        let tree = parse_str(&sample_document());
        for node in tree.walk() {
            for text in [&node.text_general, &node.text_detail] {
                assert!(!text.contains("上位类说明"));
            }
        }
    }

    #[test]
    fn test_new_province_closes_city_scope() {
        let doc = "\
# 第1章 甲省
## 一、乙市
# 第2章 丙省
### 1.丁区
";
        let tree = parse_str(doc);
        let bing = &tree.provinces()[1];
        assert!(bing.children.is_empty());
        assert_eq!(bing.text_detail, "### 1.丁区");
    }

    #[test]
    fn test_province_marker_after_city_keeps_city_open() {
        let doc = "\
# 第5章 河北省
## 一、石家庄市
## 零、上位类说明
燕赵。
### 0.上位类说明
城市概述。
### 1.长安区
长安区沿革。
";
        let tree = parse_str(doc);
        let hebei = &tree.provinces()[0];
        assert_eq!(hebei.text_general, "燕赵。");

        let sjz = &hebei.children[0];
        assert_eq!(sjz.text_general, "城市概述。");
        assert_eq!(sjz.children.len(), 1);
        assert_eq!(sjz.children[0].name, "长安区");
        assert_eq!(sjz.children[0].text_detail, "长安区沿革。");

        for node in tree.walk() {
            assert!(!node.text_general.contains("上位类说明"));
            assert!(!node.text_detail.contains("上位类说明"));
        }
    }

    #[test]
    fn test_province_marker_without_city_keeps_city_closed() {
        let doc = "\
# 第5章 河北省
## 零、上位类说明
### 1.长安区
";
        let tree = parse_str(doc);
        let hebei = &tree.provinces()[0];
        assert!(hebei.children.is_empty());
        assert_eq!(hebei.text_general, "### 1.长安区");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let mut parser = DocumentParser::new();
        parser.feed("# 第5章 河北省");
        parser.feed("   ");
        parser.feed("");
        parser.feed("正文");
        let tree = parser.finish();
        assert_eq!(tree.provinces()[0].text_detail, "正文");
    }

    #[test]
    fn test_city_heading_before_province_is_discarded_text() {
        let tree = parse_str("## 一、石家庄市\n正文\n");
        assert!(tree.is_empty());
    }

    #[test]
    fn test_general_then_detail_resumes_on_same_node() {
        let doc = "\
# 第5章 河北省
总述。
## 零、上位类说明
上位类。
## 一、石家庄市
";
        let tree = parse_str(doc);
        let hebei = &tree.provinces()[0];
        assert_eq!(hebei.text_detail, "总述。");
        assert_eq!(hebei.text_general, "上位类。");
    }

    #[test]
    fn test_repeated_marker_appends_with_newline() {
        let doc = "\
# 第5章 河北省
## 零、上位类说明
第一段。
## 零、上位类说明
第二段。
";
        let tree = parse_str(doc);
        assert_eq!(tree.provinces()[0].text_general, "第一段。\n第二段。");
    }

    #[test]
    fn test_plain_text_keeps_internal_content() {
        let doc = "# 第5章 河北省\n  甲  乙  \n丙\n";
        let tree = parse_str(doc);
        assert_eq!(tree.provinces()[0].text_detail, "甲  乙  \n丙");
    }

    #[test]
    fn test_state_and_cursor_transitions() {
        let mut parser = DocumentParser::new();
        assert_eq!(parser.state(), ParseState::NoContext);
        assert!(parser.cursor().is_none());

        parser.feed("# 第5章 河北省");
        assert_eq!(parser.state(), ParseState::InProvince);
        parser.feed(PROVINCE_GENERAL_MARKER);
        assert_eq!(parser.state(), ParseState::InProvinceGeneral);
        assert_eq!(
            parser.cursor(),
            Some(Cursor {
                level: RegionLevel::Province,
                field: TextField::General
            })
        );
        parser.feed("## 一、石家庄市");
        assert_eq!(parser.state(), ParseState::InCity);
        parser.feed(CITY_GENERAL_MARKER);
        assert_eq!(parser.state(), ParseState::InCityGeneral);
        parser.feed("### 1.长安区");
        assert_eq!(parser.state(), ParseState::InDistrict);
        assert_eq!(
            parser.cursor(),
            Some(Cursor {
                level: RegionLevel::District,
                field: TextField::Detail
            })
        );
        parser.feed("正文");
        assert_eq!(parser.state(), ParseState::InDistrict);

        let tree = parser.finish();
        assert_eq!(tree.provinces()[0].children[0].children[0].text_detail, "正文");
    }

    #[test]
    fn test_ordinal_gap_does_not_fail() {
        let doc = "\
# 第5章 河北省
## 一、石家庄市
### 1.长安区
### 3.新华区
";
        let tree = parse_str(doc);
        let names: Vec<&str> = tree.provinces()[0].children[0]
            .children
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["长安区", "新华区"]);
    }

    #[test]
    fn test_parse_document_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}{SCENARIO}").unwrap();
        let tree = parse_document(file.path()).unwrap();
        assert_eq!(tree.provinces()[0].name, "河北省");
    }

    #[test]
    fn test_parse_document_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = parse_document(&dir.path().join("missing.md"));
        assert!(matches!(result, Err(DocumentReadError::Io { .. })));
    }

    #[test]
    fn test_parse_document_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'#', b' ', 0xff, 0xfe]).unwrap();
        let result = parse_document(file.path());
        assert!(matches!(
            result,
            Err(DocumentReadError::Undecodable { offset: 2, .. })
        ));
    }
}
