//! The Region Tree: province → city → district records built by the
//! document parser and annotated by the linker.

use serde::{Serialize, Serializer};

use super::{boundary_bbox, AdCode, Boundary};

/// Depth of a node in the Region Tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLevel {
    /// 省 (level 1)
    Province,
    /// 市 (level 2)
    City,
    /// 区/县 (level 3)
    District,
}

impl RegionLevel {
    /// Convert a 1-based level number to a RegionLevel
    pub fn from_number(level: u8) -> Option<Self> {
        match level {
            1 => Some(RegionLevel::Province),
            2 => Some(RegionLevel::City),
            3 => Some(RegionLevel::District),
            _ => None,
        }
    }

    /// Get the 1-based level number
    pub fn number(&self) -> u8 {
        match self {
            RegionLevel::Province => 1,
            RegionLevel::City => 2,
            RegionLevel::District => 3,
        }
    }

    /// Get all levels in hierarchical order (province first)
    pub fn all() -> &'static [RegionLevel] {
        &[
            RegionLevel::Province,
            RegionLevel::City,
            RegionLevel::District,
        ]
    }

    /// The level directly below this one, if any
    pub fn child(&self) -> Option<Self> {
        match self {
            RegionLevel::Province => Some(RegionLevel::City),
            RegionLevel::City => Some(RegionLevel::District),
            RegionLevel::District => None,
        }
    }

    /// Display label used in region summaries
    pub fn label(&self) -> &'static str {
        match self {
            RegionLevel::Province => "省级",
            RegionLevel::City => "市级",
            RegionLevel::District => "区/县级",
        }
    }

    /// Heading for the list of a node's children
    pub fn child_label(&self) -> &'static str {
        match self {
            RegionLevel::Province => "下辖市",
            RegionLevel::City => "下辖区/县",
            RegionLevel::District => "下级区域",
        }
    }
}

/// Which of a node's two text fields receives flushed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    /// Content under the level's "上位类说明" marker
    General,
    /// Everything else
    Detail,
}

/// One province, city or district entry.
#[derive(Debug, Clone, Serialize)]
pub struct RegionNode {
    /// Name as written in the heading
    pub name: String,

    #[serde(serialize_with = "serialize_level")]
    pub level: RegionLevel,

    /// Set by the linker when a reference row matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adcode: Option<AdCode>,

    /// Set by the linker's second pass once this node and its parent are both linked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_adcode: Option<AdCode>,

    /// Name of the enclosing node; `None` for provinces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,

    pub text_general: String,

    pub text_detail: String,

    /// Emitted as a bounding box only
    #[serde(rename = "bbox", serialize_with = "serialize_bbox")]
    pub geometry: Option<Boundary>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RegionNode>,
}

impl RegionNode {
    /// Create a province node.
    pub fn province(name: impl Into<String>) -> Self {
        Self::with_parent(name.into(), RegionLevel::Province, None)
    }

    /// Create a node one level below `self`, carrying `self.name` as its
    /// `parent_name`. Districts have no child level, so this returns `None`
    /// for them.
    pub fn child_node(&self, name: impl Into<String>) -> Option<Self> {
        let level = self.level.child()?;
        Some(Self::with_parent(
            name.into(),
            level,
            Some(self.name.clone()),
        ))
    }

    fn with_parent(name: String, level: RegionLevel, parent_name: Option<String>) -> Self {
        Self {
            name,
            level,
            adcode: None,
            parent_adcode: None,
            parent_name,
            text_general: String::new(),
            text_detail: String::new(),
            geometry: None,
            children: Vec::new(),
        }
    }

    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::General => &self.text_general,
            TextField::Detail => &self.text_detail,
        }
    }

    /// Append a block of text to `field`, separated from existing content by
    /// a single newline.
    pub fn append_text(&mut self, field: TextField, text: &str) {
        let target = match field {
            TextField::General => &mut self.text_general,
            TextField::Detail => &mut self.text_detail,
        };
        if !target.is_empty() {
            target.push('\n');
        }
        target.push_str(text);
    }

    pub fn is_linked(&self) -> bool {
        self.adcode.is_some()
    }

    /// Bounding box of the linked geometry, if any
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry.as_ref().and_then(boundary_bbox)
    }
}

fn serialize_level<S: Serializer>(level: &RegionLevel, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(level.number())
}

fn serialize_bbox<S: Serializer>(
    geometry: &Option<Boundary>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    geometry
        .as_ref()
        .and_then(boundary_bbox)
        .map(|(min_x, min_y, max_x, max_y)| [min_x, min_y, max_x, max_y])
        .serialize(serializer)
}

/// Ordered list of provinces produced by the parser.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RegionTree {
    provinces: Vec<RegionNode>,
}

impl RegionTree {
    pub fn new(provinces: Vec<RegionNode>) -> Self {
        Self { provinces }
    }

    pub fn provinces(&self) -> &[RegionNode] {
        &self.provinces
    }

    pub(crate) fn provinces_mut(&mut self) -> &mut Vec<RegionNode> {
        &mut self.provinces
    }

    pub fn is_empty(&self) -> bool {
        self.provinces.is_empty()
    }

    /// Total number of nodes at all levels
    pub fn len(&self) -> usize {
        self.walk().count()
    }

    /// Pre-order walk in document encounter order.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.provinces.iter().rev().collect(),
        }
    }

    /// Nodes whose name contains `query`, in document encounter order.
    ///
    /// The first element is the default selection.
    pub fn search(&self, query: &str) -> Vec<&RegionNode> {
        self.walk().filter(|node| node.name.contains(query)).collect()
    }

    /// First node carrying `code` as its own adcode.
    pub fn find_by_adcode(&self, code: &AdCode) -> Option<&RegionNode> {
        self.walk().find(|node| node.adcode.as_ref() == Some(code))
    }

    /// Maximum nesting depth; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        fn depth_of(node: &RegionNode) -> usize {
            1 + node.children.iter().map(depth_of).max().unwrap_or(0)
        }
        self.provinces.iter().map(depth_of).max().unwrap_or(0)
    }
}

/// Iterator returned by [`RegionTree::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a RegionNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a RegionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
