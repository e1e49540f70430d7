//! Plain-text rendering for the `gazetteer` commands.

use std::io::{self, Write};

use anyhow::Result;

use jiuyu::link::LinkReport;
use jiuyu::models::{FeatureLevel, RegionLevel, RegionNode, RegionTree};
use jiuyu::reference::{GeoReference, ReferenceLevel};

const HEADING_COLUMNS: [&str; 3] = ["一级标题", "二级标题", "三级标题"];

/// Indented outline, one node per line, with its code when linked.
pub fn write_outline<W: Write>(out: &mut W, tree: &RegionTree) -> io::Result<()> {
    for node in tree.walk() {
        let indent = "  ".repeat(usize::from(node.level.number() - 1));
        match &node.adcode {
            Some(code) => writeln!(out, "{}{} [{}]", indent, node.name, code)?,
            None => writeln!(out, "{}{}", indent, node.name)?,
        }
    }
    Ok(())
}

/// Search hits in order; the first one is the default selection.
pub fn write_matches<W: Write>(out: &mut W, matches: &[&RegionNode]) -> io::Result<()> {
    for (idx, node) in matches.iter().enumerate() {
        let marker = if idx == 0 { '*' } else { ' ' };
        let path = match &node.parent_name {
            Some(parent) => format!("{} / {}", parent, node.name),
            None => node.name.clone(),
        };
        writeln!(out, "{} {} ({})", marker, path, node.level.label())?;
    }
    Ok(())
}

/// Full information block for one region.
pub fn write_region<W: Write>(out: &mut W, node: &RegionNode) -> io::Result<()> {
    writeln!(out, "{}", node.name)?;
    writeln!(out, "行政级别: {}", node.level.label())?;
    match &node.adcode {
        Some(code) => writeln!(out, "行政代码: {}", code)?,
        None => writeln!(out, "行政代码: 无")?,
    }
    if let Some(parent) = &node.parent_name {
        writeln!(out, "上级区域: {}", parent)?;
    }

    for (title, text) in [("概述", &node.text_general), ("详细信息", &node.text_detail)] {
        let text = text.trim();
        if !text.is_empty() {
            writeln!(out)?;
            writeln!(out, "{}", title)?;
            writeln!(out, "{}", text)?;
        }
    }

    if !node.children.is_empty() {
        writeln!(out)?;
        writeln!(out, "{} ({}个)", node.level.child_label(), node.children.len())?;
        for child in &node.children {
            writeln!(out, "  - {}", child.name)?;
        }
    }
    Ok(())
}

pub fn write_link_report<W: Write>(out: &mut W, report: &LinkReport) -> io::Result<()> {
    writeln!(out, "{:<10} {:>7} {:>7} {:>9}", "level", "linked", "missed", "orphaned")?;
    for &level in RegionLevel::all() {
        let stats = report.level(level);
        let name = FeatureLevel::for_region(level).field_name();
        if stats.skipped {
            writeln!(out, "{:<10} skipped (unusable schema)", name)?;
        } else {
            writeln!(
                out,
                "{:<10} {:>7} {:>7} {:>9}",
                name, stats.linked, stats.missed, stats.orphaned
            )?;
        }
    }
    writeln!(out, "parent codes set: {}", report.parent_codes_set)
}

/// Load state of every reference level.
pub fn write_status<W: Write>(out: &mut W, reference: &GeoReference) -> io::Result<()> {
    for level in [
        FeatureLevel::Country,
        FeatureLevel::Province,
        FeatureLevel::City,
        FeatureLevel::District,
    ] {
        match reference.get(level) {
            ReferenceLevel::Missing => writeln!(out, "{:<10} missing", level)?,
            ReferenceLevel::Unusable(e) => writeln!(out, "{:<10} unusable: {}", level, e)?,
            ReferenceLevel::Ready(collection) => {
                writeln!(out, "{:<10} {} features", level, collection.len())?
            }
        }
    }
    Ok(())
}

/// Heading inventory as CSV, one row per node with only its own level's
/// column filled.
pub fn write_headings<W: Write>(out: W, tree: &RegionTree) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADING_COLUMNS)?;
    for node in tree.walk() {
        let mut row = ["", "", ""];
        row[usize::from(node.level.number() - 1)] = node.name.as_str();
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
