// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Region arithmetic for partial (field-level) file rewrites.
//!
//! The common mutation path rewrites exactly one field of one CL:
//! locate the NAME block, locate the field inside it, splice in the new
//! lines. A field absent from the block is inserted at the end of the
//! block. Parsing is order-independent, so insertion order does not
//! need to match the canonical serializer order.

use crate::parse::STATUS_LINE_PREFIX;

/// Half-open line range `[start, end)` of one CL block, excluding the
/// trailing blank separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClRegion {
    pub start: usize,
    pub end: usize,
}

/// Find the block for `name`. Ends at two consecutive blank lines, the
/// next `NAME:`, or EOF.
pub fn find_cl_region(lines: &[String], name: &str) -> Option<ClRegion> {
    let start = lines.iter().position(|l| {
        l.trim_end()
            .strip_prefix("NAME:")
            .map(|v| v.trim() == name)
            .unwrap_or(false)
    })?;

    let mut end = start + 1;
    let mut blank_run = 0;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let t = line.trim_end();
        if t.is_empty() {
            blank_run += 1;
            if blank_run >= 2 {
                break;
            }
        } else if t.starts_with("NAME:") {
            break;
        } else {
            blank_run = 0;
            end = i + 1;
        }
    }
    Some(ClRegion { start, end })
}

fn is_field_member(line: &str) -> bool {
    line.starts_with(STATUS_LINE_PREFIX) || (line.starts_with("  ") && !line.trim_end().is_empty())
}

/// Locate a block field (`HOOKS:`, `HISTORY:`, …) inside a CL region:
/// the header line plus every indented/status line that follows it.
pub fn block_field_region(lines: &[String], region: ClRegion, header: &str) -> Option<(usize, usize)> {
    let start = (region.start..region.end).find(|&i| lines[i].trim_end() == header)?;
    let mut end = start + 1;
    while end < region.end && is_field_member(&lines[end]) {
        end += 1;
    }
    Some((start, end))
}

/// Locate a scalar field (`STATUS: …`) inside a CL region.
pub fn scalar_field_region(lines: &[String], region: ClRegion, key: &str) -> Option<usize> {
    (region.start..region.end).find(|&i| lines[i].trim_end().starts_with(key))
}

/// Replace (or insert, or remove) a block field inside the CL `name`.
///
/// `new_lines` must include the header; an empty `new_lines` removes the
/// field entirely. Returns false when the CL is absent.
pub fn replace_block_field(
    lines: &mut Vec<String>,
    name: &str,
    header: &str,
    new_lines: Vec<String>,
) -> bool {
    let Some(region) = find_cl_region(lines, name) else {
        return false;
    };
    match block_field_region(lines, region, header) {
        Some((start, end)) => {
            lines.splice(start..end, new_lines);
        }
        None => {
            lines.splice(region.end..region.end, new_lines);
        }
    }
    true
}

/// Replace (or insert, or remove) a scalar field inside the CL `name`.
pub fn replace_scalar_field(
    lines: &mut Vec<String>,
    name: &str,
    key: &str,
    value: Option<String>,
) -> bool {
    let Some(region) = find_cl_region(lines, name) else {
        return false;
    };
    let rendered = value.map(|v| format!("{key} {v}"));
    match scalar_field_region(lines, region, key) {
        Some(i) => match rendered {
            Some(line) => lines[i] = line,
            None => {
                lines.remove(i);
            }
        },
        None => {
            if let Some(line) = rendered {
                lines.insert(region.end, line);
            }
        }
    }
    true
}

/// Read the current value of a scalar field (text after `key`).
pub fn scalar_field_value(lines: &[String], name: &str, key: &str) -> Option<String> {
    let region = find_cl_region(lines, name)?;
    let i = scalar_field_region(lines, region, key)?;
    Some(lines[i].trim_end()[key.len()..].trim().to_string())
}

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;
