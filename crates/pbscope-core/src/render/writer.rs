//! Extensible item writing traits.
//!
//! This module provides the [`ItemWriter`] trait for customizing how a
//! decoded tree is written to output.

use crate::decoder::{DecodedItem, WireType};
use std::fmt::{self, Result};

/// Trait for writing decoded items to output.
///
/// [`write_items`](super::write_items) visits the tree depth-first and calls
/// [`write_item`](ItemWriter::write_item) once per item, parents before
/// their children.
///
/// # Example
///
/// ```
/// use pbscope_core::render::{write_items, ItemWriter};
/// use pbscope_core::DecodedItem;
///
/// struct FieldList(Vec<String>);
///
/// impl ItemWriter for FieldList {
///     fn write_item(&mut self, item: &DecodedItem, _depth: usize) -> std::fmt::Result {
///         self.0.push(item.field_tag.to_string());
///         Ok(())
///     }
/// }
///
/// let items = pbscope_core::decode(&[0x08, 0x01, 0x10, 0x02])?;
/// let mut list = FieldList(Vec::new());
/// write_items(&mut list, &items).unwrap();
/// assert_eq!(list.0, vec!["1", "2"]);
/// # Ok::<(), pbscope_core::Error>(())
/// ```
pub trait ItemWriter {
    /// Called once before the first item
    fn begin(&mut self) -> Result {
        Ok(())
    }

    /// Write one item found `depth` levels below the top
    fn write_item(&mut self, item: &DecodedItem, depth: usize) -> Result;
}

/// A writer that collects statistics about a decoded tree
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsWriter {
    /// Number of items at every level
    pub item_count: usize,
    /// Number of VARINT items
    pub varint_count: usize,
    /// Number of I64 items
    pub i64_count: usize,
    /// Number of LEN items
    pub len_count: usize,
    /// Number of I32 items
    pub i32_count: usize,
    /// Number of group and unknown wire type items
    pub other_count: usize,
    /// Number of LEN items expanded into nested messages
    pub expanded_count: usize,
    /// Number of nesting levels seen
    pub max_depth: usize,
}

impl ItemWriter for StatsWriter {
    fn write_item(&mut self, item: &DecodedItem, depth: usize) -> Result {
        self.item_count += 1;
        self.max_depth = self.max_depth.max(depth + 1);

        match item.wire_type() {
            Some(WireType::Varint) => self.varint_count += 1,
            Some(WireType::I64) => self.i64_count += 1,
            Some(WireType::Len) => self.len_count += 1,
            Some(WireType::I32) => self.i32_count += 1,
            _ => self.other_count += 1,
        }

        if item.is_expanded() {
            self.expanded_count += 1;
        }
        Ok(())
    }
}

impl fmt::Display for StatsWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result {
        writeln!(f, "items:    {}", self.item_count)?;
        writeln!(f, "depth:    {}", self.max_depth)?;
        writeln!(f, "VARINT:   {}", self.varint_count)?;
        writeln!(f, "I64:      {}", self.i64_count)?;
        writeln!(f, "LEN:      {} ({} expanded)", self.len_count, self.expanded_count)?;
        writeln!(f, "I32:      {}", self.i32_count)?;
        write!(f, "other:    {}", self.other_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::write_items;

    #[test]
    fn test_stats_writer() {
        // LEN { VARINT, VARINT }, VARINT, I32
        let data = [0x0a, 0x04, 0x08, 0x02, 0x10, 0x01, 0x10, 0x64, 0x1d, 0, 0, 0, 1];
        let items = crate::decode(&data).unwrap();

        let mut writer = StatsWriter::default();
        write_items(&mut writer, &items).unwrap();

        assert_eq!(writer.item_count, 5);
        assert_eq!(writer.varint_count, 3);
        assert_eq!(writer.len_count, 1);
        assert_eq!(writer.i32_count, 1);
        assert_eq!(writer.expanded_count, 1);
        assert_eq!(writer.max_depth, 2);
    }

    #[test]
    fn test_stats_empty() {
        let mut writer = StatsWriter::default();
        write_items(&mut writer, &[]).unwrap();
        assert_eq!(writer, StatsWriter::default());
    }
}
