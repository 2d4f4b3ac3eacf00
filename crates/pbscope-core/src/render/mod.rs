//! Text rendering of decoded trees.
//!
//! [`write_items`] walks a tree depth-first and hands every item to an
//! [`ItemWriter`]. [`TableWriter`] produces the aligned
//! `WireType FieldTag Length Value` table, nesting expanded LEN payloads
//! underneath their parent row.

mod writer;

use crate::decoder::DecodedItem;
use std::fmt::Write as FmtWrite;

pub use writer::{ItemWriter, StatsWriter};

const WIRE_TYPE_WIDTH: usize = 14;
const FIELD_TAG_WIDTH: usize = 10;
const LENGTH_WIDTH: usize = 8;

/// Visits `items` depth-first, parents before children
pub fn write_items<W: ItemWriter + ?Sized>(
    writer: &mut W,
    items: &[DecodedItem],
) -> std::fmt::Result {
    writer.begin()?;
    walk(writer, items, 0)
}

fn walk<W: ItemWriter + ?Sized>(
    writer: &mut W,
    items: &[DecodedItem],
    depth: usize,
) -> std::fmt::Result {
    for item in items {
        writer.write_item(item, depth)?;
        walk(writer, &item.sub_items, depth + 1)?;
    }
    Ok(())
}

/// Renders `items` as a table string
pub fn render_table(items: &[DecodedItem]) -> String {
    let mut output = String::new();
    let mut writer = TableWriter::new(&mut output);
    write_items(&mut writer, items).expect("String write cannot fail");
    output
}

/// Writes a decoded tree as an aligned table
pub struct TableWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    indent_str: String,
}

impl<'a, W: FmtWrite> TableWriter<'a, W> {
    /// Creates a table writer with two-space indentation
    pub fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            indent_str: "  ".to_string(),
        }
    }

    /// Sets the string repeated once per nesting level
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    fn write_row(&mut self, depth: usize, cells: [&str; 4]) -> std::fmt::Result {
        let [wire_type, field_tag, length, value] = cells;
        let indent = self.indent_str.repeat(depth);
        let wire_type = format!("{}{}", indent, wire_type);

        let line = format!(
            "{:<wt$} {:<ft$} {:<ln$} {}",
            wire_type,
            field_tag,
            length,
            value,
            wt = WIRE_TYPE_WIDTH,
            ft = FIELD_TAG_WIDTH,
            ln = LENGTH_WIDTH,
        );
        writeln!(self.writer, "{}", line.trim_end())
    }
}

impl<W: FmtWrite> ItemWriter for TableWriter<'_, W> {
    fn begin(&mut self) -> std::fmt::Result {
        self.write_row(0, ["WireType", "FieldTag", "Length", "Value"])
    }

    fn write_item(&mut self, item: &DecodedItem, depth: usize) -> std::fmt::Result {
        let wire_type = item.wire_type_name();
        let field_tag = item.field_tag.to_string();
        let length = item.length.to_string();
        self.write_row(depth, [&wire_type, &field_tag, &length, &item.value])
    }
}
