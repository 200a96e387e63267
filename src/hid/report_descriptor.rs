//! HID report descriptor parser
//!
//! Walks a report descriptor item by item and produces, for each logical
//! report, a table of fields with their bit position inside the report. This
//! is enough to decode keyboards and mice that do not follow the boot layout
//! (NKRO keyboards, mice with 16-bit axes, composite receivers using report
//! IDs).
//!
//! Everything is fixed-capacity: at most [`MAX_REPORTS`] reports per
//! descriptor and [`MAX_REPORT_FIELDS`] fields per report. Anything beyond
//! that is dropped, not reported as an error.
//!
//! One-bit variable runs on the Keyboard page (NKRO key bitmaps, modifier
//! bytes) are kept as a single bitmap field per run of consecutive usages,
//! so a 120-key bitmap costs one table entry. Everything else gets one field
//! per report element.
//!
//! Bit offsets are relative to the first byte after the Report ID prefix;
//! strip the ID byte before calling [`extract_field`].

use bitflags::bitflags;
use heapless::Vec;

use super::constants::{
    global_tag, item_type, local_tag, main_tag, usage, usage_page, LONG_ITEM_PREFIX,
};
use crate::config::{MAX_GLOBAL_STACK, MAX_QUEUED_USAGES, MAX_REPORTS, MAX_REPORT_FIELDS};
use crate::error::{Error, Result};

/// Main item kind a field was declared by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ItemKind {
    /// Device to host
    Input,
    /// Host to device
    Output,
    /// Configuration
    Feature,
}

bitflags! {
    /// Main item data bits that matter for decoding
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u8 {
        /// Constant (padding) rather than data
        const CONSTANT = 0b001;
        /// One value per usage (as opposed to an array of usage indices)
        const VARIABLE = 0b010;
        /// Relative rather than absolute
        const RELATIVE = 0b100;
    }
}

/// One field of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportField {
    /// First bit of the field
    pub bit_offset: u16,
    /// Width in bits (1..=32)
    pub bit_width: u8,
    /// Declaring main item
    pub kind: ItemKind,
    /// Main item flags
    pub flags: FieldFlags,
    /// Usage page
    pub usage_page: u16,
    /// Usage (variable fields) or first usage of the range (array fields
    /// and bitmaps)
    pub usage: u16,
    /// Last usage an array field can report or a bitmap covers; equal to
    /// `usage` for other variables
    pub usage_max: u16,
    /// Number of consecutive elements: one bit per usage for bitmaps, 1
    /// otherwise
    pub report_count: u16,
    /// Logical minimum
    pub logical_min: i32,
    /// Logical maximum
    pub logical_max: i32,
}

impl ReportField {
    /// Check if the field carries one value per usage
    pub fn is_variable(&self) -> bool {
        self.flags.contains(FieldFlags::VARIABLE)
    }

    /// Check if the field reports relative motion
    pub fn is_relative(&self) -> bool {
        self.flags.contains(FieldFlags::RELATIVE)
    }

    /// Check if the field is a key bitmap (one bit per usage)
    pub fn is_bitmap(&self) -> bool {
        self.is_variable() && self.report_count > 1
    }

    /// Usages whose bit is set, for a bitmap or single-bit variable field
    pub fn bitmap_usages<'a>(&'a self, report: &'a [u8]) -> impl Iterator<Item = u16> + 'a {
        (0..self.report_count).filter_map(move |index| {
            let position = self.bit_offset as usize + index as usize;
            let byte = report.get(position / 8).copied().unwrap_or(0);
            (byte & (1 << (position % 8)) != 0).then_some(self.usage + index)
        })
    }

    /// Check if this element extends a bitmap run ending in `self`
    fn continues_bitmap(&self, usage_page: u16, usage: u16, bit_offset: u32) -> bool {
        self.bit_width == 1
            && self.report_count < u16::MAX
            && self.usage_page == usage_page
            && self.usage_max as u32 + 1 == usage as u32
            && self.bit_offset as u32 + self.report_count as u32 == bit_offset
    }

    /// Check if values need sign extension
    pub fn is_signed(&self) -> bool {
        self.logical_min < 0
    }

    /// Map an array field value to the usage it selects
    ///
    /// Returns `None` for out-of-range values (the "no key" index).
    pub fn array_usage(&self, value: i32) -> Option<u16> {
        if value < self.logical_min || value > self.logical_max {
            return None;
        }
        let usage = self.usage as i64 + (value as i64 - self.logical_min as i64);
        if usage > self.usage_max as i64 || usage > u16::MAX as i64 {
            return None;
        }
        Some(usage as u16)
    }
}

/// One logical report of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDescriptor {
    /// Report ID (0 = reports carry no ID prefix)
    pub report_id: u8,
    /// Usage page of the enclosing top-level collection
    pub top_usage_page: u16,
    /// Usage of the enclosing top-level collection
    pub top_usage: u16,
    /// Fields in declaration order
    pub fields: Vec<ReportField, MAX_REPORT_FIELDS>,
    input_bits: u32,
    output_bits: u32,
    feature_bits: u32,
}

impl ReportDescriptor {
    fn new(report_id: u8, top_usage_page: u16, top_usage: u16) -> Self {
        Self {
            report_id,
            top_usage_page,
            top_usage,
            fields: Vec::new(),
            input_bits: 0,
            output_bits: 0,
            feature_bits: 0,
        }
    }

    fn cursor(&mut self, kind: ItemKind) -> &mut u32 {
        match kind {
            ItemKind::Input => &mut self.input_bits,
            ItemKind::Output => &mut self.output_bits,
            ItemKind::Feature => &mut self.feature_bits,
        }
    }

    /// Input report payload length in bytes (without the ID prefix)
    pub fn input_len(&self) -> usize {
        self.input_bits.div_ceil(8) as usize
    }

    /// Output report payload length in bytes (without the ID prefix)
    pub fn output_len(&self) -> usize {
        self.output_bits.div_ceil(8) as usize
    }

    /// Iterate over Input fields
    pub fn input_fields(&self) -> impl Iterator<Item = &ReportField> + '_ {
        self.fields.iter().filter(|f| f.kind == ItemKind::Input)
    }

    /// First Input variable field with this usage
    pub fn find_input(&self, page: u16, usage: u16) -> Option<&ReportField> {
        self.input_fields()
            .find(|f| f.is_variable() && f.usage_page == page && f.usage == usage)
    }

    /// Check if this report belongs to a keyboard or keypad collection
    pub fn is_keyboard(&self) -> bool {
        self.top_usage_page == usage_page::GENERIC_DESKTOP
            && matches!(self.top_usage, usage::KEYBOARD | usage::KEYPAD)
    }

    /// Check if this report belongs to a mouse or pointer collection
    pub fn is_mouse(&self) -> bool {
        self.top_usage_page == usage_page::GENERIC_DESKTOP
            && matches!(self.top_usage, usage::MOUSE | usage::POINTER)
    }

    /// Check if this report has keyboard LED outputs
    pub fn has_led_output(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.kind == ItemKind::Output && f.usage_page == usage_page::LED)
    }
}

/// Reports of one device
pub type ReportTable = Vec<ReportDescriptor, MAX_REPORTS>;

/// One short item
#[derive(Debug, Clone, Copy)]
struct Item<'a> {
    item_type: u8,
    tag: u8,
    data: &'a [u8],
}

impl Item<'_> {
    fn unsigned(&self) -> u32 {
        self.data
            .iter()
            .rev()
            .fold(0u32, |acc, &byte| (acc << 8) | byte as u32)
    }

    fn signed(&self) -> i32 {
        let raw = self.unsigned();
        match self.data.len() {
            1 => raw as u8 as i8 as i32,
            2 => raw as u16 as i16 as i32,
            _ => raw as i32,
        }
    }
}

/// Short-item tokenizer; long items are skipped
struct Items<'a> {
    bytes: &'a [u8],
    pos: usize,
    truncated: bool,
}

impl<'a> Items<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            truncated: false,
        }
    }
}

impl<'a> Iterator for Items<'a> {
    type Item = Item<'a>;

    fn next(&mut self) -> Option<Item<'a>> {
        loop {
            let prefix = *self.bytes.get(self.pos)?;

            if prefix == LONG_ITEM_PREFIX {
                let Some(&size) = self.bytes.get(self.pos + 1) else {
                    self.truncated = true;
                    return None;
                };
                let end = self.pos + 3 + size as usize;
                if end > self.bytes.len() {
                    self.truncated = true;
                    return None;
                }
                self.pos = end;
                continue;
            }

            let size = match prefix & 0x03 {
                3 => 4,
                n => n as usize,
            };
            let start = self.pos + 1;
            let Some(data) = self.bytes.get(start..start + size) else {
                self.truncated = true;
                return None;
            };
            self.pos = start + size;

            return Some(Item {
                item_type: (prefix >> 2) & 0x03,
                tag: prefix >> 4,
                data,
            });
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Globals {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    logical_max_unsigned: u32,
    report_size: u32,
    report_count: u32,
    report_id: u8,
}

impl Globals {
    /// Logical maximum, read as unsigned when a signed read would put it
    /// below a non-negative minimum (e.g. min 0, max 0xFF in one byte)
    fn logical_max(&self) -> i32 {
        if self.logical_min >= 0 && self.logical_max < self.logical_min {
            self.logical_max_unsigned.min(i32::MAX as u32) as i32
        } else {
            self.logical_max
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct UsageRange {
    /// Page from an extended (4-byte) usage
    page: Option<u16>,
    min: u16,
    max: u16,
}

impl UsageRange {
    fn len(&self) -> u32 {
        self.max.saturating_sub(self.min) as u32 + 1
    }
}

#[derive(Debug, Default)]
struct Locals {
    usages: Vec<UsageRange, MAX_QUEUED_USAGES>,
    usage_min: Option<(Option<u16>, u16)>,
    usage_max: Option<(Option<u16>, u16)>,
}

impl Locals {
    fn push(&mut self, range: UsageRange) {
        if self.usages.push(range).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("HID usage queue full, usage dropped");
        }
    }

    /// Usage of the `index`th field; past the end, the last usage repeats
    fn usage_at(&self, index: u32) -> Option<(Option<u16>, u16)> {
        let mut remaining = index;
        for range in &self.usages {
            if remaining < range.len() {
                return Some((range.page, range.min + remaining as u16));
            }
            remaining -= range.len();
        }
        self.usages.last().map(|range| (range.page, range.max))
    }
}

/// Split a usage item into (extended page, usage id)
fn split_usage(item: &Item<'_>) -> (Option<u16>, u16) {
    let raw = item.unsigned();
    if item.data.len() == 4 {
        (Some((raw >> 16) as u16), raw as u16)
    } else {
        (None, raw as u16)
    }
}

struct Parser {
    globals: Globals,
    stack: Vec<Globals, MAX_GLOBAL_STACK>,
    locals: Locals,
    depth: u32,
    top_usage_page: u16,
    top_usage: u16,
    reports: ReportTable,
    /// First report belonging to the current top-level collection
    open: usize,
    full: bool,
}

impl Parser {
    fn new() -> Self {
        Self {
            globals: Globals::default(),
            stack: Vec::new(),
            locals: Locals::default(),
            depth: 0,
            top_usage_page: 0,
            top_usage: 0,
            reports: Vec::new(),
            open: 0,
            full: false,
        }
    }

    fn global(&mut self, item: &Item<'_>) {
        match item.tag {
            global_tag::USAGE_PAGE => self.globals.usage_page = item.unsigned() as u16,
            global_tag::LOGICAL_MINIMUM => self.globals.logical_min = item.signed(),
            global_tag::LOGICAL_MAXIMUM => {
                self.globals.logical_max = item.signed();
                self.globals.logical_max_unsigned = item.unsigned();
            }
            global_tag::REPORT_SIZE => self.globals.report_size = item.unsigned(),
            global_tag::REPORT_ID => self.globals.report_id = item.unsigned() as u8,
            global_tag::REPORT_COUNT => self.globals.report_count = item.unsigned(),
            global_tag::PUSH => {
                if self.stack.push(self.globals).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("HID global stack overflow");
                }
            }
            global_tag::POP => {
                if let Some(globals) = self.stack.pop() {
                    self.globals = globals;
                }
            }
            // Physical extent, units: irrelevant for relative pointers and keys
            _ => {}
        }
    }

    fn local(&mut self, item: &Item<'_>) {
        match item.tag {
            local_tag::USAGE => {
                let (page, id) = split_usage(item);
                self.locals.push(UsageRange { page, min: id, max: id });
            }
            local_tag::USAGE_MINIMUM => {
                let min = split_usage(item);
                match self.locals.usage_max.take() {
                    Some(max) => self.locals.push(UsageRange { page: min.0.or(max.0), min: min.1, max: max.1 }),
                    None => self.locals.usage_min = Some(min),
                }
            }
            local_tag::USAGE_MAXIMUM => {
                let max = split_usage(item);
                match self.locals.usage_min.take() {
                    Some(min) => self.locals.push(UsageRange { page: min.0.or(max.0), min: min.1, max: max.1 }),
                    None => self.locals.usage_max = Some(max),
                }
            }
            // Designators, strings, delimiters
            _ => {}
        }
    }

    fn main(&mut self, item: &Item<'_>) {
        match item.tag {
            main_tag::INPUT => self.data_item(ItemKind::Input, item),
            main_tag::OUTPUT => self.data_item(ItemKind::Output, item),
            main_tag::FEATURE => self.data_item(ItemKind::Feature, item),
            main_tag::COLLECTION => {
                if self.depth == 0 {
                    let (page, id) = self.locals.usage_at(0).unwrap_or((None, 0));
                    self.top_usage_page = page.unwrap_or(self.globals.usage_page);
                    self.top_usage = id;
                }
                self.depth += 1;
            }
            main_tag::END_COLLECTION => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    self.open = self.reports.len();
                }
            }
            _ => {}
        }
        self.locals = Locals::default();
    }

    /// Report under construction for the current Report ID
    fn report_for(&mut self, report_id: u8) -> Option<&mut ReportDescriptor> {
        let index = match self.reports[self.open..]
            .iter()
            .position(|r| r.report_id == report_id)
        {
            Some(i) => self.open + i,
            None => {
                let report = ReportDescriptor::new(report_id, self.top_usage_page, self.top_usage);
                if self.reports.push(report).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("HID report table full, descriptor truncated");
                    self.full = true;
                    return None;
                }
                self.reports.len() - 1
            }
        };
        self.reports.get_mut(index)
    }

    fn data_item(&mut self, kind: ItemKind, item: &Item<'_>) {
        let flags = FieldFlags::from_bits_truncate(item.unsigned() as u8);
        let globals = self.globals;
        let logical_max = globals.logical_max();
        let size = globals.report_size;
        let count = globals.report_count;

        // Fields are built before borrowing the report table
        let mut fields: Vec<ReportField, MAX_REPORT_FIELDS> = Vec::new();
        let padding = flags.contains(FieldFlags::CONSTANT) || self.locals.usages.is_empty();
        let usable = !padding && (1..=32).contains(&size);
        let variable = flags.contains(FieldFlags::VARIABLE);

        let Some(report) = self.report_for(globals.report_id) else {
            return;
        };
        let cursor = report.cursor(kind);
        let start = *cursor;
        *cursor = start.saturating_add(size.saturating_mul(count));

        if !usable {
            return;
        }

        for index in 0..count {
            let offset = start + index * size;
            if offset > u16::MAX as u32 {
                break;
            }

            let (page, usage, usage_max) = if variable {
                let (page, id) = self.locals.usage_at(index).unwrap_or((None, 0));
                (page, id, id)
            } else {
                let first = self.locals.usages[0];
                (first.page, first.min, first.max)
            };
            let page = page.unwrap_or(globals.usage_page);

            if variable && size == 1 && page == usage_page::KEYBOARD {
                if let Some(run) = fields.last_mut().filter(|f| f.continues_bitmap(page, usage, offset)) {
                    run.usage_max = usage;
                    run.report_count += 1;
                    continue;
                }
            }

            let field = ReportField {
                bit_offset: offset as u16,
                bit_width: size as u8,
                kind,
                flags,
                usage_page: page,
                usage,
                usage_max,
                report_count: 1,
                logical_min: globals.logical_min,
                logical_max,
            };
            if fields.push(field).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("HID main item has too many fields, truncated");
                break;
            }
        }

        let Some(report) = self.report_for(globals.report_id) else {
            return;
        };
        for field in fields {
            if report.fields.push(field).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("HID report {} has too many fields, truncated", report.report_id);
                break;
            }
        }
    }
}

/// Parse a report descriptor into its logical reports
///
/// # Example
///
/// ```
/// use hid2ps2::hid::report_descriptor::{extract_field, parse};
///
/// // Three buttons, five bits of padding, 8-bit X and Y
/// let descriptor = [
///     0x05, 0x09, 0x19, 0x01, 0x29, 0x03, 0x15, 0x00, 0x25, 0x01,
///     0x75, 0x01, 0x95, 0x03, 0x81, 0x02, 0x75, 0x05, 0x95, 0x01,
///     0x81, 0x01, 0x05, 0x01, 0x09, 0x30, 0x09, 0x31, 0x15, 0x81,
///     0x25, 0x7F, 0x75, 0x08, 0x95, 0x02, 0x81, 0x06,
/// ];
/// let reports = parse(&descriptor)?;
/// let x = &reports[0].fields[3];
/// assert_eq!(extract_field(x, &[0x00, 0xF6, 0x00]), -10);
/// # Ok::<(), hid2ps2::Error>(())
/// ```
pub fn parse(descriptor: &[u8]) -> Result<ReportTable> {
    let mut parser = Parser::new();
    let mut items = Items::new(descriptor);

    for item in items.by_ref() {
        match item.item_type {
            item_type::MAIN => parser.main(&item),
            item_type::GLOBAL => parser.global(&item),
            item_type::LOCAL => parser.local(&item),
            _ => {}
        }
        if parser.full {
            break;
        }
    }

    if items.truncated {
        #[cfg(feature = "defmt")]
        defmt::warn!("HID report descriptor truncated at byte {}", items.pos);
        if parser.reports.is_empty() {
            return Err(Error::TruncatedDescriptor);
        }
    }

    if parser.reports.iter().all(|r| r.fields.is_empty()) {
        return Err(Error::InvalidDescriptor);
    }

    Ok(parser.reports)
}

/// Read a field's value out of a report payload
///
/// Bits are little-endian; bytes past the end of `report` read as zero.
/// Values are sign-extended when the field's logical minimum is negative.
/// For a bitmap this reads its first bit; walk it with
/// [`ReportField::bitmap_usages`].
pub fn extract_field(field: &ReportField, report: &[u8]) -> i32 {
    let width = field.bit_width.clamp(1, 32) as u32;
    let mut value: u32 = 0;

    for bit in 0..width {
        let position = field.bit_offset as usize + bit as usize;
        let byte = report.get(position / 8).copied().unwrap_or(0);
        if byte & (1 << (position % 8)) != 0 {
            value |= 1 << bit;
        }
    }

    if field.is_signed() && width < 32 && value & (1 << (width - 1)) != 0 {
        value |= u32::MAX << width;
    }
    value as i32
}
