//! Length-framed, typed, versioned records ("items") and their nesting.

use std::ops::{Deref, DerefMut};

use bytes::Bytes;

use crate::{AdcError, AdcResult, ByteBuffer, ByteCursor};

/// Marker preceding every top-level item (little-endian byte order).
pub const SYNC_MARKER: u32 = 0xD41F_8A37;

/// Item type of integrated ADC sums.
pub const TYPE_ADC_SUMS: u32 = 2012;
/// Item type of sampled ADC traces.
pub const TYPE_ADC_SAMPLES: u32 = 2013;

/// Highest version the 12-bit version field can carry.
pub const MAX_ITEM_VERSION: u32 = 0xFFF;

const USER_FLAG: u32 = 1 << 16;
const EXTENDED_FLAG: u32 = 1 << 17;
const ONLY_SUB_ITEMS: u32 = 1 << 30;
const LENGTH_MASK: u32 = 0x3FFF_FFFF;
const LENGTH_BITS: u32 = 30;
const EXTENDED_MASK: u32 = 0xFFF;

/// Decoded item header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemHeader {
    pub item_type: u32,
    pub version: u32,
    pub user_flag: bool,
    pub ident: i32,
    pub only_sub_items: bool,
    /// Length of the body in bytes.
    pub length: usize,
}

impl ItemHeader {
    /// Parses a header, including the sync marker for top-level items.
    pub fn parse(cursor: &mut ByteCursor<'_>, top_level: bool) -> AdcResult<Self> {
        if top_level {
            let sync = cursor.get_u32()?;
            if sync != SYNC_MARKER {
                return Err(AdcError::BadSync(sync));
            }
        }
        let type_word = cursor.get_u32()?;
        let ident = cursor.get_i32()?;
        let length_word = cursor.get_u32()?;
        let mut length = (length_word & LENGTH_MASK) as usize;
        if type_word & EXTENDED_FLAG != 0 {
            let extension = cursor.get_u32()? & EXTENDED_MASK;
            length |= (extension as usize) << LENGTH_BITS;
        }
        Ok(ItemHeader {
            item_type: type_word & 0xFFFF,
            version: type_word >> 20,
            user_flag: type_word & USER_FLAG != 0,
            ident,
            only_sub_items: length_word & ONLY_SUB_ITEMS != 0,
            length,
        })
    }
}

#[derive(Debug)]
struct OpenItem {
    type_pos: usize,
    type_word: u32,
    length_pos: usize,
    body_start: usize,
}

/// Serializes items into a growing buffer.
///
/// Items are opened and closed in strict LIFO order; the body length is
/// back-patched when an item is closed. Primitive writes go to the innermost
/// open item through [`Deref`] to [`ByteBuffer`].
#[derive(Debug, Default)]
pub struct ItemWriter {
    buf: ByteBuffer,
    open: Vec<OpenItem>,
}

impl ItemWriter {
    pub fn new() -> Self {
        ItemWriter::default()
    }

    /// Number of currently open items.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn begin_item(&mut self, item_type: u32, version: u32, ident: i32) -> AdcResult<()> {
        if version > MAX_ITEM_VERSION {
            return Err(AdcError::ValueOutOfRange {
                what: "item version",
                value: i64::from(version),
            });
        }
        if self.open.is_empty() {
            self.buf.put_u32(SYNC_MARKER);
        }
        let type_pos = self.buf.len();
        let type_word = (item_type & 0xFFFF) | (version << 20);
        self.buf.put_u32(type_word);
        self.buf.put_i32(ident);
        let length_pos = self.buf.len();
        self.buf.put_u32(0);
        self.open.push(OpenItem {
            type_pos,
            type_word,
            length_pos,
            body_start: self.buf.len(),
        });
        Ok(())
    }

    /// Closes the innermost open item.
    pub fn end_item(&mut self) -> AdcResult<()> {
        let item = self
            .open
            .pop()
            .ok_or(AdcError::UnbalancedItems("end_item without open item"))?;
        let length = self.buf.len() - item.body_start;
        if length >> (LENGTH_BITS + 12) != 0 {
            return Err(AdcError::ItemTooLarge(length));
        }
        self.buf.patch_u32(item.length_pos, length as u32 & LENGTH_MASK);
        if length > LENGTH_MASK as usize {
            self.buf
                .patch_u32(item.type_pos, item.type_word | EXTENDED_FLAG);
            let body = self.buf.buffer.split_off(item.body_start);
            self.buf.put_u32((length >> LENGTH_BITS) as u32);
            self.buf.buffer.unsplit(body);
        }
        Ok(())
    }

    /// Returns the serialized items; fails while any item is still open.
    pub fn finish(self) -> AdcResult<Bytes> {
        if !self.open.is_empty() {
            return Err(AdcError::UnbalancedItems("finish with open items"));
        }
        Ok(self.buf.freeze())
    }
}

impl Deref for ItemWriter {
    type Target = ByteBuffer;

    fn deref(&self) -> &ByteBuffer {
        &self.buf
    }
}

impl DerefMut for ItemWriter {
    fn deref_mut(&mut self) -> &mut ByteBuffer {
        &mut self.buf
    }
}

/// One parsed item: its header and a cursor restricted to its body.
#[derive(Debug, Clone, Copy)]
pub struct Item<'a> {
    pub header: ItemHeader,
    pub body: ByteCursor<'a>,
}

impl<'a> Item<'a> {
    /// Parses the next item and advances `cursor` past its whole body.
    pub fn parse(cursor: &mut ByteCursor<'a>, top_level: bool) -> AdcResult<Self> {
        let header = ItemHeader::parse(cursor, top_level)?;
        let body = cursor.split_to(header.length)?;
        Ok(Item { header, body })
    }

    /// Next item nested in this body, if any bytes remain.
    pub fn next_sub_item(&mut self) -> AdcResult<Option<Item<'a>>> {
        if self.body.is_empty() {
            return Ok(None);
        }
        Item::parse(&mut self.body, false).map(Some)
    }

    pub fn expect_type(&self, expected: u32) -> AdcResult<()> {
        if self.header.item_type != expected {
            return Err(AdcError::WrongItemType {
                expected,
                found: self.header.item_type,
            });
        }
        Ok(())
    }
}

/// Iterates over the top-level items of a byte stream.
///
/// Stops after the first error, since the stream position is then unknown.
#[derive(Debug)]
pub struct ItemReader<'a> {
    cursor: ByteCursor<'a>,
    failed: bool,
}

impl<'a> ItemReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ItemReader {
            cursor: ByteCursor::new(data),
            failed: false,
        }
    }
}

impl<'a> Iterator for ItemReader<'a> {
    type Item = AdcResult<Item<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_empty() {
            return None;
        }
        let item = Item::parse(&mut self.cursor, true);
        self.failed = item.is_err();
        Some(item)
    }
}
