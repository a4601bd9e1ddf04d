use bytes::Buf as _;

use crate::varint;
use crate::{AdcError, AdcResult};

/// Read position over a byte slice with checked little-endian getters.
///
/// Every getter verifies the remaining length first and fails with
/// [`AdcError::Truncated`] instead of panicking. [`ByteCursor::split_to`] hands out
/// a cursor that can never read past a declared length.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails unless at least `needed` bytes remain.
    pub fn require(&self, needed: usize) -> AdcResult<()> {
        if needed > self.remaining() {
            return Err(AdcError::Truncated {
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn get_bytes(&mut self, n: usize) -> AdcResult<&'a [u8]> {
        self.require(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize) -> AdcResult<()> {
        self.get_bytes(n).map(|_| ())
    }

    /// Splits off the next `n` bytes as an independent cursor and advances past them.
    pub fn split_to(&mut self, n: usize) -> AdcResult<ByteCursor<'a>> {
        self.get_bytes(n).map(ByteCursor::new)
    }

    pub fn get_u8(&mut self) -> AdcResult<u8> {
        Ok(self.get_bytes(1)?[0])
    }

    pub fn get_u16(&mut self) -> AdcResult<u16> {
        Ok(self.get_bytes(2)?.get_u16_le())
    }

    pub fn get_i16(&mut self) -> AdcResult<i16> {
        Ok(self.get_bytes(2)?.get_i16_le())
    }

    pub fn get_u32(&mut self) -> AdcResult<u32> {
        Ok(self.get_bytes(4)?.get_u32_le())
    }

    pub fn get_i32(&mut self) -> AdcResult<i32> {
        Ok(self.get_bytes(4)?.get_i32_le())
    }

    pub fn get_f64(&mut self) -> AdcResult<f64> {
        Ok(self.get_bytes(8)?.get_f64_le())
    }

    /// Reads an `i16` length-prefixed string, replacing invalid UTF-8.
    pub fn get_string(&mut self) -> AdcResult<String> {
        let len = self.get_i16()?;
        let len = usize::try_from(len).map_err(|_| AdcError::ValueOutOfRange {
            what: "string length",
            value: i64::from(len),
        })?;
        Ok(String::from_utf8_lossy(self.get_bytes(len)?).into_owned())
    }

    pub fn get_count(&mut self) -> AdcResult<u64> {
        let rest = &self.data[self.pos..];
        let Some((value, used)) = varint::decode_count(rest) else {
            let needed = rest.first().map_or(1, |&b| varint::extra_bytes(b) + 1);
            return Err(AdcError::Truncated {
                needed,
                available: rest.len(),
            });
        };
        self.pos += used;
        Ok(value)
    }

    pub fn get_scount(&mut self) -> AdcResult<i64> {
        self.get_count().map(varint::unzigzag)
    }

    pub fn get_count32(&mut self) -> AdcResult<u32> {
        let value = self.get_count()?;
        u32::try_from(value).map_err(|_| AdcError::ValueOutOfRange {
            what: "32-bit count",
            value: value as i64,
        })
    }

    pub fn get_scount32(&mut self) -> AdcResult<i32> {
        let value = self.get_scount()?;
        i32::try_from(value).map_err(|_| AdcError::ValueOutOfRange {
            what: "32-bit signed count",
            value,
        })
    }
}
