// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;

use byteorder::LE;
use byteorder::ReadBytesExt;

use crate::codec::FilterBytes;
use crate::cuckoo::FilterConfig;
use crate::error::Error;
use crate::hash::TwoIndependentMultiplyShift;

/// Size of the persisted header in bytes.
///
/// All fields are little-endian:
///
/// | Offset | Width | Field                          |
/// |--------|-------|--------------------------------|
/// | 0      | 8     | bucket count                   |
/// | 8      | 8     | item count                     |
/// | 16     | 8     | overflow bucket index          |
/// | 24     | 4     | overflow tag                   |
/// | 28     | 1     | overflow occupied flag (0 / 1) |
/// | 29     | 3     | zero padding                   |
/// | 32     | 16    | hash multiplier                |
/// | 48     | 16    | hash addend                    |
///
/// The table bytes start right after the header.
pub const HEADER_SIZE: usize = 64;

const VICTIM_PADDING: usize = 3;

/// A fingerprint parked in the overflow slot, with the bucket it was last headed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Victim {
    pub(super) index: usize,
    pub(super) tag: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Header {
    pub(super) num_buckets: usize,
    pub(super) num_items: usize,
    pub(super) victim: Option<Victim>,
    pub(super) hasher: TwoIndependentMultiplyShift,
}

impl Header {
    pub(super) fn encode(&self, bytes: &mut FilterBytes) {
        let start = bytes.len();
        bytes.write_u64_le(self.num_buckets as u64);
        bytes.write_u64_le(self.num_items as u64);
        match self.victim {
            Some(victim) => {
                bytes.write_u64_le(victim.index as u64);
                bytes.write_u32_le(victim.tag);
                bytes.write_u8(1);
            }
            None => {
                bytes.write_u64_le(0);
                bytes.write_u32_le(0);
                bytes.write_u8(0);
            }
        }
        bytes.write_zeros(VICTIM_PADDING);
        self.hasher.encode(bytes);
        debug_assert_eq!(bytes.len() - start, HEADER_SIZE);
    }

    pub(super) fn decode(bytes: &[u8]) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        if bytes.len() < HEADER_SIZE {
            return Err(Error::insufficient_data("header")
                .with_context("expected", HEADER_SIZE)
                .with_context("actual", bytes.len()));
        }

        let mut cursor = Cursor::new(bytes);
        let num_buckets = cursor.read_u64::<LE>().map_err(make_error("num_buckets"))?;
        let num_items = cursor.read_u64::<LE>().map_err(make_error("num_items"))?;
        let victim_index = cursor.read_u64::<LE>().map_err(make_error("victim_index"))?;
        let victim_tag = cursor.read_u32::<LE>().map_err(make_error("victim_tag"))?;
        let victim_used = cursor.read_u8().map_err(make_error("victim_used"))?;
        let mut padding = [0u8; VICTIM_PADDING];
        cursor
            .read_exact(&mut padding)
            .map_err(make_error("victim_padding"))?;
        let mut seed = [0u8; TwoIndependentMultiplyShift::SERIALIZED_SIZE];
        cursor.read_exact(&mut seed).map_err(make_error("hasher"))?;
        let hasher = TwoIndependentMultiplyShift::from_bytes(&seed)?;

        let num_buckets = usize::try_from(num_buckets).map_err(|_| {
            Error::deserial("bucket count does not fit in usize")
                .with_context("num_buckets", num_buckets)
        })?;
        let num_items = usize::try_from(num_items).map_err(|_| {
            Error::deserial("item count does not fit in usize").with_context("num_items", num_items)
        })?;
        let victim = match victim_used {
            0 => None,
            1 => {
                if victim_index >= num_buckets as u64 || victim_tag == 0 {
                    return Err(Error::deserial("overflow slot is out of range")
                        .with_context("victim_index", victim_index)
                        .with_context("victim_tag", victim_tag));
                }
                Some(Victim {
                    index: victim_index as usize,
                    tag: victim_tag,
                })
            }
            flag => {
                return Err(Error::deserial("invalid overflow flag").with_context("flag", flag));
            }
        };

        Ok(Self {
            num_buckets,
            num_items,
            victim,
            hasher,
        })
    }
}

/// Metadata of a persisted filter, read from the header alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedMetadata {
    /// Number of buckets.
    pub num_buckets: usize,
    /// Number of items counted by the filter.
    pub num_items: usize,
    /// Size of the table bytes following the header.
    pub data_size: usize,
}

impl SavedMetadata {
    fn from_header(header: &Header, config: FilterConfig) -> Result<Self, Error> {
        config.validate()?;
        let data_size = config
            .encoding
            .table_size_in_bytes(header.num_buckets, config.bits_per_item)
            .ok_or_else(|| {
                Error::deserial("bucket count overflows the table size")
                    .with_context("num_buckets", header.num_buckets)
            })?;
        Ok(Self {
            num_buckets: header.num_buckets,
            num_items: header.num_items,
            data_size,
        })
    }

    /// Size of the whole persisted filter: header plus table bytes.
    pub fn total_size(&self) -> usize {
        HEADER_SIZE + self.data_size
    }
}

/// Reads the metadata of a filter saved at `path` without loading its table.
///
/// Only the first [`HEADER_SIZE`] bytes of the file are read.
///
/// # Errors
///
/// Returns `InvalidData` if the file is shorter than the header or the header is malformed,
/// `NotSupported` for an invalid `config`, and `Unexpected` on I/O failures.
pub fn inspect(path: impl AsRef<Path>, config: FilterConfig) -> Result<SavedMetadata, Error> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|err| {
        Error::io("failed to open filter file", err).with_context("path", path.display())
    })?;

    let mut header = [0u8; HEADER_SIZE];
    if let Err(err) = file.read_exact(&mut header) {
        return Err(match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::insufficient_data("header"),
            _ => Error::io("failed to read filter header", err),
        }
        .with_context("path", path.display()));
    }
    inspect_bytes(&header, config)
}

/// Reads the metadata of a serialized filter from the start of `bytes`.
///
/// # Examples
///
/// ```
/// use cuckoofilter::cuckoo::CuckooFilter;
/// use cuckoofilter::cuckoo::FilterConfig;
/// use cuckoofilter::cuckoo::inspect_bytes;
///
/// let mut filter = CuckooFilter::builder().bits_per_item(8).build(100).unwrap();
/// let _ = filter.add(7);
///
/// let meta = inspect_bytes(&filter.serialize(), FilterConfig::new(8)).unwrap();
/// assert_eq!(meta.num_buckets, filter.num_buckets());
/// assert_eq!(meta.num_items, 1);
/// assert_eq!(meta.data_size, filter.size_in_bytes());
/// ```
pub fn inspect_bytes(bytes: &[u8], config: FilterConfig) -> Result<SavedMetadata, Error> {
    let header = Header::decode(bytes)?;
    SavedMetadata::from_header(&header, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample_header() -> Header {
        Header {
            num_buckets: 1024,
            num_items: 3000,
            victim: Some(Victim {
                index: 77,
                tag: 0xabc,
            }),
            hasher: TwoIndependentMultiplyShift::with_coefficients(
                0x0102_0304_0506_0708_090a_0b0c_0d0e_0f10,
                0x1112_1314_1516_1718_191a_1b1c_1d1e_1f20,
            ),
        }
    }

    #[test]
    fn test_header_byte_offsets() {
        let mut bytes = FilterBytes::with_capacity(HEADER_SIZE);
        sample_header().encode(&mut bytes);
        let bytes = bytes.into_bytes();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..8], &1024u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &3000u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &77u64.to_le_bytes());
        assert_eq!(&bytes[24..28], &0xabcu32.to_le_bytes());
        assert_eq!(bytes[28], 1);
        assert_eq!(&bytes[29..32], &[0, 0, 0]);
        assert_eq!(bytes[32], 0x10);
        assert_eq!(bytes[48], 0x20);

        assert_eq!(Header::decode(&bytes).unwrap(), sample_header());
    }

    #[test]
    fn test_truncated_header_fails_fast() {
        let mut bytes = FilterBytes::with_capacity(HEADER_SIZE);
        sample_header().encode(&mut bytes);
        let bytes = bytes.into_bytes();

        for len in [0, 8, 31, HEADER_SIZE - 1] {
            let err = Header::decode(&bytes[..len]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidData);
            assert!(err.message().starts_with("insufficient data"));
        }
    }

    #[test]
    fn test_corrupt_overflow_slot_is_rejected() {
        let mut bytes = FilterBytes::with_capacity(HEADER_SIZE);
        sample_header().encode(&mut bytes);
        let mut bytes = bytes.into_bytes();

        bytes[28] = 2;
        let err = Header::decode(&bytes).unwrap_err();
        assert_eq!(err.message(), "invalid overflow flag");

        bytes[28] = 1;
        bytes[16..24].copy_from_slice(&4096u64.to_le_bytes());
        let err = Header::decode(&bytes).unwrap_err();
        assert_eq!(err.message(), "overflow slot is out of range");
    }

    #[test]
    fn test_metadata_from_header() {
        let mut bytes = FilterBytes::with_capacity(HEADER_SIZE);
        sample_header().encode(&mut bytes);
        let bytes = bytes.into_bytes();

        let meta = inspect_bytes(&bytes, FilterConfig::new(12)).unwrap();
        assert_eq!(meta.num_buckets, 1024);
        assert_eq!(meta.num_items, 3000);
        assert_eq!(meta.data_size, 1024 * 6);
        assert_eq!(meta.total_size(), HEADER_SIZE + 1024 * 6);

        let meta = inspect_bytes(&bytes, FilterConfig::semi_sorted(13)).unwrap();
        assert_eq!(meta.data_size, 1024 * 6);
    }
}
