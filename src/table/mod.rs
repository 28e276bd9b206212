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

//! Bucket tables storing fingerprints ("tags") for the cuckoo filter.
//!
//! A table is a power-of-two number of buckets, each holding [`TAGS_PER_BUCKET`] slots.
//! A slot holding `0` is empty, so tags stored in a table are never zero.
//!
//! Two encodings are available, selected with [`Encoding`]:
//!
//! - [`Encoding::Naive`] ([`SingleTable`]) packs every slot in exactly `bits_per_tag` bits.
//! - [`Encoding::SemiSorted`] ([`PackedTable`]) sorts each bucket by the low four bits of its
//!   tags and stores those nibbles jointly as a 12-bit codeword, using `bits_per_tag - 1` bits
//!   per slot.
//!
//! Table bytes are either owned or borrowed from the caller (for example a read-only memory
//! map). A borrowed table is copied into an owned buffer before its first mutation, so a
//! borrowed buffer is never written.

mod bits;
mod packed;
mod permutation;
mod single;

use std::borrow::Cow;

pub use self::packed::PackedTable;
pub use self::single::SingleTable;
use crate::error::Error;

/// Number of tag slots per bucket.
pub const TAGS_PER_BUCKET: usize = 4;

/// Outcome of inserting a tag into a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The tag took a free slot.
    Inserted,
    /// The bucket was full; the tag replaced a random occupant, which is returned.
    Evicted(u32),
    /// The bucket was full and eviction was not allowed.
    Full,
}

/// Storage contract shared by the bucket table encodings.
pub trait TagTable {
    /// Number of buckets, always a power of two.
    fn num_buckets(&self) -> usize;

    /// Width of a tag in bits.
    fn bits_per_tag(&self) -> u8;

    /// Exact size of the backing buffer in bytes.
    fn size_in_bytes(&self) -> usize;

    /// Total number of slots.
    fn size_in_tags(&self) -> usize {
        self.num_buckets() * TAGS_PER_BUCKET
    }

    /// Returns the four slots of `bucket`; empty slots read as `0`.
    fn read_bucket(&self, bucket: usize) -> [u32; TAGS_PER_BUCKET];

    /// Returns true if `tag` occupies a slot of bucket `i1` or bucket `i2`.
    fn find_tag_in_buckets(&self, i1: usize, i2: usize, tag: u32) -> bool {
        self.read_bucket(i1).contains(&tag) || self.read_bucket(i2).contains(&tag)
    }

    /// Stores `tag` in `bucket`.
    ///
    /// A free slot is used when one exists. Otherwise, if `kickout` is set, a slot chosen
    /// uniformly at random is overwritten and its previous tag returned for relocation.
    fn insert_tag_to_bucket(&mut self, bucket: usize, tag: u32, kickout: bool) -> InsertOutcome;

    /// Clears one slot of `bucket` holding `tag`; returns false if there is none.
    fn delete_tag_from_bucket(&mut self, bucket: usize, tag: u32) -> bool;

    /// Number of occupied slots in `bucket`.
    fn num_tags_in_bucket(&self, bucket: usize) -> usize {
        self.read_bucket(bucket).iter().filter(|t| **t != 0).count()
    }

    /// Number of occupied slots in the whole table.
    fn occupied_slots(&self) -> usize {
        (0..self.num_buckets())
            .map(|i| self.num_tags_in_bucket(i))
            .sum()
    }

    /// Checks that every bucket holds a decodable encoding.
    ///
    /// Tables built in memory always pass; persisted bytes are checked on load.
    fn check_buckets(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Raw table bytes, as persisted after the filter header.
    fn bytes(&self) -> &[u8];

    /// Human-readable summary of the table layout and occupancy.
    fn info(&self) -> String;
}

/// Physical encoding of a bucket table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Fixed-width slots; supports tag widths 1 to 32.
    #[default]
    Naive,
    /// Semi-sorted buckets with a shared codeword for the low nibbles; supports tag widths
    /// 5 to 32 and saves one bit per slot over [`Encoding::Naive`].
    SemiSorted,
}

impl Encoding {
    /// Checks that this encoding can store tags of `bits_per_tag` bits.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotSupported`](crate::error::ErrorKind::NotSupported) for an
    /// unsupported width.
    pub fn validate_bits_per_tag(self, bits_per_tag: u8) -> Result<(), Error> {
        let range = match self {
            Encoding::Naive => 1..=32,
            Encoding::SemiSorted => 5..=32,
        };
        if range.contains(&bits_per_tag) {
            Ok(())
        } else {
            Err(Error::not_supported(format!(
                "{self:?} encoding supports bits_per_item in [{}, {}]",
                range.start(),
                range.end()
            ))
            .with_context("bits_per_item", bits_per_tag))
        }
    }

    /// Bytes occupied by one bucket.
    pub fn bytes_per_bucket(self, bits_per_tag: u8) -> usize {
        let bits_per_bucket = match self {
            Encoding::Naive => bits_per_tag as usize * TAGS_PER_BUCKET,
            Encoding::SemiSorted => (bits_per_tag as usize - 1) * TAGS_PER_BUCKET,
        };
        bits_per_bucket.div_ceil(8)
    }

    /// Size of a table with `num_buckets` buckets, or `None` on overflow.
    pub fn table_size_in_bytes(self, num_buckets: usize, bits_per_tag: u8) -> Option<usize> {
        num_buckets.checked_mul(self.bytes_per_bucket(bits_per_tag))
    }
}

/// A bucket table of either encoding, selected at construction.
#[derive(Debug, Clone)]
pub enum Table<'a> {
    /// Naive fixed-width table.
    Single(SingleTable<'a>),
    /// Semi-sorted table.
    Packed(PackedTable<'a>),
}

impl Table<'static> {
    /// Allocates an empty table.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for an invalid width or bucket count, and `AllocationFailure` if
    /// the buffer cannot be reserved.
    pub fn new(encoding: Encoding, num_buckets: usize, bits_per_tag: u8) -> Result<Self, Error> {
        match encoding {
            Encoding::Naive => SingleTable::new(num_buckets, bits_per_tag).map(Table::Single),
            Encoding::SemiSorted => PackedTable::new(num_buckets, bits_per_tag).map(Table::Packed),
        }
    }
}

impl<'a> Table<'a> {
    /// Interprets `bytes` as a table; the bytes are used in place, never copied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if `bytes` does not have the exact expected length.
    pub fn from_bytes(
        encoding: Encoding,
        bytes: Cow<'a, [u8]>,
        num_buckets: usize,
        bits_per_tag: u8,
    ) -> Result<Self, Error> {
        match encoding {
            Encoding::Naive => {
                SingleTable::from_bytes(bytes, num_buckets, bits_per_tag).map(Table::Single)
            }
            Encoding::SemiSorted => {
                PackedTable::from_bytes(bytes, num_buckets, bits_per_tag).map(Table::Packed)
            }
        }
    }

    /// Returns the encoding of this table.
    pub fn encoding(&self) -> Encoding {
        match self {
            Table::Single(_) => Encoding::Naive,
            Table::Packed(_) => Encoding::SemiSorted,
        }
    }

    /// Returns true if the bytes are borrowed rather than owned.
    pub fn is_borrowed(&self) -> bool {
        match self {
            Table::Single(t) => t.is_borrowed(),
            Table::Packed(t) => t.is_borrowed(),
        }
    }
}

impl TagTable for Table<'_> {
    fn num_buckets(&self) -> usize {
        match self {
            Table::Single(t) => t.num_buckets(),
            Table::Packed(t) => t.num_buckets(),
        }
    }

    fn bits_per_tag(&self) -> u8 {
        match self {
            Table::Single(t) => t.bits_per_tag(),
            Table::Packed(t) => t.bits_per_tag(),
        }
    }

    fn size_in_bytes(&self) -> usize {
        match self {
            Table::Single(t) => t.size_in_bytes(),
            Table::Packed(t) => t.size_in_bytes(),
        }
    }

    fn read_bucket(&self, bucket: usize) -> [u32; TAGS_PER_BUCKET] {
        match self {
            Table::Single(t) => t.read_bucket(bucket),
            Table::Packed(t) => t.read_bucket(bucket),
        }
    }

    fn find_tag_in_buckets(&self, i1: usize, i2: usize, tag: u32) -> bool {
        match self {
            Table::Single(t) => t.find_tag_in_buckets(i1, i2, tag),
            Table::Packed(t) => t.find_tag_in_buckets(i1, i2, tag),
        }
    }

    fn insert_tag_to_bucket(&mut self, bucket: usize, tag: u32, kickout: bool) -> InsertOutcome {
        match self {
            Table::Single(t) => t.insert_tag_to_bucket(bucket, tag, kickout),
            Table::Packed(t) => t.insert_tag_to_bucket(bucket, tag, kickout),
        }
    }

    fn delete_tag_from_bucket(&mut self, bucket: usize, tag: u32) -> bool {
        match self {
            Table::Single(t) => t.delete_tag_from_bucket(bucket, tag),
            Table::Packed(t) => t.delete_tag_from_bucket(bucket, tag),
        }
    }

    fn check_buckets(&self) -> Result<(), Error> {
        match self {
            Table::Single(t) => t.check_buckets(),
            Table::Packed(t) => t.check_buckets(),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Table::Single(t) => t.bytes(),
            Table::Packed(t) => t.bytes(),
        }
    }

    fn info(&self) -> String {
        match self {
            Table::Single(t) => t.info(),
            Table::Packed(t) => t.info(),
        }
    }
}

fn validate_num_buckets(num_buckets: usize) -> Result<(), Error> {
    if num_buckets == 0 || !num_buckets.is_power_of_two() {
        return Err(Error::not_supported("num_buckets must be a non-zero power of two")
            .with_context("num_buckets", num_buckets));
    }
    Ok(())
}

fn allocate_table(
    encoding: Encoding,
    num_buckets: usize,
    bits_per_tag: u8,
) -> Result<Vec<u8>, Error> {
    encoding.validate_bits_per_tag(bits_per_tag)?;
    validate_num_buckets(num_buckets)?;
    let len = encoding
        .table_size_in_bytes(num_buckets, bits_per_tag)
        .ok_or_else(|| Error::allocation_failure(usize::MAX))?;

    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| Error::allocation_failure(len))?;
    bytes.resize(len, 0);
    Ok(bytes)
}

fn check_table_bytes(
    encoding: Encoding,
    bytes: &[u8],
    num_buckets: usize,
    bits_per_tag: u8,
) -> Result<(), Error> {
    encoding.validate_bits_per_tag(bits_per_tag)?;
    validate_num_buckets(num_buckets).map_err(|_| {
        Error::deserial("bucket count must be a non-zero power of two")
            .with_context("num_buckets", num_buckets)
    })?;
    let expected = encoding
        .table_size_in_bytes(num_buckets, bits_per_tag)
        .ok_or_else(|| Error::deserial("bucket count overflows the table size"))?;
    if bytes.len() != expected {
        return Err(Error::deserial("table length does not match the bucket count")
            .with_context("expected", expected)
            .with_context("actual", bytes.len()));
    }
    Ok(())
}

fn make_mut<'b>(bytes: &'b mut Cow<'_, [u8]>) -> &'b mut [u8] {
    if let Cow::Borrowed(borrowed) = bytes {
        log::debug!(
            "copying {} borrowed table bytes into an owned buffer before mutation",
            borrowed.len()
        );
    }
    bytes.to_mut()
}

#[inline]
fn random_slot() -> usize {
    rand::random_range(0..TAGS_PER_BUCKET)
}
