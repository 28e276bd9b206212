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

use std::borrow::Cow;
use std::fs::File;
use std::hash::Hash;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use crate::codec::FilterBytes;
use crate::cuckoo::DEFAULT_MAX_KICKS;
use crate::cuckoo::FilterConfig;
use crate::cuckoo::serialization::HEADER_SIZE;
use crate::cuckoo::serialization::Header;
use crate::cuckoo::serialization::Victim;
use crate::error::Error;
use crate::hash::TwoIndependentMultiplyShift;
use crate::hash::hash_item;
use crate::table::Encoding;
use crate::table::InsertOutcome;
use crate::table::Table;
use crate::table::TagTable;

// MurmurHash2 mixing constant; odd, so `tag * ALT_INDEX_MULTIPLIER` is a permutation of tags
const ALT_INDEX_MULTIPLIER: u32 = 0x5bd1_e995;

/// Result of a per-key filter operation.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation succeeded, or the key is possibly present.
    Ok,
    /// The key is definitely absent, or there was nothing to delete.
    NotFound,
    /// The overflow slot is occupied; the filter accepts no more keys until a delete.
    NotEnoughSpace,
    /// The operation is not supported by this filter configuration.
    NotSupported,
}

impl Status {
    /// Returns true for [`Status::Ok`].
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// Cuckoo filter over 64-bit keys.
///
/// A filter either owns its table bytes or borrows them from the caller (see
/// [`wrap`](Self::wrap)); the lifetime `'a` is that of the borrowed buffer. Filters built
/// or loaded through an owned buffer are `CuckooFilter<'static>`.
///
/// # Examples
///
/// ```
/// use cuckoofilter::cuckoo::CuckooFilter;
/// use cuckoofilter::cuckoo::Status;
///
/// let mut filter = CuckooFilter::builder().bits_per_item(16).build(1_000).unwrap();
/// for key in 0..1_000 {
///     assert_eq!(filter.add(key), Status::Ok);
/// }
/// assert_eq!(filter.size(), 1_000);
/// assert!((0..1_000).all(|key| filter.contains(key).is_ok()));
/// ```
#[derive(Debug, Clone)]
pub struct CuckooFilter<'a> {
    table: Table<'a>,
    /// Fingerprints stored in the table; a parked victim is not counted.
    num_items: usize,
    victim: Option<Victim>,
    hasher: TwoIndependentMultiplyShift,
    max_kicks: u32,
}

impl<'a> CuckooFilter<'a> {
    pub(super) fn make(table: Table<'a>, hasher: TwoIndependentMultiplyShift, max_kicks: u32) -> Self {
        Self {
            table,
            num_items: 0,
            victim: None,
            hasher,
            max_kicks,
        }
    }

    // ========================================================================
    // Per-key Operations
    // ========================================================================

    /// Adds a key.
    ///
    /// Returns [`Status::NotEnoughSpace`] without touching the table if the overflow slot is
    /// occupied. Otherwise the key is placed, possibly after relocating other fingerprints,
    /// and [`Status::Ok`] is returned. When relocation runs out of rounds the last displaced
    /// fingerprint is parked in the overflow slot; the insert still reports `Ok` and the item
    /// counter is left unchanged in that case.
    pub fn add(&mut self, key: u64) -> Status {
        if self.victim.is_some() {
            return Status::NotEnoughSpace;
        }

        let (index, tag) = self.index_and_tag(key);
        self.add_impl(index, tag);
        Status::Ok
    }

    /// Reports whether a key is possibly present.
    ///
    /// [`Status::Ok`] may be a false positive; [`Status::NotFound`] is always correct.
    pub fn contains(&self, key: u64) -> Status {
        let (i1, tag) = self.index_and_tag(key);
        let i2 = self.alt_index(i1, tag);
        debug_assert_eq!(i1, self.alt_index(i2, tag));

        if self.victim_matches(i1, i2, tag) || self.table.find_tag_in_buckets(i1, i2, tag) {
            Status::Ok
        } else {
            Status::NotFound
        }
    }

    /// Deletes one occurrence of a key's fingerprint.
    ///
    /// After removing a fingerprint from the table, a parked victim gets another relocation
    /// attempt. Deleting a key that was never added may succeed when another key shares its
    /// fingerprint and buckets.
    pub fn delete(&mut self, key: u64) -> Status {
        let (i1, tag) = self.index_and_tag(key);
        let i2 = self.alt_index(i1, tag);

        if self.table.delete_tag_from_bucket(i1, tag) || self.table.delete_tag_from_bucket(i2, tag)
        {
            self.num_items -= 1;
            if let Some(victim) = self.victim.take() {
                self.add_impl(victim.index, victim.tag);
            }
            return Status::Ok;
        }

        if self.victim_matches(i1, i2, tag) {
            // the victim was never counted
            self.victim = None;
            return Status::Ok;
        }

        Status::NotFound
    }

    /// Adds any hashable item, see [`hash_item`].
    pub fn add_item<T: Hash + ?Sized>(&mut self, item: &T) -> Status {
        self.add(hash_item(item))
    }

    /// Reports whether any hashable item is possibly present, see [`hash_item`].
    pub fn contains_item<T: Hash + ?Sized>(&self, item: &T) -> Status {
        self.contains(hash_item(item))
    }

    /// Deletes any hashable item, see [`hash_item`].
    pub fn delete_item<T: Hash + ?Sized>(&mut self, item: &T) -> Status {
        self.delete(hash_item(item))
    }

    fn add_impl(&mut self, index: usize, tag: u32) {
        let mut cur_index = index;
        let mut cur_tag = tag;

        for count in 0..self.max_kicks {
            let kickout = count > 0;
            match self.table.insert_tag_to_bucket(cur_index, cur_tag, kickout) {
                InsertOutcome::Inserted => {
                    self.num_items += 1;
                    return;
                }
                InsertOutcome::Evicted(old_tag) => cur_tag = old_tag,
                InsertOutcome::Full => {}
            }
            cur_index = self.alt_index(cur_index, cur_tag);
        }

        log::warn!(
            "cuckoo filter relocation gave up after {} rounds at {} items; parking tag {cur_tag:#x} \
             for bucket {cur_index} in the overflow slot",
            self.max_kicks,
            self.num_items
        );
        self.victim = Some(Victim {
            index: cur_index,
            tag: cur_tag,
        });
    }

    fn victim_matches(&self, i1: usize, i2: usize, tag: u32) -> bool {
        self.victim
            .is_some_and(|v| v.tag == tag && (v.index == i1 || v.index == i2))
    }

    // ========================================================================
    // Index and Fingerprint Derivation
    // ========================================================================

    #[inline]
    fn index_hash(&self, hv: u32) -> usize {
        // the bucket count is a power of two
        hv as usize & (self.table.num_buckets() - 1)
    }

    #[inline]
    fn tag_hash(&self, hv: u32) -> u32 {
        let mask = ((1u64 << self.table.bits_per_tag()) - 1) as u32;
        let tag = hv & mask;
        tag + (tag == 0) as u32
    }

    #[inline]
    fn index_and_tag(&self, key: u64) -> (usize, u32) {
        let hash = self.hasher.hash(key);
        (self.index_hash((hash >> 32) as u32), self.tag_hash(hash as u32))
    }

    #[inline]
    fn alt_index(&self, index: usize, tag: u32) -> usize {
        (index ^ tag.wrapping_mul(ALT_INDEX_MULTIPLIER) as usize) & (self.table.num_buckets() - 1)
    }

    // ========================================================================
    // Statistics and Properties
    // ========================================================================

    /// Number of items counted by the filter.
    pub fn size(&self) -> usize {
        self.num_items
    }

    /// Returns true if no item is stored, including the overflow slot.
    pub fn is_empty(&self) -> bool {
        self.num_items == 0 && self.victim.is_none()
    }

    /// Size of the bucket table in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.table.size_in_bytes()
    }

    /// Number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.table.num_buckets()
    }

    /// Total number of fingerprint slots.
    pub fn capacity_in_slots(&self) -> usize {
        self.table.size_in_tags()
    }

    /// Fingerprint width in bits.
    pub fn bits_per_item(&self) -> u8 {
        self.table.bits_per_tag()
    }

    /// Bucket encoding.
    pub fn encoding(&self) -> Encoding {
        self.table.encoding()
    }

    /// Width and encoding, as needed to read the filter back.
    pub fn config(&self) -> FilterConfig {
        FilterConfig {
            bits_per_item: self.bits_per_item(),
            encoding: self.encoding(),
        }
    }

    /// The hash function of this filter.
    pub fn hasher(&self) -> &TwoIndependentMultiplyShift {
        &self.hasher
    }

    /// Maximum relocation rounds per insertion.
    pub fn max_kicks(&self) -> u32 {
        self.max_kicks
    }

    /// Returns true while a fingerprint is parked in the overflow slot.
    pub fn has_overflow(&self) -> bool {
        self.victim.is_some()
    }

    /// Returns true if the table bytes are borrowed from the caller.
    pub fn is_borrowed(&self) -> bool {
        self.table.is_borrowed()
    }

    /// Fraction of slots occupied.
    pub fn load_factor(&self) -> f64 {
        self.num_items as f64 / self.table.size_in_tags() as f64
    }

    /// Table bits spent per stored item, or `None` for an empty filter.
    pub fn bits_per_item_achieved(&self) -> Option<f64> {
        if self.num_items == 0 {
            None
        } else {
            Some(8.0 * self.table.size_in_bytes() as f64 / self.num_items as f64)
        }
    }

    /// Checks the structural invariants of the filter.
    ///
    /// Construction already fails with an [`Error`] when the table cannot be allocated or
    /// persisted bytes are inconsistent, so this holds for every filter obtained from this
    /// crate. It scans the whole table.
    pub fn is_valid(&self) -> bool {
        let num_buckets = self.table.num_buckets();
        let expected_bytes = self
            .encoding()
            .table_size_in_bytes(num_buckets, self.bits_per_item());
        num_buckets.is_power_of_two()
            && expected_bytes == Some(self.table.size_in_bytes())
            && self.table.check_buckets().is_ok()
            && self.num_items == self.table.occupied_slots()
            && self
                .victim
                .is_none_or(|v| v.index < num_buckets && v.tag != 0)
    }

    /// Human-readable summary of the filter.
    pub fn info(&self) -> String {
        let bits_per_key = match self.bits_per_item_achieved() {
            Some(bits) => format!("{bits}"),
            None => "N/A".to_string(),
        };
        format!(
            "CuckooFilter Status:\n\
             \t\t{}\n\
             \t\tKeys stored: {}\n\
             \t\tLoad factor: {}\n\
             \t\tHashtable size: {} bytes\n\
             \t\tOverflow slot: {}\n\
             \t\tbit/key:   {}\n",
            self.table.info(),
            self.size(),
            self.load_factor(),
            self.table.size_in_bytes(),
            if self.has_overflow() { "occupied" } else { "free" },
            bits_per_key,
        )
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    fn header(&self) -> Header {
        Header {
            num_buckets: self.table.num_buckets(),
            num_items: self.num_items,
            victim: self.victim,
            hasher: self.hasher,
        }
    }

    /// Serializes the filter: the header followed by the raw table bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use cuckoofilter::cuckoo::CuckooFilter;
    /// use cuckoofilter::cuckoo::Status;
    ///
    /// let mut filter = CuckooFilter::builder().build(100).unwrap();
    /// let _ = filter.add(7);
    ///
    /// let bytes = filter.serialize();
    /// let restored = CuckooFilter::from_bytes(bytes, filter.config()).unwrap();
    /// assert_eq!(restored.contains(7), Status::Ok);
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = FilterBytes::with_capacity(HEADER_SIZE + self.table.size_in_bytes());
        self.header().encode(&mut bytes);
        bytes.write(self.table.bytes());
        bytes.into_bytes()
    }

    /// Writes the serialized filter to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let mut header = FilterBytes::with_capacity(HEADER_SIZE);
        self.header().encode(&mut header);
        writer.write_all(&header.into_bytes())?;
        writer.write_all(self.table.bytes())?;
        writer.flush()
    }

    /// Saves the filter to a file, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` with the I/O error as source if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| {
            Error::io("failed to create filter file", err).with_context("path", path.display())
        })?;
        self.write_to(BufWriter::new(file)).map_err(|err| {
            Error::io("failed to write filter file", err).with_context("path", path.display())
        })?;
        log::debug!(
            "saved cuckoo filter with {} items to {}",
            self.num_items,
            path.display()
        );
        Ok(())
    }

    /// Wraps a serialized filter in place, without copying the table bytes.
    ///
    /// The buffer is typically a read-only memory map and must outlive the filter. It is
    /// never written: the first `add` or `delete` that changes the table copies it into an
    /// owned buffer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the buffer is shorter than the header, its length does not
    /// match the bucket count for `config`, a bucket does not decode, or the item count
    /// disagrees with the occupied slots; `NotSupported` if `config` is invalid.
    pub fn wrap(bytes: &'a [u8], config: FilterConfig) -> Result<Self, Error> {
        let header = Header::decode(bytes)?;
        Self::from_parts(header, Cow::Borrowed(&bytes[HEADER_SIZE..]), config)
    }

    fn from_parts(
        header: Header,
        table_bytes: Cow<'a, [u8]>,
        config: FilterConfig,
    ) -> Result<Self, Error> {
        let table = Table::from_bytes(
            config.encoding,
            table_bytes,
            header.num_buckets,
            config.bits_per_item,
        )?;

        // the overflow slot is never counted, so the counter matches the table exactly
        let occupied = table.occupied_slots();
        if header.num_items != occupied {
            return Err(Error::deserial("item count does not match the occupied slots")
                .with_context("num_items", header.num_items)
                .with_context("occupied", occupied));
        }
        if let Some(victim) = header.victim {
            if config.bits_per_item < 32 && victim.tag >> config.bits_per_item != 0 {
                return Err(Error::deserial("overflow tag is wider than bits_per_item")
                    .with_context("victim_tag", victim.tag)
                    .with_context("bits_per_item", config.bits_per_item));
            }
        }

        log::debug!(
            "loaded cuckoo filter: {} buckets, {} items, {} table bytes{}",
            header.num_buckets,
            header.num_items,
            table.size_in_bytes(),
            if table.is_borrowed() { " (borrowed)" } else { "" }
        );
        Ok(Self {
            table,
            num_items: header.num_items,
            victim: header.victim,
            hasher: header.hasher,
            max_kicks: DEFAULT_MAX_KICKS,
        })
    }
}

impl CuckooFilter<'static> {
    /// Reads a filter saved with [`save`](CuckooFilter::save); the filter owns the bytes.
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` if the file cannot be read, and the errors of
    /// [`from_bytes`](Self::from_bytes) otherwise.
    pub fn load(path: impl AsRef<Path>, config: FilterConfig) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| {
            Error::io("failed to read filter file", err).with_context("path", path.display())
        })?;
        Self::from_bytes(bytes, config)
    }

    /// Takes ownership of a serialized filter.
    ///
    /// # Errors
    ///
    /// See [`wrap`](CuckooFilter::wrap).
    pub fn from_bytes(mut bytes: Vec<u8>, config: FilterConfig) -> Result<Self, Error> {
        let header = Header::decode(&bytes)?;
        bytes.drain(..HEADER_SIZE);
        Self::from_parts(header, Cow::Owned(bytes), config)
    }
}
