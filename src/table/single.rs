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

use crate::error::Error;
use crate::table::Encoding;
use crate::table::InsertOutcome;
use crate::table::TAGS_PER_BUCKET;
use crate::table::TagTable;
use crate::table::allocate_table;
use crate::table::bits::read_bits;
use crate::table::bits::write_bits;
use crate::table::check_table_bytes;
use crate::table::make_mut;
use crate::table::random_slot;

/// Bucket table storing each tag in exactly `bits_per_tag` bits.
///
/// Slots of a bucket are laid out back to back starting at the bucket's first byte; a bucket
/// is padded to a whole number of bytes.
#[derive(Debug, Clone)]
pub struct SingleTable<'a> {
    bytes: Cow<'a, [u8]>,
    num_buckets: usize,
    bits_per_tag: u8,
    bytes_per_bucket: usize,
}

impl SingleTable<'static> {
    /// Allocates an empty table with `num_buckets` buckets.
    pub fn new(num_buckets: usize, bits_per_tag: u8) -> Result<Self, Error> {
        let bytes = allocate_table(Encoding::Naive, num_buckets, bits_per_tag)?;
        Ok(Self::make(Cow::Owned(bytes), num_buckets, bits_per_tag))
    }
}

impl<'a> SingleTable<'a> {
    /// Interprets existing table bytes without copying them.
    pub fn from_bytes(
        bytes: Cow<'a, [u8]>,
        num_buckets: usize,
        bits_per_tag: u8,
    ) -> Result<Self, Error> {
        check_table_bytes(Encoding::Naive, &bytes, num_buckets, bits_per_tag)?;
        Ok(Self::make(bytes, num_buckets, bits_per_tag))
    }

    fn make(bytes: Cow<'a, [u8]>, num_buckets: usize, bits_per_tag: u8) -> Self {
        Self {
            bytes,
            num_buckets,
            bits_per_tag,
            bytes_per_bucket: Encoding::Naive.bytes_per_bucket(bits_per_tag),
        }
    }

    /// Returns true if the bytes are borrowed rather than owned.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.bytes, Cow::Borrowed(_))
    }

    #[inline]
    fn bit_pos(&self, bucket: usize, slot: usize) -> usize {
        debug_assert!(bucket < self.num_buckets);
        debug_assert!(slot < TAGS_PER_BUCKET);
        bucket * self.bytes_per_bucket * 8 + slot * self.bits_per_tag as usize
    }

    #[inline]
    fn read_tag(&self, bucket: usize, slot: usize) -> u32 {
        read_bits(
            &self.bytes,
            self.bit_pos(bucket, slot),
            self.bits_per_tag as u32,
        )
    }

    #[inline]
    fn write_tag(&mut self, bucket: usize, slot: usize, tag: u32) {
        let pos = self.bit_pos(bucket, slot);
        let width = self.bits_per_tag as u32;
        write_bits(make_mut(&mut self.bytes), pos, width, tag);
    }
}

impl TagTable for SingleTable<'_> {
    fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    fn bits_per_tag(&self) -> u8 {
        self.bits_per_tag
    }

    fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    fn read_bucket(&self, bucket: usize) -> [u32; TAGS_PER_BUCKET] {
        std::array::from_fn(|slot| self.read_tag(bucket, slot))
    }

    fn find_tag_in_buckets(&self, i1: usize, i2: usize, tag: u32) -> bool {
        (0..TAGS_PER_BUCKET)
            .any(|slot| self.read_tag(i1, slot) == tag || self.read_tag(i2, slot) == tag)
    }

    fn insert_tag_to_bucket(&mut self, bucket: usize, tag: u32, kickout: bool) -> InsertOutcome {
        debug_assert_ne!(tag, 0);
        if let Some(slot) = (0..TAGS_PER_BUCKET).find(|slot| self.read_tag(bucket, *slot) == 0) {
            self.write_tag(bucket, slot, tag);
            return InsertOutcome::Inserted;
        }
        if !kickout {
            return InsertOutcome::Full;
        }

        let slot = random_slot();
        let old_tag = self.read_tag(bucket, slot);
        self.write_tag(bucket, slot, tag);
        InsertOutcome::Evicted(old_tag)
    }

    fn delete_tag_from_bucket(&mut self, bucket: usize, tag: u32) -> bool {
        match (0..TAGS_PER_BUCKET).find(|slot| self.read_tag(bucket, *slot) == tag) {
            Some(slot) => {
                self.write_tag(bucket, slot, 0);
                true
            }
            None => false,
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn info(&self) -> String {
        format!(
            "SingleHashtable with tag size: {} bits \n\
             \t\tAssociativity: {}\n\
             \t\tTotal # of rows: {}\n\
             \t\tTotal # slots: {}\n\
             \t\tOccupied slots: {}",
            self.bits_per_tag,
            TAGS_PER_BUCKET,
            self.num_buckets,
            self.size_in_tags(),
            self.occupied_slots()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_insertion_ordered() {
        let mut table = SingleTable::new(8, 12).unwrap();
        for tag in [0xabc, 0x001, 0xfff] {
            assert_eq!(table.insert_tag_to_bucket(3, tag, false), InsertOutcome::Inserted);
        }
        assert_eq!(table.read_bucket(3), [0xabc, 0x001, 0xfff, 0]);
        assert_eq!(table.read_bucket(2), [0; 4]);
        assert_eq!(table.read_bucket(4), [0; 4]);

        assert!(table.delete_tag_from_bucket(3, 0x001));
        assert_eq!(table.read_bucket(3), [0xabc, 0, 0xfff, 0]);
        assert_eq!(table.insert_tag_to_bucket(3, 0x002, false), InsertOutcome::Inserted);
        assert_eq!(table.read_bucket(3), [0xabc, 0x002, 0xfff, 0]);
    }

    #[test]
    fn test_kickout_replaces_an_occupant() {
        let mut table = SingleTable::new(2, 8).unwrap();
        let tags = [11, 22, 33, 44];
        for tag in tags {
            table.insert_tag_to_bucket(1, tag, false);
        }
        match table.insert_tag_to_bucket(1, 55, true) {
            InsertOutcome::Evicted(old) => {
                assert!(tags.contains(&old));
                let bucket = table.read_bucket(1);
                assert!(bucket.contains(&55));
                assert!(!bucket.contains(&old));
            }
            other => panic!("expected eviction, got {other:?}"),
        }
        assert_eq!(table.num_tags_in_bucket(1), 4);
        assert_eq!(table.num_tags_in_bucket(0), 0);
    }

    #[test]
    fn test_kickout_picks_random_slots() {
        let mut seen = [false; TAGS_PER_BUCKET];
        for _ in 0..200 {
            let mut table = SingleTable::new(1, 4).unwrap();
            for tag in 1..=4 {
                table.insert_tag_to_bucket(0, tag, false);
            }
            if let InsertOutcome::Evicted(old) = table.insert_tag_to_bucket(0, 9, true) {
                seen[old as usize - 1] = true;
            }
        }
        assert_eq!(seen, [true; TAGS_PER_BUCKET]);
    }

    #[test]
    fn test_two_bit_tags_share_a_byte() {
        let mut table = SingleTable::new(4, 2).unwrap();
        assert_eq!(table.size_in_bytes(), 4);
        for tag in [1, 2, 3, 1] {
            table.insert_tag_to_bucket(2, tag, false);
        }
        assert_eq!(table.bytes(), &[0, 0, 0b01_11_10_01, 0]);
        assert!(table.find_tag_in_buckets(0, 2, 3));
    }

    #[test]
    fn test_info_reports_occupancy() {
        let mut table = SingleTable::new(4, 16).unwrap();
        table.insert_tag_to_bucket(0, 1, false);
        let info = table.info();
        assert!(info.contains("tag size: 16 bits"));
        assert!(info.contains("Total # slots: 16"));
        assert!(info.contains("Occupied slots: 1"));
    }
}
