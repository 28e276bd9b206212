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
use crate::table::permutation::CODE_BITS;
use crate::table::permutation::NUM_CODES;
use crate::table::permutation::perm_encoding;
use crate::table::random_slot;

const DIR_BITS_PER_TAG: u32 = 4;
const DIR_BITS_MASK: u32 = (1 << DIR_BITS_PER_TAG) - 1;

/// Semi-sorted bucket table.
///
/// Each bucket keeps its tags ordered by their low four bits. Those four nibbles form a
/// non-decreasing sequence, encoded jointly as a 12-bit codeword; the remaining
/// `bits_per_tag - 4` high bits of every tag follow verbatim. A bucket therefore needs
/// `4 * (bits_per_tag - 1)` bits instead of `4 * bits_per_tag`.
///
/// Bucket layout, least significant bit first:
///
/// ```text
/// | codeword (12) | high(tag0) | high(tag1) | high(tag2) | high(tag3) |
/// ```
#[derive(Debug, Clone)]
pub struct PackedTable<'a> {
    bytes: Cow<'a, [u8]>,
    num_buckets: usize,
    bits_per_tag: u8,
    bytes_per_bucket: usize,
}

impl PackedTable<'static> {
    /// Allocates an empty table with `num_buckets` buckets.
    pub fn new(num_buckets: usize, bits_per_tag: u8) -> Result<Self, Error> {
        let bytes = allocate_table(Encoding::SemiSorted, num_buckets, bits_per_tag)?;
        Ok(Self::make(Cow::Owned(bytes), num_buckets, bits_per_tag))
    }
}

impl<'a> PackedTable<'a> {
    /// Interprets existing table bytes without copying them.
    ///
    /// Every bucket's codeword is checked against the codebook.
    pub fn from_bytes(
        bytes: Cow<'a, [u8]>,
        num_buckets: usize,
        bits_per_tag: u8,
    ) -> Result<Self, Error> {
        check_table_bytes(Encoding::SemiSorted, &bytes, num_buckets, bits_per_tag)?;
        let table = Self::make(bytes, num_buckets, bits_per_tag);
        table.check_buckets()?;
        Ok(table)
    }

    fn make(bytes: Cow<'a, [u8]>, num_buckets: usize, bits_per_tag: u8) -> Self {
        // an all-zero bucket must decode to four empty slots
        debug_assert_eq!(perm_encoding().decode(0), [0; 4]);
        Self {
            bytes,
            num_buckets,
            bits_per_tag,
            bytes_per_bucket: Encoding::SemiSorted.bytes_per_bucket(bits_per_tag),
        }
    }

    /// Returns true if the bytes are borrowed rather than owned.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.bytes, Cow::Borrowed(_))
    }

    #[inline]
    fn high_bits(&self) -> u32 {
        self.bits_per_tag as u32 - DIR_BITS_PER_TAG
    }

    #[inline]
    fn bucket_pos(&self, bucket: usize) -> usize {
        debug_assert!(bucket < self.num_buckets);
        bucket * self.bytes_per_bucket * 8
    }

    #[inline]
    fn read_code(&self, bucket: usize) -> u16 {
        read_bits(&self.bytes, self.bucket_pos(bucket), CODE_BITS) as u16
    }

    fn write_bucket(&mut self, bucket: usize, mut tags: [u32; TAGS_PER_BUCKET]) {
        tags.sort_unstable_by_key(|tag| tag & DIR_BITS_MASK);
        let nibbles = tags.map(|tag| (tag & DIR_BITS_MASK) as u8);
        let code = perm_encoding().encode(nibbles);

        let base = self.bucket_pos(bucket);
        let high_bits = self.high_bits();
        let bytes = make_mut(&mut self.bytes);
        write_bits(bytes, base, CODE_BITS, code as u32);
        for (k, tag) in tags.iter().enumerate() {
            let pos = base + CODE_BITS as usize + k * high_bits as usize;
            write_bits(bytes, pos, high_bits, tag >> DIR_BITS_PER_TAG);
        }
    }
}

impl TagTable for PackedTable<'_> {
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
        let base = self.bucket_pos(bucket);
        let high_bits = self.high_bits();
        let code = self.read_code(bucket);
        let nibbles = perm_encoding().decode(code);

        std::array::from_fn(|k| {
            let pos = base + CODE_BITS as usize + k * high_bits as usize;
            let high = read_bits(&self.bytes, pos, high_bits);
            (high << DIR_BITS_PER_TAG) | nibbles[k] as u32
        })
    }

    fn insert_tag_to_bucket(&mut self, bucket: usize, tag: u32, kickout: bool) -> InsertOutcome {
        debug_assert_ne!(tag, 0);
        let mut tags = self.read_bucket(bucket);
        if let Some(slot) = tags.iter().position(|t| *t == 0) {
            tags[slot] = tag;
            self.write_bucket(bucket, tags);
            return InsertOutcome::Inserted;
        }
        if !kickout {
            return InsertOutcome::Full;
        }

        let slot = random_slot();
        let old_tag = tags[slot];
        tags[slot] = tag;
        self.write_bucket(bucket, tags);
        InsertOutcome::Evicted(old_tag)
    }

    fn delete_tag_from_bucket(&mut self, bucket: usize, tag: u32) -> bool {
        let mut tags = self.read_bucket(bucket);
        match tags.iter().position(|t| *t == tag) {
            Some(slot) => {
                tags[slot] = 0;
                self.write_bucket(bucket, tags);
                true
            }
            None => false,
        }
    }

    fn check_buckets(&self) -> Result<(), Error> {
        let invalid = (0..self.num_buckets).find(|b| self.read_code(*b) as usize >= NUM_CODES);
        match invalid {
            Some(bucket) => Err(Error::deserial("bucket codeword is outside the codebook")
                .with_context("bucket", bucket)
                .with_context("codeword", self.read_code(bucket))),
            None => Ok(()),
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn info(&self) -> String {
        format!(
            "PackedHashtable with tag size: {} bits \n\
             \t\t{} packed bits ({} bits after compression) and {} direct bits\n\
             \t\tAssociativity: {}\n\
             \t\tTotal # of rows: {}\n\
             \t\tTotal # slots: {}\n\
             \t\tOccupied slots: {}",
            self.bits_per_tag,
            DIR_BITS_PER_TAG,
            DIR_BITS_PER_TAG - 1,
            self.high_bits(),
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
    use crate::error::ErrorKind;

    #[test]
    fn test_bucket_is_sorted_by_low_nibble() {
        let mut table = PackedTable::new(4, 13).unwrap();
        for tag in [0x1f03, 0x0041, 0x0a0f, 0x0102] {
            assert_eq!(table.insert_tag_to_bucket(1, tag, false), InsertOutcome::Inserted);
        }
        assert_eq!(table.read_bucket(1), [0x0041, 0x0102, 0x1f03, 0x0a0f]);
        assert_eq!(table.read_bucket(0), [0; 4]);
        assert_eq!(table.read_bucket(2), [0; 4]);
    }

    #[test]
    fn test_saves_one_bit_per_tag() {
        let packed = PackedTable::new(1024, 13).unwrap();
        assert_eq!(packed.size_in_bytes(), 1024 * 6);
        let naive = crate::table::SingleTable::new(1024, 13).unwrap();
        assert_eq!(naive.size_in_bytes(), 1024 * 7);
    }

    #[test]
    fn test_insert_delete_keeps_other_tags() {
        let mut table = PackedTable::new(8, 9).unwrap();
        let tags = [0x1ff, 0x010, 0x1f0, 0x00f];
        for tag in tags {
            table.insert_tag_to_bucket(7, tag, false);
        }
        assert_eq!(table.insert_tag_to_bucket(7, 0x123, false), InsertOutcome::Full);

        assert!(table.delete_tag_from_bucket(7, 0x1f0));
        let bucket = table.read_bucket(7);
        assert_eq!(bucket.iter().filter(|t| **t == 0).count(), 1);
        for tag in [0x1ff, 0x010, 0x00f] {
            assert!(bucket.contains(&tag));
        }
        assert!(table.find_tag_in_buckets(0, 7, 0x00f));
        assert!(!table.find_tag_in_buckets(0, 7, 0x1f0));

        assert_eq!(table.num_tags_in_bucket(6), 0);
    }

    #[test]
    fn test_kickout_returns_an_occupant() {
        let mut table = PackedTable::new(2, 17).unwrap();
        let tags = [0x1_0001, 0x0_0002, 0x1_fff3, 0x0_1234];
        for tag in tags {
            table.insert_tag_to_bucket(0, tag, false);
        }
        match table.insert_tag_to_bucket(0, 0x0_0005, true) {
            InsertOutcome::Evicted(old) => {
                assert!(tags.contains(&old));
                assert!(table.read_bucket(0).contains(&0x0_0005));
                assert!(!table.read_bucket(0).contains(&old));
            }
            other => panic!("expected eviction, got {other:?}"),
        }
    }

    #[test]
    fn test_codeword_outside_codebook_is_rejected() {
        let mut table = PackedTable::new(4, 13).unwrap();
        table.insert_tag_to_bucket(2, 0x0123, false);
        let mut bytes = table.bytes().to_vec();
        assert!(PackedTable::from_bytes(Cow::Borrowed(&bytes[..]), 4, 13).is_ok());

        // bucket 2 starts at byte 12; codeword 4095 is past the last of 3876 codes
        bytes[12] = 0xff;
        bytes[13] |= 0x0f;
        let err = PackedTable::from_bytes(Cow::Borrowed(&bytes[..]), 4, 13).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.to_string().contains("bucket: 2"));

        // the largest valid codeword is accepted
        let last = (NUM_CODES - 1) as u16;
        bytes[12] = last as u8;
        bytes[13] = (bytes[13] & 0xf0) | (last >> 8) as u8;
        assert!(PackedTable::from_bytes(Cow::Owned(bytes), 4, 13).is_ok());
    }

    #[test]
    fn test_info_mentions_compression() {
        let table = PackedTable::new(2, 13).unwrap();
        let info = table.info();
        assert!(info.starts_with("PackedHashtable with tag size: 13 bits"));
        assert!(info.contains("9 direct bits"));
    }
}
