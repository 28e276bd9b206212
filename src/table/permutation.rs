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

//! Codebook for sorted 4-tuples of nibbles.
//!
//! A bucket of the semi-sorted table keeps its four tags ordered by their low four bits.
//! There are only C(19, 4) = 3876 non-decreasing sequences of four nibbles, so the four low
//! nibbles (16 bits) can be stored as a 12-bit codeword, saving one bit per tag.

use std::sync::LazyLock;

/// Number of distinct non-decreasing nibble 4-tuples.
pub(super) const NUM_CODES: usize = 3876;
/// Width of a codeword in bits.
pub(super) const CODE_BITS: u32 = 12;

static PERM_ENCODING: LazyLock<PermEncoding> = LazyLock::new(PermEncoding::new);

/// Returns the process-wide codebook, built on first use.
pub(super) fn perm_encoding() -> &'static PermEncoding {
    &PERM_ENCODING
}

pub(super) struct PermEncoding {
    // codeword -> packed nibbles
    dec_table: Box<[u16]>,
    // packed nibbles -> codeword; only sorted tuples are meaningful
    enc_table: Box<[u16]>,
}

impl PermEncoding {
    fn new() -> Self {
        let mut dec_table = vec![0u16; NUM_CODES].into_boxed_slice();
        let mut enc_table = vec![0u16; 1 << 16].into_boxed_slice();

        let mut code = 0usize;
        for a in 0..16u8 {
            for b in a..16 {
                for c in b..16 {
                    for d in c..16 {
                        let packed = pack([a, b, c, d]);
                        dec_table[code] = packed;
                        enc_table[packed as usize] = code as u16;
                        code += 1;
                    }
                }
            }
        }
        debug_assert_eq!(code, NUM_CODES);

        Self {
            dec_table,
            enc_table,
        }
    }

    /// Encodes four nibbles sorted in non-decreasing order.
    #[inline]
    pub(super) fn encode(&self, nibbles: [u8; 4]) -> u16 {
        debug_assert!(nibbles.is_sorted(), "nibbles must be sorted: {nibbles:?}");
        self.enc_table[pack(nibbles) as usize]
    }

    /// Decodes a codeword back into four sorted nibbles.
    #[inline]
    pub(super) fn decode(&self, code: u16) -> [u8; 4] {
        unpack(self.dec_table[code as usize])
    }
}

#[inline]
fn pack(nibbles: [u8; 4]) -> u16 {
    (nibbles[0] as u16)
        | ((nibbles[1] as u16) << 4)
        | ((nibbles[2] as u16) << 8)
        | ((nibbles[3] as u16) << 12)
}

#[inline]
fn unpack(packed: u16) -> [u8; 4] {
    [
        (packed & 0x0f) as u8,
        ((packed >> 4) & 0x0f) as u8,
        ((packed >> 8) & 0x0f) as u8,
        (packed >> 12) as u8,
    ]
}
