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

//! Little-endian bit windows over a byte slice.
//!
//! Bit `p` of a table lives in byte `p / 8` at bit `p % 8`. Fields are at most 32 bits wide,
//! so a window never spans more than five bytes.

#[inline]
fn field_mask(width: u32) -> u64 {
    debug_assert!((1..=32).contains(&width));
    (1u64 << width) - 1
}

#[inline]
fn byte_range(bit_pos: usize, width: u32) -> (usize, usize) {
    (bit_pos / 8, (bit_pos + width as usize).div_ceil(8))
}

/// Reads the `width`-bit field starting at `bit_pos`.
#[inline]
pub(super) fn read_bits(bytes: &[u8], bit_pos: usize, width: u32) -> u32 {
    let (start, end) = byte_range(bit_pos, width);
    let mut window = 0u64;
    for (i, byte) in bytes[start..end].iter().enumerate() {
        window |= (*byte as u64) << (8 * i);
    }
    ((window >> (bit_pos % 8)) & field_mask(width)) as u32
}

/// Overwrites the `width`-bit field starting at `bit_pos` with the low bits of `value`.
#[inline]
pub(super) fn write_bits(bytes: &mut [u8], bit_pos: usize, width: u32, value: u32) {
    let (start, end) = byte_range(bit_pos, width);
    let shift = bit_pos % 8;
    let window_bytes = &mut bytes[start..end];

    let mut window = 0u64;
    for (i, byte) in window_bytes.iter().enumerate() {
        window |= (*byte as u64) << (8 * i);
    }
    let mask = field_mask(width) << shift;
    window = (window & !mask) | (((value as u64) << shift) & mask);
    for (i, byte) in window_bytes.iter_mut().enumerate() {
        *byte = (window >> (8 * i)) as u8;
    }
}
