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

use std::io::Cursor;

use byteorder::LE;
use byteorder::ReadBytesExt;

use crate::codec::FilterBytes;
use crate::error::Error;

/// Two-independent multiply-shift hash of 64-bit keys.
///
/// See Martin Dietzfelbinger, "Universal hashing and k-wise independent random variables via
/// integer arithmetic without primes". The hash of `key` is the high 64 bits of
/// `add + multiply * key` computed modulo 2^128.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoIndependentMultiplyShift {
    multiply: u128,
    add: u128,
}

impl TwoIndependentMultiplyShift {
    /// Size of the serialized seed in bytes.
    pub const SERIALIZED_SIZE: usize = 32;

    /// Creates a hash function with coefficients drawn from the thread-local CSPRNG.
    pub fn new() -> Self {
        Self {
            multiply: rand::random(),
            add: rand::random(),
        }
    }

    /// Creates a hash function from explicit coefficients.
    ///
    /// # Examples
    ///
    /// ```
    /// use cuckoofilter::hash::TwoIndependentMultiplyShift;
    ///
    /// let h1 = TwoIndependentMultiplyShift::with_coefficients(7, 11);
    /// let h2 = TwoIndependentMultiplyShift::with_coefficients(7, 11);
    /// assert_eq!(h1.hash(42), h2.hash(42));
    /// ```
    pub fn with_coefficients(multiply: u128, add: u128) -> Self {
        Self { multiply, add }
    }

    /// Hashes a 64-bit key.
    #[inline]
    pub fn hash(&self, key: u64) -> u64 {
        (self.add.wrapping_add(self.multiply.wrapping_mul(key as u128)) >> 64) as u64
    }

    /// Returns the multiplier coefficient.
    pub fn multiply(&self) -> u128 {
        self.multiply
    }

    /// Returns the addend coefficient.
    pub fn add(&self) -> u128 {
        self.add
    }

    /// Encodes the seed as 32 little-endian bytes: multiplier, then addend.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = FilterBytes::with_capacity(Self::SERIALIZED_SIZE);
        self.encode(&mut bytes);
        bytes.into_bytes()
    }

    pub(crate) fn encode(&self, bytes: &mut FilterBytes) {
        bytes.write_u128_le(self.multiply);
        bytes.write_u128_le(self.add);
    }

    /// Restores a seed previously produced by [`to_bytes`](Self::to_bytes).
    ///
    /// Only the first 32 bytes are read.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidData`](crate::error::ErrorKind::InvalidData) if `bytes`
    /// is shorter than 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = Cursor::new(bytes);
        let multiply = cursor.read_u128::<LE>().map_err(make_error("multiply"))?;
        let add = cursor.read_u128::<LE>().map_err(make_error("add"))?;
        Ok(Self { multiply, add })
    }
}

impl Default for TwoIndependentMultiplyShift {
    fn default() -> Self {
        Self::new()
    }
}
