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

//! Cuckoo filter for approximate set membership with deletion.
//!
//! Each key is reduced to a small non-zero fingerprint ("tag") and two candidate buckets,
//! either of which may hold it. Inserting into two full buckets relocates existing tags to
//! their alternate bucket, for at most [`DEFAULT_MAX_KICKS`] rounds by default. A tag that
//! is still homeless after the last round is parked in a single overflow slot; while that
//! slot is occupied further inserts report [`Status::NotEnoughSpace`].
//!
//! # Usage
//!
//! ```rust
//! use cuckoofilter::cuckoo::CuckooFilter;
//! use cuckoofilter::cuckoo::Status;
//!
//! let mut filter = CuckooFilter::builder()
//!     .bits_per_item(12)
//!     .build(10_000)
//!     .unwrap();
//!
//! assert_eq!(filter.add(42), Status::Ok);
//! assert_eq!(filter.contains(42), Status::Ok);
//! assert_eq!(filter.delete(42), Status::Ok);
//! assert_eq!(filter.contains(42), Status::NotFound);
//! ```
//!
//! # Persistence
//!
//! A filter is saved as a fixed 64-byte header followed by the raw table bytes (see
//! [`HEADER_SIZE`] for the exact layout). It can be restored by copying
//! ([`CuckooFilter::load`], [`CuckooFilter::from_bytes`]) or by wrapping a caller-owned
//! buffer such as a memory map ([`CuckooFilter::wrap`]). The header does not record the
//! tag width or the encoding, so readers pass the [`FilterConfig`] the filter was built with.
//!
//! # Notes
//!
//! - The filter is single-writer: `add` and `delete` take `&mut self`.
//! - Deleting a key that was never added may remove the fingerprint of another key that
//!   collides with it.
//! - The persisted format is little-endian and carries no magic number or version.

mod builder;
mod filter;
mod serialization;

pub use self::builder::CuckooFilterBuilder;
pub use self::builder::num_buckets_for_capacity;
pub use self::filter::CuckooFilter;
pub use self::filter::Status;
pub use self::serialization::HEADER_SIZE;
pub use self::serialization::SavedMetadata;
pub use self::serialization::inspect;
pub use self::serialization::inspect_bytes;

use crate::error::Error;
use crate::table::Encoding;

/// Default bound on relocation rounds per insertion.
pub const DEFAULT_MAX_KICKS: u32 = 500;

/// Largest fill fraction accepted by the capacity-based sizing before doubling the table.
pub const MAX_LOAD_FACTOR: f64 = 0.96;

/// Tag width and bucket encoding of a filter.
///
/// Needed to interpret persisted bytes, since the header does not carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterConfig {
    /// Width of a fingerprint in bits.
    pub bits_per_item: u8,
    /// Physical bucket encoding.
    pub encoding: Encoding,
}

impl FilterConfig {
    /// Creates a naive-encoding configuration with `bits_per_item` bit fingerprints.
    pub fn new(bits_per_item: u8) -> Self {
        Self {
            bits_per_item,
            encoding: Encoding::Naive,
        }
    }

    /// Creates a semi-sorted configuration with `bits_per_item` bit fingerprints.
    pub fn semi_sorted(bits_per_item: u8) -> Self {
        Self {
            bits_per_item,
            encoding: Encoding::SemiSorted,
        }
    }

    /// Checks that the encoding supports the width.
    pub fn validate(&self) -> Result<(), Error> {
        self.encoding.validate_bits_per_tag(self.bits_per_item)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new(12)
    }
}
