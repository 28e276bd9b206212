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

use crate::cuckoo::CuckooFilter;
use crate::cuckoo::DEFAULT_MAX_KICKS;
use crate::cuckoo::FilterConfig;
use crate::cuckoo::MAX_LOAD_FACTOR;
use crate::error::Error;
use crate::hash::TwoIndependentMultiplyShift;
use crate::table::Encoding;
use crate::table::TAGS_PER_BUCKET;
use crate::table::Table;

/// Builder for creating cuckoo filters.
///
/// # Examples
///
/// ```
/// use cuckoofilter::cuckoo::CuckooFilter;
/// use cuckoofilter::table::Encoding;
///
/// let filter = CuckooFilter::builder()
///     .bits_per_item(13)
///     .encoding(Encoding::SemiSorted)
///     .max_kicks(200)
///     .build(1_000_000)
///     .unwrap();
///
/// assert!(filter.is_valid());
/// assert_eq!(filter.num_buckets(), 1 << 18);
/// ```
#[derive(Debug, Clone)]
pub struct CuckooFilterBuilder {
    config: FilterConfig,
    hasher: Option<TwoIndependentMultiplyShift>,
    max_kicks: u32,
}

impl Default for CuckooFilterBuilder {
    fn default() -> Self {
        Self {
            config: FilterConfig::default(),
            hasher: None,
            max_kicks: DEFAULT_MAX_KICKS,
        }
    }
}

impl CuckooFilterBuilder {
    /// Sets the fingerprint width in bits (12 by default).
    ///
    /// Wider fingerprints lower the false positive rate and cost memory. The naive encoding
    /// accepts 1 to 32 bits, the semi-sorted encoding 5 to 32 bits; the width is checked by
    /// [`build`](Self::build).
    pub fn bits_per_item(mut self, bits_per_item: u8) -> Self {
        self.config.bits_per_item = bits_per_item;
        self
    }

    /// Sets the bucket encoding ([`Encoding::Naive`] by default).
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    /// Sets both width and encoding from a [`FilterConfig`].
    pub fn config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses the given hash function instead of a freshly seeded one.
    ///
    /// Mostly useful to make tests reproducible.
    pub fn hasher(mut self, hasher: TwoIndependentMultiplyShift) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Sets the maximum number of relocation rounds per insertion.
    ///
    /// # Panics
    ///
    /// Panics if `max_kicks` is 0.
    pub fn max_kicks(mut self, max_kicks: u32) -> Self {
        assert!(max_kicks > 0, "max_kicks must be at least 1");
        self.max_kicks = max_kicks;
        self
    }

    /// Builds a filter sized for `capacity` keys.
    ///
    /// The bucket count is the next power of two of `capacity / 4`, doubled once more if the
    /// resulting fill fraction would exceed [`MAX_LOAD_FACTOR`].
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for an invalid width or an oversized capacity, and
    /// `AllocationFailure` if the table cannot be allocated.
    pub fn build(self, capacity: usize) -> Result<CuckooFilter<'static>, Error> {
        let num_buckets = num_buckets_for_capacity(capacity)?;
        self.build_with_num_buckets(num_buckets)
    }

    /// Builds a filter with exactly `num_buckets` buckets.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if `num_buckets` is not a non-zero power of two or the width is
    /// invalid, and `AllocationFailure` if the table cannot be allocated.
    pub fn build_with_num_buckets(
        self,
        num_buckets: usize,
    ) -> Result<CuckooFilter<'static>, Error> {
        let FilterConfig {
            bits_per_item,
            encoding,
        } = self.config;
        let table = Table::new(encoding, num_buckets, bits_per_item)?;
        log::debug!(
            "built cuckoo filter: {num_buckets} buckets, {bits_per_item} bits per item, \
             {encoding:?} encoding"
        );
        let hasher = self.hasher.unwrap_or_default();
        Ok(CuckooFilter::make(table, hasher, self.max_kicks))
    }
}

/// Bucket count chosen by [`CuckooFilterBuilder::build`] for `capacity` keys.
///
/// # Examples
///
/// ```
/// use cuckoofilter::cuckoo::num_buckets_for_capacity;
///
/// assert_eq!(num_buckets_for_capacity(0).unwrap(), 1);
/// assert_eq!(num_buckets_for_capacity(1000).unwrap(), 512);
/// assert_eq!(num_buckets_for_capacity(1_000_000).unwrap(), 1 << 18);
/// ```
pub fn num_buckets_for_capacity(capacity: usize) -> Result<usize, Error> {
    let too_large =
        || Error::not_supported("capacity is too large").with_context("capacity", capacity);

    let mut num_buckets = (capacity / TAGS_PER_BUCKET)
        .max(1)
        .checked_next_power_of_two()
        .ok_or_else(too_large)?;
    let frac = capacity as f64 / num_buckets as f64 / TAGS_PER_BUCKET as f64;
    if frac > MAX_LOAD_FACTOR {
        num_buckets = num_buckets.checked_mul(2).ok_or_else(too_large)?;
    }
    Ok(num_buckets)
}

impl CuckooFilter<'static> {
    /// Creates a builder for cuckoo filters.
    pub fn builder() -> CuckooFilterBuilder {
        CuckooFilterBuilder::default()
    }
}
