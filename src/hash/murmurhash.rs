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

use std::hash::Hash;

/// Reduces any hashable value to a 64-bit filter key.
///
/// The value is fed through [`Hash`] into a streaming MurmurHash3 (x64, 128-bit) hasher
/// seeded with 9001; the first half of the digest is the key. The result is stable
/// for a given `Hash` implementation, so keys derived this way can be persisted alongside
/// the filter.
///
/// # Examples
///
/// ```
/// use cuckoofilter::hash::hash_item;
///
/// assert_eq!(hash_item("apple"), hash_item("apple"));
/// assert_ne!(hash_item("apple"), hash_item("grape"));
/// ```
pub fn hash_item<T: Hash + ?Sized>(item: &T) -> u64 {
    const DEFAULT_SEED: u32 = 9001;

    let mut hasher = mur3::Hasher128::with_seed(DEFAULT_SEED);
    item.hash(&mut hasher);
    let (h1, _) = hasher.finish128();
    h1
}
