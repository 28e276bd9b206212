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

//! A cuckoo filter for approximate set membership with deletion.
//!
//! The filter stores a small fingerprint per key in one of two candidate buckets of four
//! slots each, relocating fingerprints between their buckets on insertion. Two physical
//! table layouts are available: a naive fixed-width layout and a semi-sorted layout that
//! saves one bit per slot. Filters can be saved to disk and restored either by copying the
//! bytes or by wrapping a caller-owned buffer such as a memory map.
//!
//! See [`cuckoo`] for usage.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

mod codec;

pub mod cuckoo;
pub mod error;
pub mod hash;
pub mod table;
