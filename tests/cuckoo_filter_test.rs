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

use cuckoofilter::cuckoo::CuckooFilter;
use cuckoofilter::cuckoo::FilterConfig;
use cuckoofilter::cuckoo::Status;
use cuckoofilter::table::Encoding;
use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;
use googletest::prelude::ge;
use googletest::prelude::le;

fn count_false_positives(filter: &CuckooFilter, probes: std::ops::Range<u64>) -> usize {
    probes.filter(|key| filter.contains(*key).is_ok()).count()
}

#[test]
fn test_empty_filter() {
    let filter = CuckooFilter::builder().build(1_000).unwrap();
    assert!(filter.is_empty());
    assert_eq!(filter.size(), 0);
    assert_eq!(filter.load_factor(), 0.0);
    assert!(!filter.has_overflow());
    assert_eq!(count_false_positives(&filter, 0..10_000), 0);
}

#[test]
fn test_no_false_negatives() {
    for config in [
        FilterConfig::new(8),
        FilterConfig::new(12),
        FilterConfig::new(32),
        FilterConfig::semi_sorted(9),
        FilterConfig::semi_sorted(13),
    ] {
        let mut filter = CuckooFilter::builder().config(config).build(50_000).unwrap();
        for key in 0..50_000 {
            assert_eq!(filter.add(key), Status::Ok, "{config:?}");
        }
        assert!(!filter.has_overflow(), "{config:?}");
        assert_eq!(filter.size(), 50_000);
        for key in 0..50_000 {
            assert_eq!(filter.contains(key), Status::Ok, "{config:?} key {key}");
        }
    }
}

#[test]
fn test_false_positive_rate_with_small_tags() {
    let mut filter = CuckooFilter::builder().bits_per_item(8).build(1_000).unwrap();
    for key in 0..1_000 {
        assert_eq!(filter.add(key), Status::Ok);
    }

    let false_positives = count_false_positives(&filter, 2_000..3_000);
    assert_that!(false_positives, ge(1));
    assert_that!(false_positives, le(60));
}

#[test]
fn test_false_positive_rate_with_twelve_bit_tags() {
    let mut filter = CuckooFilter::builder().bits_per_item(12).build(100_000).unwrap();
    for key in 0..100_000 {
        assert_eq!(filter.add(key), Status::Ok);
    }

    // about 0.15% expected at this load
    let false_positives = count_false_positives(&filter, 1_000_000..1_100_000);
    assert_that!(false_positives, le(500));
}

#[test]
fn test_sizing_for_one_million_keys() {
    let filter = CuckooFilter::builder().bits_per_item(12).build(1_000_000).unwrap();
    assert_eq!(filter.num_buckets(), 1 << 18);
    assert_eq!(filter.capacity_in_slots(), 1 << 20);
    assert_eq!(filter.size_in_bytes(), (1 << 18) * 6);
}

#[test]
fn test_semi_sorted_saves_a_bit_per_slot() {
    let naive = CuckooFilter::builder()
        .bits_per_item(13)
        .build_with_num_buckets(1024)
        .unwrap();
    let packed = CuckooFilter::builder()
        .bits_per_item(13)
        .encoding(Encoding::SemiSorted)
        .build_with_num_buckets(1024)
        .unwrap();
    assert_eq!(naive.size_in_bytes(), 1024 * 7);
    assert_eq!(packed.size_in_bytes(), 1024 * 6);
    assert_that!(naive.info(), contains_substring("SingleHashtable"));
    assert_that!(packed.info(), contains_substring("PackedHashtable"));
}

#[test]
fn test_overflow_exhaustion() {
    let mut filter = CuckooFilter::builder()
        .bits_per_item(12)
        .build_with_num_buckets(256)
        .unwrap();

    let mut added = vec![];
    let mut rejected = None;
    for key in 0..1_026u64 {
        match filter.add(key) {
            Status::Ok => added.push(key),
            Status::NotEnoughSpace => {
                rejected = Some(key);
                break;
            }
            status => panic!("unexpected status {status:?}"),
        }
    }

    assert!(rejected.is_some(), "a full table must report NotEnoughSpace");
    assert!(filter.has_overflow());
    assert_that!(filter.size(), eq(added.len() - 1));
    assert_that!(filter.load_factor(), ge(0.9));
    for key in &added {
        assert_eq!(filter.contains(*key), Status::Ok, "lost key {key}");
    }

    // freeing one slot lets the parked fingerprint back in
    assert_eq!(filter.delete(added[0]), Status::Ok);
    for key in &added[1..] {
        assert_eq!(filter.contains(*key), Status::Ok, "lost key {key}");
    }
}

#[test]
fn test_add_delete_cycles() {
    let mut filter = CuckooFilter::builder().bits_per_item(16).build(10_000).unwrap();
    for round in 0..5u64 {
        let keys = round * 100_000..round * 100_000 + 9_000;
        for key in keys.clone() {
            assert_eq!(filter.add(key), Status::Ok);
        }
        assert_eq!(filter.size(), 9_000);
        for key in keys {
            assert_eq!(filter.delete(key), Status::Ok);
        }
        assert!(filter.is_empty());
    }
}

#[test]
fn test_hashable_items() {
    let mut filter = CuckooFilter::builder().build(1_000).unwrap();
    let words = ["apple", "banana", "cherry"];
    for word in words {
        assert_eq!(filter.add_item(word), Status::Ok);
    }
    for word in words {
        assert_eq!(filter.contains_item(word), Status::Ok);
    }
    assert_eq!(filter.contains_item(&"durian".to_string()), Status::NotFound);

    assert_eq!(filter.delete_item("banana"), Status::Ok);
    assert_eq!(filter.contains_item("banana"), Status::NotFound);
    assert_eq!(filter.size(), 2);
}

#[test]
fn test_info_reports_state() {
    let mut filter = CuckooFilter::builder().bits_per_item(8).build(100).unwrap();
    let _ = filter.add(1);
    let info = filter.info();
    assert_that!(info, contains_substring("CuckooFilter Status:"));
    assert_that!(info, contains_substring("Keys stored: 1"));
    assert_that!(info, contains_substring("tag size: 8 bits"));
}
