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

mod common;

use common::*;
use streamagg::{resolve, Datum, TimestampValue, TypeDesc, TypeKind};

#[test]
fn test_count_skips_nulls() {
    let mut ctx = ctx(vec![bigint()], bigint());
    let out = run_values(
        "count",
        &mut ctx,
        vec![Datum::BigInt(1), Datum::Null, Datum::BigInt(3)],
    );
    assert_eq!(as_i64(&out), 2);
}

#[test]
fn test_count_star_counts_nulls() {
    let mut ctx = ctx(vec![bigint()], bigint());
    let out = run_values(
        "count_star",
        &mut ctx,
        vec![Datum::Null, Datum::Null, Datum::BigInt(1)],
    );
    assert_eq!(as_i64(&out), 3);
}

#[test]
fn test_count_empty_is_zero_and_two_phase_adds() {
    let mut ctx = ctx(vec![bigint()], bigint());
    assert_eq!(as_i64(&run_values("count", &mut ctx, vec![])), 0);
    let out = run_two_phase(
        "count",
        &mut ctx,
        vec![
            vec![Datum::BigInt(1), Datum::BigInt(2)],
            vec![Datum::BigInt(3)],
            vec![],
        ],
    );
    assert_eq!(as_i64(&out), 3);
}

#[test]
fn test_sum_int_empty_is_null() {
    let mut ctx = ctx(vec![bigint()], bigint());
    assert_eq!(run_values("sum", &mut ctx, vec![]), Datum::Null);
    assert_eq!(run_values("sum", &mut ctx, vec![Datum::Null]), Datum::Null);
}

#[test]
fn test_sum_int_two_phase() {
    let mut ctx = ctx(vec![bigint()], bigint());
    let out = run_two_phase(
        "sum",
        &mut ctx,
        vec![
            vec![Datum::BigInt(10), Datum::Null],
            vec![Datum::BigInt(-3)],
            vec![],
        ],
    );
    assert_eq!(as_i64(&out), 7);
}

#[test]
fn test_sum_decimal_adds_at_shared_scale() {
    let desc = TypeDesc::decimal(10, 2);
    let mut ctx = ctx(vec![desc], TypeDesc::decimal(38, 2));
    let out = run_values(
        "sum",
        &mut ctx,
        vec![Datum::Decimal(150), Datum::Decimal(-49)],
    );
    assert_eq!(out, Datum::Decimal(101));
}

#[test]
fn test_min_max_ints() {
    let mut ctx = ctx(vec![bigint()], bigint());
    let values = vec![
        Datum::BigInt(5),
        Datum::Null,
        Datum::BigInt(-2),
        Datum::BigInt(9),
    ];
    assert_eq!(as_i64(&run_values("min", &mut ctx, values.clone())), -2);
    assert_eq!(as_i64(&run_values("max", &mut ctx, values)), 9);
}

#[test]
fn test_min_max_strings_lexicographic() {
    let mut ctx = ctx(vec![varchar()], varchar());
    let values = vec![
        Datum::Varchar(b"pear".to_vec()),
        Datum::Varchar(b"apple".to_vec()),
        Datum::Varchar(b"plum".to_vec()),
    ];
    assert_eq!(
        run_values("min", &mut ctx, values.clone()),
        Datum::Varchar(b"apple".to_vec())
    );
    assert_eq!(
        run_values("max", &mut ctx, values),
        Datum::Varchar(b"plum".to_vec())
    );
}

#[test]
fn test_min_max_strings_two_phase() {
    let mut ctx = ctx(vec![varchar()], varchar());
    let out = run_two_phase(
        "max",
        &mut ctx,
        vec![
            vec![Datum::Varchar(b"bb".to_vec())],
            vec![],
            vec![Datum::Varchar(b"cc".to_vec()), Datum::Varchar(b"aa".to_vec())],
        ],
    );
    assert_eq!(out, Datum::Varchar(b"cc".to_vec()));
}

#[test]
fn test_min_timestamp_orders_by_date_then_time() {
    let desc = TypeDesc::new(TypeKind::Timestamp);
    let mut ctx = ctx(vec![desc], desc);
    let early = TimestampValue::new(100, 500);
    let later_same_day = TimestampValue::new(100, 900);
    let later_day = TimestampValue::new(101, 0);
    let out = run_values(
        "min",
        &mut ctx,
        vec![
            Datum::Timestamp(later_day),
            Datum::Timestamp(later_same_day),
            Datum::Timestamp(early),
        ],
    );
    assert_eq!(out, Datum::Timestamp(early));
}

#[test]
fn test_avg_update_and_merge() {
    let mut ctx = ctx(vec![bigint()], double());
    let out = run_values(
        "avg",
        &mut ctx,
        vec![
            Datum::BigInt(1),
            Datum::BigInt(2),
            Datum::BigInt(3),
            Datum::BigInt(4),
        ],
    );
    assert_eq!(as_f64(&out), 2.5);

    let out = run_two_phase(
        "avg",
        &mut ctx,
        vec![
            vec![Datum::BigInt(1), Datum::BigInt(2)],
            vec![Datum::BigInt(3), Datum::BigInt(4)],
        ],
    );
    assert_eq!(as_f64(&out), 2.5);
}

#[test]
fn test_avg_empty_is_null() {
    let mut ctx = ctx(vec![bigint()], double());
    assert_eq!(run_values("avg", &mut ctx, vec![Datum::Null]), Datum::Null);
}

#[test]
fn test_avg_get_value_does_not_consume_state() {
    let agg = resolve("avg").unwrap();
    let mut ctx = ctx(vec![bigint()], double());
    let mut state = agg.init(&mut ctx).unwrap();
    agg.update(&mut ctx, &[Datum::BigInt(2)], &mut state).unwrap();
    agg.update(&mut ctx, &[Datum::BigInt(4)], &mut state).unwrap();
    assert_eq!(
        agg.get_value(&mut ctx, &mut state).unwrap(),
        Datum::Double(3.0)
    );
    agg.update(&mut ctx, &[Datum::BigInt(9)], &mut state).unwrap();
    assert_eq!(
        agg.finalize(&mut ctx, state).unwrap(),
        Datum::Double(5.0)
    );
    assert_eq!(ctx.outstanding_bytes(), 0);
}

#[test]
fn test_timestamp_avg_round_trips_days() {
    let desc = TypeDesc::new(TypeKind::Timestamp);
    let mut ctx = ctx(vec![desc], desc);
    // Midnight of day 10 and midnight of day 20 average to day 15.
    let out = run_values(
        "avg",
        &mut ctx,
        vec![
            Datum::Timestamp(TimestampValue::new(10, 0)),
            Datum::Timestamp(TimestampValue::new(20, 0)),
        ],
    );
    assert_eq!(out, Datum::Timestamp(TimestampValue::new(15, 0)));
}

#[test]
fn test_avg_decimal_rounds_half_up() {
    // avg(0.01, 0.02) = 0.015 -> 0.02 at scale 2.
    let mut ctx = ctx(vec![TypeDesc::decimal(10, 2)], TypeDesc::decimal(10, 2));
    let out = run_values(
        "avg",
        &mut ctx,
        vec![Datum::Decimal(1), Datum::Decimal(2)],
    );
    assert_eq!(out, Datum::Decimal(2));
}

#[test]
fn test_avg_decimal_overflow_warns_once_and_returns_null() {
    streamagg::common::logging::init_with_level("info");
    let mut ctx = ctx(vec![TypeDesc::decimal(38, 0)], TypeDesc::decimal(38, 0));
    // An accumulated sum past precision 38 still fits the i128 slot; the
    // division is where the overflow is detected and reported.
    let huge = 15 * 10_i128.pow(37);
    let out = run_values("avg", &mut ctx, vec![Datum::Decimal(huge)]);
    assert_eq!(out, Datum::Null);
    assert_eq!(ctx.warnings().len(), 1);
}

#[test]
fn test_merge_with_identity_state_is_identity() {
    for name in ["count", "sum", "min", "max", "avg"] {
        let ret = if name == "avg" { double() } else { bigint() };
        let mut ctx = ctx(vec![bigint()], ret);
        let direct = run_values(name, &mut ctx, vec![Datum::BigInt(4), Datum::BigInt(7)]);
        let merged = run_two_phase(
            name,
            &mut ctx,
            vec![vec![Datum::BigInt(4), Datum::BigInt(7)], vec![]],
        );
        assert_eq!(direct, merged, "merge identity broken for {}", name);
        let merged = run_two_phase(
            name,
            &mut ctx,
            vec![vec![], vec![Datum::BigInt(4), Datum::BigInt(7)]],
        );
        assert_eq!(direct, merged, "merge identity broken for {}", name);
    }
}
