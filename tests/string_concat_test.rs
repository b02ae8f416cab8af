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
use streamagg::{resolve, Datum};

fn concat_row(value: &str, separator: Option<&str>) -> Vec<Datum> {
    vec![
        Datum::Varchar(value.as_bytes().to_vec()),
        separator
            .map(|s| Datum::Varchar(s.as_bytes().to_vec()))
            .unwrap_or(Datum::Null),
    ]
}

#[test]
fn test_default_separator() {
    let mut ctx = ctx(vec![varchar(), varchar()], varchar());
    let out = run_rows(
        "group_concat",
        &mut ctx,
        vec![
            concat_row("a", None),
            concat_row("b", None),
            concat_row("c", None),
        ],
    );
    assert_eq!(as_string(&out), "a, b, c");
}

#[test]
fn test_explicit_separator() {
    let mut ctx = ctx(vec![varchar(), varchar()], varchar());
    let out = run_rows(
        "group_concat",
        &mut ctx,
        vec![concat_row("x", Some("|")), concat_row("y", Some("|"))],
    );
    assert_eq!(as_string(&out), "x|y");
}

#[test]
fn test_null_values_are_skipped() {
    let mut ctx = ctx(vec![varchar(), varchar()], varchar());
    let out = run_rows(
        "group_concat",
        &mut ctx,
        vec![
            concat_row("a", None),
            vec![Datum::Null, Datum::Null],
            concat_row("b", None),
        ],
    );
    assert_eq!(as_string(&out), "a, b");
}

#[test]
fn test_empty_input_is_null() {
    let mut ctx = ctx(vec![varchar(), varchar()], varchar());
    let out = run_rows("group_concat", &mut ctx, Vec::<Vec<Datum>>::new());
    assert_eq!(out, Datum::Null);
}

#[test]
fn test_merge_preserves_first_seen_separator() {
    // Fold ["a", "b"] with "-" and ["c"] with "+", then merge. The
    // source payload is appended as-is: its own separator header is
    // dropped, but the separators between its values survive.
    let agg = resolve("group_concat").unwrap();
    let mut ctx = ctx(vec![varchar(), varchar()], varchar());

    let mut left = agg.init(&mut ctx).unwrap();
    agg.update(&mut ctx, &concat_row("a", Some("-")), &mut left)
        .unwrap();
    agg.update(&mut ctx, &concat_row("b", Some("-")), &mut left)
        .unwrap();
    let left_bytes = agg.serialize(&mut ctx, left).unwrap();

    let mut right = agg.init(&mut ctx).unwrap();
    agg.update(&mut ctx, &concat_row("c", Some("+")), &mut right)
        .unwrap();
    let right_bytes = agg.serialize(&mut ctx, right).unwrap();

    let mut merged = agg.init(&mut ctx).unwrap();
    agg.merge(&mut ctx, &left_bytes, &mut merged).unwrap();
    agg.merge(&mut ctx, &right_bytes, &mut merged).unwrap();
    let out = agg.finalize(&mut ctx, merged).unwrap();
    assert_eq!(as_string(&out), "a-b+c");
    assert_eq!(ctx.outstanding_bytes(), 0);
}

#[test]
fn test_merge_into_empty_adopts_source_header() {
    let agg = resolve("group_concat").unwrap();
    let mut ctx = ctx(vec![varchar(), varchar()], varchar());

    let mut part = agg.init(&mut ctx).unwrap();
    agg.update(&mut ctx, &concat_row("a", Some(";")), &mut part)
        .unwrap();
    agg.update(&mut ctx, &concat_row("b", Some(";")), &mut part)
        .unwrap();
    let bytes = agg.serialize(&mut ctx, part).unwrap();

    let mut merged = agg.init(&mut ctx).unwrap();
    agg.merge(&mut ctx, &bytes, &mut merged).unwrap();
    let out = agg.finalize(&mut ctx, merged).unwrap();
    assert_eq!(as_string(&out), "a;b");
}
