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
//! Fold/merge drivers shared by the aggregate integration tests.
#![allow(dead_code)]

use streamagg::{resolve, Datum, FunctionContext, TypeDesc, TypeKind};

pub fn ctx(arg_types: Vec<TypeDesc>, return_type: TypeDesc) -> FunctionContext {
    FunctionContext::new(arg_types, return_type)
}

pub fn bigint() -> TypeDesc {
    TypeDesc::new(TypeKind::BigInt)
}

pub fn double() -> TypeDesc {
    TypeDesc::new(TypeKind::Double)
}

pub fn varchar() -> TypeDesc {
    TypeDesc::new(TypeKind::Varchar)
}

/// Fold argument rows through one state and finalize. Asserts the
/// context tracks no outstanding state afterwards.
pub fn run_rows(
    name: &str,
    ctx: &mut FunctionContext,
    rows: impl IntoIterator<Item = Vec<Datum>>,
) -> Datum {
    let agg = resolve(name).unwrap();
    let mut state = agg.init(ctx).unwrap();
    for row in rows {
        agg.update(ctx, &row, &mut state).unwrap();
    }
    let out = agg.finalize(ctx, state).unwrap();
    assert_eq!(ctx.outstanding_bytes(), 0, "aggregate state leaked");
    out
}

/// Single-argument convenience wrapper around [`run_rows`].
pub fn run_values(name: &str, ctx: &mut FunctionContext, values: Vec<Datum>) -> Datum {
    run_rows(name, ctx, values.into_iter().map(|v| vec![v]))
}

/// Two-phase execution: fold each partition into its own state,
/// serialize them, merge the wire images into a fresh state, finalize.
pub fn run_two_phase(
    name: &str,
    ctx: &mut FunctionContext,
    partitions: Vec<Vec<Datum>>,
) -> Datum {
    let agg = resolve(name).unwrap();
    let mut partials = Vec::with_capacity(partitions.len());
    for part in partitions {
        let mut state = agg.init(ctx).unwrap();
        for v in part {
            agg.update(ctx, &[v], &mut state).unwrap();
        }
        partials.push(agg.serialize(ctx, state).unwrap());
    }

    let mut merged = agg.init(ctx).unwrap();
    for partial in &partials {
        agg.merge(ctx, partial, &mut merged).unwrap();
    }
    let out = agg.finalize(ctx, merged).unwrap();
    assert_eq!(ctx.outstanding_bytes(), 0, "aggregate state leaked");
    out
}

pub fn as_string(out: &Datum) -> String {
    match out {
        Datum::Varchar(bytes) => String::from_utf8(bytes.clone()).unwrap(),
        other => panic!("expected varchar output, got {:?}", other),
    }
}

pub fn as_f64(out: &Datum) -> f64 {
    match out {
        Datum::Double(v) => *v,
        other => panic!("expected double output, got {:?}", other),
    }
}

pub fn as_i64(out: &Datum) -> i64 {
    match out {
        Datum::BigInt(v) => *v,
        other => panic!("expected bigint output, got {:?}", other),
    }
}
