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

//! Packed value images shared by the fixed-slot operators (min/max
//! accumulators, reservoir sample slots).

use crate::agg::state::{
    get_f64, get_i128, get_i32, get_i64, get_u8, put_f64, put_i128, put_i32, put_i64, put_u8,
};
use crate::value::{Datum, TimestampValue, TypeKind};

/// Byte width of a value of `kind` inside a packed state slot.
/// Varchar slots are operator specific and not covered here.
pub(crate) fn value_width(kind: TypeKind) -> Result<usize, String> {
    match kind {
        TypeKind::Boolean | TypeKind::TinyInt => Ok(1),
        TypeKind::SmallInt => Ok(2),
        TypeKind::Int | TypeKind::Float => Ok(4),
        TypeKind::BigInt | TypeKind::Double => Ok(8),
        TypeKind::Timestamp => Ok(12),
        TypeKind::Decimal => Ok(16),
        TypeKind::Varchar => Err("varchar has no fixed slot width".to_string()),
    }
}

pub(crate) fn encode_value(buf: &mut [u8], off: usize, value: &Datum) -> Result<(), String> {
    match value {
        Datum::Boolean(v) => put_u8(buf, off, *v as u8),
        Datum::TinyInt(v) => put_u8(buf, off, *v as u8),
        Datum::SmallInt(v) => buf[off..off + 2].copy_from_slice(&v.to_le_bytes()),
        Datum::Int(v) => put_i32(buf, off, *v),
        Datum::BigInt(v) => put_i64(buf, off, *v),
        Datum::Float(v) => buf[off..off + 4].copy_from_slice(&v.to_le_bytes()),
        Datum::Double(v) => put_f64(buf, off, *v),
        Datum::Decimal(v) => put_i128(buf, off, *v),
        Datum::Timestamp(v) => {
            put_i32(buf, off, v.date);
            put_i64(buf, off + 4, v.time_of_day);
        }
        other => return Err(format!("value has no fixed slot encoding: {:?}", other)),
    }
    Ok(())
}

pub(crate) fn decode_value(kind: TypeKind, buf: &[u8], off: usize) -> Result<Datum, String> {
    match kind {
        TypeKind::Boolean => Ok(Datum::Boolean(get_u8(buf, off) != 0)),
        TypeKind::TinyInt => Ok(Datum::TinyInt(get_u8(buf, off) as i8)),
        TypeKind::SmallInt => Ok(Datum::SmallInt(i16::from_le_bytes(
            buf[off..off + 2].try_into().unwrap(),
        ))),
        TypeKind::Int => Ok(Datum::Int(get_i32(buf, off))),
        TypeKind::BigInt => Ok(Datum::BigInt(get_i64(buf, off))),
        TypeKind::Float => Ok(Datum::Float(f32::from_le_bytes(
            buf[off..off + 4].try_into().unwrap(),
        ))),
        TypeKind::Double => Ok(Datum::Double(get_f64(buf, off))),
        TypeKind::Decimal => Ok(Datum::Decimal(get_i128(buf, off))),
        TypeKind::Timestamp => Ok(Datum::Timestamp(TimestampValue::new(
            get_i32(buf, off),
            get_i64(buf, off + 4),
        ))),
        TypeKind::Varchar => Err("varchar has no fixed slot encoding".to_string()),
    }
}

/// The declared kind an update-side argument must carry, with a uniform
/// error message for mismatches.
pub(crate) fn expect_kind(value: &Datum, kind: TypeKind, what: &str) -> Result<(), String> {
    match value.kind() {
        Some(k) if k == kind => Ok(()),
        Some(other) => Err(format!("{} input type mismatch: {:?}", what, other)),
        None => Err(format!("{} input is unexpectedly null", what)),
    }
}
