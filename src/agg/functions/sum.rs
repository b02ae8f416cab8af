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

use crate::agg::state::{get_f64, get_i128, get_i64, get_u8, put_f64, put_i128, put_i64, put_u8};
use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::{decimal, Datum, TypeKind};

/// sum over integers (i64 accumulator, two's-complement modular),
/// floats (f64 accumulator) and decimals (i128 accumulator; the source
/// value arrives at the physical width selected by its declared
/// precision, and src/dst are guaranteed to share scale so the add is
/// plain integer addition).
///
/// State is the accumulator image followed by a has-value flag byte;
/// the empty aggregate finalizes to NULL.
pub(in crate::agg) struct SumAgg;

#[derive(Clone, Copy, PartialEq)]
enum SumKind {
    Int,
    Float,
    Decimal,
}

fn sum_kind(ctx: &FunctionContext) -> Result<SumKind, String> {
    let arg = ctx
        .get_arg_type(0)
        .ok_or_else(|| "sum argument type missing".to_string())?;
    match arg.kind {
        TypeKind::TinyInt | TypeKind::SmallInt | TypeKind::Int | TypeKind::BigInt => Ok(SumKind::Int),
        TypeKind::Float | TypeKind::Double => Ok(SumKind::Float),
        TypeKind::Decimal => Ok(SumKind::Decimal),
        other => Err(format!("sum unsupported input type: {:?}", other)),
    }
}

fn state_len(kind: SumKind) -> usize {
    match kind {
        SumKind::Int | SumKind::Float => 9,
        SumKind::Decimal => 17,
    }
}

impl AggregateFunction for SumAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        let kind = sum_kind(ctx)?;
        Ok(ctx.allocate(state_len(kind)))
    }

    fn update(
        &self,
        ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let src = args
            .first()
            .ok_or_else(|| "sum expects one argument".to_string())?;
        if src.is_null() {
            return Ok(());
        }
        let kind = sum_kind(ctx)?;
        let buf = state.as_mut_slice();
        match kind {
            SumKind::Int => {
                let v = src
                    .as_i64()
                    .ok_or_else(|| format!("sum input type mismatch: {:?}", src.kind()))?;
                put_i64(buf, 0, get_i64(buf, 0).wrapping_add(v));
                put_u8(buf, 8, 1);
            }
            SumKind::Float => {
                let v = src
                    .as_f64()
                    .ok_or_else(|| format!("sum input type mismatch: {:?}", src.kind()))?;
                put_f64(buf, 0, get_f64(buf, 0) + v);
                put_u8(buf, 8, 1);
            }
            SumKind::Decimal => {
                let v = src
                    .as_i128()
                    .ok_or_else(|| format!("sum input type mismatch: {:?}", src.kind()))?;
                let arg = ctx.get_arg_type(0).expect("checked by sum_kind");
                debug_assert!(decimal::fits_width(
                    v,
                    decimal::width_for_precision(arg.precision)
                ));
                put_i128(buf, 0, get_i128(buf, 0).wrapping_add(v));
                put_u8(buf, 16, 1);
            }
        }
        Ok(())
    }

    fn merge(
        &self,
        ctx: &mut FunctionContext,
        src: &[u8],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let kind = sum_kind(ctx)?;
        let expected = state_len(kind);
        if src.len() != expected {
            return Err(format!(
                "sum intermediate size mismatch: expected {}, got {}",
                expected,
                src.len()
            ));
        }
        let buf = state.as_mut_slice();
        match kind {
            SumKind::Int => {
                if get_u8(src, 8) == 0 {
                    return Ok(());
                }
                put_i64(buf, 0, get_i64(buf, 0).wrapping_add(get_i64(src, 0)));
                put_u8(buf, 8, 1);
            }
            SumKind::Float => {
                if get_u8(src, 8) == 0 {
                    return Ok(());
                }
                put_f64(buf, 0, get_f64(buf, 0) + get_f64(src, 0));
                put_u8(buf, 8, 1);
            }
            SumKind::Decimal => {
                if get_u8(src, 16) == 0 {
                    return Ok(());
                }
                put_i128(buf, 0, get_i128(buf, 0).wrapping_add(get_i128(src, 0)));
                put_u8(buf, 16, 1);
            }
        }
        Ok(())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let kind = sum_kind(ctx)?;
        let buf = state.as_slice();
        let result = match kind {
            SumKind::Int => {
                if get_u8(buf, 8) == 0 {
                    Datum::Null
                } else {
                    Datum::BigInt(get_i64(buf, 0))
                }
            }
            SumKind::Float => {
                if get_u8(buf, 8) == 0 {
                    Datum::Null
                } else {
                    Datum::Double(get_f64(buf, 0))
                }
            }
            SumKind::Decimal => {
                if get_u8(buf, 16) == 0 {
                    Datum::Null
                } else {
                    Datum::Decimal(get_i128(buf, 0))
                }
            }
        };
        ctx.free(state);
        Ok(result)
    }
}
