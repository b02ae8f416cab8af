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

use crate::agg::state::{get_f64, get_i128, get_i64, put_f64, put_i128, put_i64};
use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::{decimal, Datum, TimestampValue, TypeKind};

/// avg over numerics (`{f64 sum; i64 count}`), timestamps (folded as
/// fractional days through the same state) and decimals
/// (`{i128 sum; i64 count}`, sum carried at the return type's scale).
///
/// The variant is chosen by the declared return type: Double for the
/// numeric average, Timestamp and Decimal for the specialized ones.
pub(in crate::agg) struct AvgAgg;

#[derive(Clone, Copy, PartialEq)]
enum AvgKind {
    Numeric,
    Timestamp,
    Decimal,
}

const NUMERIC_STATE_LEN: usize = 16;
const DECIMAL_STATE_LEN: usize = 24;

fn avg_kind(ctx: &FunctionContext) -> Result<AvgKind, String> {
    match ctx.get_return_type().kind {
        TypeKind::Double => Ok(AvgKind::Numeric),
        TypeKind::Timestamp => Ok(AvgKind::Timestamp),
        TypeKind::Decimal => Ok(AvgKind::Decimal),
        other => Err(format!("avg unsupported return type: {:?}", other)),
    }
}

fn state_len(kind: AvgKind) -> usize {
    match kind {
        AvgKind::Numeric | AvgKind::Timestamp => NUMERIC_STATE_LEN,
        AvgKind::Decimal => DECIMAL_STATE_LEN,
    }
}

fn current_value(ctx: &mut FunctionContext, state: &[u8]) -> Result<Datum, String> {
    match avg_kind(ctx)? {
        AvgKind::Numeric => {
            let count = get_i64(state, 8);
            if count == 0 {
                return Ok(Datum::Null);
            }
            Ok(Datum::Double(get_f64(state, 0) / count as f64))
        }
        AvgKind::Timestamp => {
            let count = get_i64(state, 8);
            if count == 0 {
                return Ok(Datum::Null);
            }
            let days = get_f64(state, 0) / count as f64;
            Ok(Datum::Timestamp(TimestampValue::from_days(days)))
        }
        AvgKind::Decimal => {
            let count = get_i64(state, 16);
            if count == 0 {
                return Ok(Datum::Null);
            }
            let out_scale = ctx.get_return_type().scale;
            // The accumulated sum already carries the return scale, so the
            // division happens entirely at that scale.
            let result = decimal::divide(get_i128(state, 0), out_scale, count, out_scale);
            if result.is_nan {
                return Ok(Datum::Null);
            }
            if result.overflow {
                ctx.add_warning("Avg computation overflowed, returning NULL");
                return Ok(Datum::Null);
            }
            Ok(Datum::Decimal(result.value))
        }
    }
}

impl AggregateFunction for AvgAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        let kind = avg_kind(ctx)?;
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
            .ok_or_else(|| "avg expects one argument".to_string())?;
        if src.is_null() {
            return Ok(());
        }
        let kind = avg_kind(ctx)?;
        let buf = state.as_mut_slice();
        match kind {
            AvgKind::Numeric => {
                let v = src
                    .as_f64()
                    .ok_or_else(|| format!("avg input type mismatch: {:?}", src.kind()))?;
                put_f64(buf, 0, get_f64(buf, 0) + v);
                put_i64(buf, 8, get_i64(buf, 8) + 1);
            }
            AvgKind::Timestamp => {
                let v = src
                    .as_timestamp()
                    .ok_or_else(|| format!("avg input type mismatch: {:?}", src.kind()))?;
                put_f64(buf, 0, get_f64(buf, 0) + v.to_days());
                put_i64(buf, 8, get_i64(buf, 8) + 1);
            }
            AvgKind::Decimal => {
                let v = src
                    .as_i128()
                    .ok_or_else(|| format!("avg input type mismatch: {:?}", src.kind()))?;
                if let Some(arg) = ctx.get_arg_type(0) {
                    debug_assert!(decimal::fits_width(
                        v,
                        decimal::width_for_precision(arg.precision)
                    ));
                }
                put_i128(buf, 0, get_i128(buf, 0).wrapping_add(v));
                put_i64(buf, 16, get_i64(buf, 16) + 1);
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
        let kind = avg_kind(ctx)?;
        let expected = state_len(kind);
        if src.len() != expected {
            return Err(format!(
                "avg intermediate size mismatch: expected {}, got {}",
                expected,
                src.len()
            ));
        }
        let buf = state.as_mut_slice();
        match kind {
            AvgKind::Numeric | AvgKind::Timestamp => {
                put_f64(buf, 0, get_f64(buf, 0) + get_f64(src, 0));
                put_i64(buf, 8, get_i64(buf, 8) + get_i64(src, 8));
            }
            AvgKind::Decimal => {
                put_i128(buf, 0, get_i128(buf, 0).wrapping_add(get_i128(src, 0)));
                put_i64(buf, 16, get_i64(buf, 16) + get_i64(src, 16));
            }
        }
        Ok(())
    }

    fn get_value(&self, ctx: &mut FunctionContext, state: &mut StateBuf) -> Result<Datum, String> {
        current_value(ctx, state.as_slice())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let result = current_value(ctx, state.as_slice());
        ctx.free(state);
        result
    }
}
