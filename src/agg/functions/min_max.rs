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

use std::cmp::Ordering;

use crate::agg::functions::common::{decode_value, encode_value, expect_kind, value_width};
use crate::agg::state::{get_u8, put_u8};
use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::{Datum, TypeKind};

/// min / max under the value type's total order. Fixed-width kinds keep
/// the value image plus a has-value flag; varchar keeps the flag byte
/// followed by an owned copy of the current extreme (replacing it
/// deep-copies the new value through the context allocator).
pub(in crate::agg) struct MinMaxAgg {
    pub(in crate::agg) is_min: bool,
}

fn arg_kind(ctx: &FunctionContext, what: &str) -> Result<TypeKind, String> {
    ctx.get_arg_type(0)
        .map(|desc| desc.kind)
        .ok_or_else(|| format!("{} argument type missing", what))
}

impl MinMaxAgg {
    fn name(&self) -> &'static str {
        if self.is_min { "min" } else { "max" }
    }

    fn replaces(&self, current: &Datum, candidate: &Datum) -> Result<bool, String> {
        let ord = candidate.total_cmp(current)?;
        Ok(if self.is_min {
            ord == Ordering::Less
        } else {
            ord == Ordering::Greater
        })
    }

    fn fold(
        &self,
        ctx: &mut FunctionContext,
        kind: TypeKind,
        value: &Datum,
        state: &mut StateBuf,
    ) -> Result<(), String> {
        if kind == TypeKind::Varchar {
            let bytes = value
                .as_bytes()
                .ok_or_else(|| format!("{} input type mismatch: {:?}", self.name(), value.kind()))?;
            let replace = if get_u8(state.as_slice(), 0) == 0 {
                true
            } else {
                let current = Datum::Varchar(state.as_slice()[1..].to_vec());
                self.replaces(&current, value)?
            };
            if replace {
                ctx.reallocate(state, 1 + bytes.len());
                let buf = state.as_mut_slice();
                put_u8(buf, 0, 1);
                buf[1..].copy_from_slice(bytes);
            }
            return Ok(());
        }

        expect_kind(value, kind, self.name())?;
        let width = value_width(kind)?;
        let replace = if get_u8(state.as_slice(), width) == 0 {
            true
        } else {
            let current = decode_value(kind, state.as_slice(), 0)?;
            self.replaces(&current, value)?
        };
        if replace {
            let buf = state.as_mut_slice();
            encode_value(buf, 0, value)?;
            put_u8(buf, width, 1);
        }
        Ok(())
    }
}

impl AggregateFunction for MinMaxAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        let kind = arg_kind(ctx, self.name())?;
        let len = match kind {
            TypeKind::Varchar => 1,
            other => value_width(other)? + 1,
        };
        Ok(ctx.allocate(len))
    }

    fn update(
        &self,
        ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let src = args
            .first()
            .ok_or_else(|| format!("{} expects one argument", self.name()))?;
        if src.is_null() {
            return Ok(());
        }
        let kind = arg_kind(ctx, self.name())?;
        self.fold(ctx, kind, src, state)
    }

    fn merge(
        &self,
        ctx: &mut FunctionContext,
        src: &[u8],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let kind = arg_kind(ctx, self.name())?;
        if src.is_empty() {
            return Err(format!("{} intermediate is empty", self.name()));
        }
        let value = if kind == TypeKind::Varchar {
            if get_u8(src, 0) == 0 {
                return Ok(());
            }
            Datum::Varchar(src[1..].to_vec())
        } else {
            let width = value_width(kind)?;
            if src.len() != width + 1 {
                return Err(format!(
                    "{} intermediate size mismatch: expected {}, got {}",
                    self.name(),
                    width + 1,
                    src.len()
                ));
            }
            if get_u8(src, width) == 0 {
                return Ok(());
            }
            decode_value(kind, src, 0)?
        };
        self.fold(ctx, kind, &value, state)
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let kind = arg_kind(ctx, self.name())?;
        let result = if kind == TypeKind::Varchar {
            if get_u8(state.as_slice(), 0) == 0 {
                Datum::Null
            } else {
                Datum::Varchar(state.as_slice()[1..].to_vec())
            }
        } else {
            let width = value_width(kind)?;
            if get_u8(state.as_slice(), width) == 0 {
                Datum::Null
            } else {
                decode_value(kind, state.as_slice(), 0)?
            }
        };
        ctx.free(state);
        Ok(result)
    }
}
