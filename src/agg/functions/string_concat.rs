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

use crate::agg::state::{get_i32, put_i32};
use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::Datum;

/// group_concat. The intermediate state starts with an i32 header
/// holding the length of the first separator seen, followed by the
/// accumulated payload, which itself begins with that separator. The
/// shape makes merge a header-skipping byte append, and finalize only
/// has to drop the header plus the leading separator.
pub(in crate::agg) struct StringConcatAgg;

const HEADER_LEN: usize = 4;

/// Separator used when the caller passes NULL.
const DEFAULT_SEPARATOR: &[u8] = b", ";

impl AggregateFunction for StringConcatAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        // NULL until the first value arrives.
        Ok(ctx.allocate(0))
    }

    fn update(
        &self,
        ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let src = args
            .first()
            .ok_or_else(|| "group_concat expects a value argument".to_string())?;
        if src.is_null() {
            return Ok(());
        }
        let value = src
            .as_bytes()
            .ok_or_else(|| format!("group_concat input type mismatch: {:?}", src.kind()))?;
        let sep = match args.get(1) {
            None | Some(Datum::Null) => DEFAULT_SEPARATOR,
            Some(sep) => sep
                .as_bytes()
                .ok_or_else(|| format!("group_concat separator type mismatch: {:?}", sep.kind()))?,
        };

        if state.is_empty() {
            ctx.reallocate(state, HEADER_LEN);
            put_i32(state.as_mut_slice(), 0, sep.len() as i32);
        }
        let old_len = state.len();
        ctx.reallocate(state, old_len + sep.len() + value.len());
        let buf = state.as_mut_slice();
        buf[old_len..old_len + sep.len()].copy_from_slice(sep);
        buf[old_len + sep.len()..].copy_from_slice(value);
        Ok(())
    }

    fn merge(
        &self,
        ctx: &mut FunctionContext,
        src: &[u8],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        if src.is_empty() {
            return Ok(());
        }
        if src.len() < HEADER_LEN {
            return Err(format!(
                "group_concat intermediate is malformed: {} bytes",
                src.len()
            ));
        }
        if state.is_empty() {
            // Adopt the header (first-seen separator length) of the first
            // non-empty partial.
            ctx.reallocate(state, HEADER_LEN);
            state
                .as_mut_slice()
                .copy_from_slice(&src[..HEADER_LEN]);
        }
        let payload = &src[HEADER_LEN..];
        let old_len = state.len();
        ctx.reallocate(state, old_len + payload.len());
        state.as_mut_slice()[old_len..].copy_from_slice(payload);
        Ok(())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        if state.is_empty() {
            ctx.free(state);
            return Ok(Datum::Null);
        }
        let buf = state.as_slice();
        let sep_len = get_i32(buf, 0) as usize;
        if buf.len() < HEADER_LEN + sep_len {
            ctx.free(state);
            return Err("group_concat state is shorter than its separator".to_string());
        }
        let result = buf[HEADER_LEN + sep_len..].to_vec();
        ctx.free(state);
        Ok(Datum::Varchar(result))
    }
}
