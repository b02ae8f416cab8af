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

use crate::agg::state::{get_i64, put_i64};
use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::Datum;

/// count / count_star. State is a bare i64; the empty aggregate is 0,
/// never NULL.
pub(in crate::agg) struct CountAgg {
    pub(in crate::agg) star: bool,
}

const STATE_LEN: usize = 8;

impl AggregateFunction for CountAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        Ok(ctx.allocate(STATE_LEN))
    }

    fn update(
        &self,
        _ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        // count_star counts rows regardless of its (absent) argument.
        let counted = self.star || args.first().is_some_and(|v| !v.is_null());
        if counted {
            let buf = state.as_mut_slice();
            put_i64(buf, 0, get_i64(buf, 0) + 1);
        }
        Ok(())
    }

    fn merge(
        &self,
        _ctx: &mut FunctionContext,
        src: &[u8],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        if src.len() != STATE_LEN {
            return Err(format!(
                "count intermediate size mismatch: expected {}, got {}",
                STATE_LEN,
                src.len()
            ));
        }
        let buf = state.as_mut_slice();
        put_i64(buf, 0, get_i64(buf, 0) + get_i64(src, 0));
        Ok(())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let count = get_i64(state.as_slice(), 0);
        ctx.free(state);
        Ok(Datum::BigInt(count))
    }
}
