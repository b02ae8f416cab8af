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

/// rank / dense_rank window states. The host calls `update` once per
/// peer row and `get_value` once per tie group; `update` counts peers
/// for rank while dense_rank expresses peers purely through how often
/// `get_value` is called.
pub(in crate::agg) struct RankAgg {
    pub(in crate::agg) dense: bool,
}

const STATE_LEN: usize = 16;

const RANK: usize = 0;
const COUNT: usize = 8;

impl AggregateFunction for RankAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        let mut state = ctx.allocate(STATE_LEN);
        put_i64(state.as_mut_slice(), RANK, 1);
        Ok(state)
    }

    fn update(
        &self,
        _ctx: &mut FunctionContext,
        _args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        if !self.dense {
            let buf = state.as_mut_slice();
            put_i64(buf, COUNT, get_i64(buf, COUNT) + 1);
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
                "rank intermediate size mismatch: expected {}, got {}",
                STATE_LEN,
                src.len()
            ));
        }
        // Ranks start at 1, so combining advances by the source's net
        // progress; identity states merge to the identity.
        let buf = state.as_mut_slice();
        put_i64(buf, RANK, get_i64(buf, RANK) + get_i64(src, RANK) - 1);
        put_i64(buf, COUNT, get_i64(buf, COUNT) + get_i64(src, COUNT));
        Ok(())
    }

    fn get_value(&self, _ctx: &mut FunctionContext, state: &mut StateBuf) -> Result<Datum, String> {
        let buf = state.as_mut_slice();
        let result = get_i64(buf, RANK);
        if self.dense {
            put_i64(buf, RANK, result + 1);
        } else {
            // The whole tie group shares this rank; the next distinct
            // value skips past it.
            put_i64(buf, RANK, result + get_i64(buf, COUNT));
            put_i64(buf, COUNT, 0);
        }
        Ok(Datum::BigInt(result))
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let result = get_i64(state.as_slice(), RANK);
        ctx.free(state);
        Ok(Datum::BigInt(result))
    }
}
