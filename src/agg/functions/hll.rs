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

use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::{hash, Datum};

/// HyperLogLog cardinality estimate. Precision taken from the paper;
/// it does not matter much when between [6, 12].
const HLL_PRECISION: u32 = 10;
const HLL_LEN: usize = 1 << HLL_PRECISION; // 1024 single-byte registers

pub(in crate::agg) struct HllAgg;

fn estimate(registers: &[u8]) -> i64 {
    let num_streams = HLL_LEN as f64;
    // Empirical alpha constants; the small-register values are listed
    // for completeness even though this state is fixed at 1024.
    let alpha = match HLL_LEN {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / num_streams),
    };

    let mut harmonic_mean = 0.0f64;
    let mut num_zero_registers = 0usize;
    for reg in registers {
        harmonic_mean += 2f64.powi(-(*reg as i32));
        if *reg == 0 {
            num_zero_registers += 1;
        }
    }
    harmonic_mean = 1.0 / harmonic_mean;
    let mut estimate = alpha * num_streams * num_streams * harmonic_mean;

    if num_zero_registers != 0 {
        // The raw estimate is unreliable at low occupancy; fall back to
        // linear counting over the empty registers.
        estimate = num_streams * (num_streams / num_zero_registers as f64).ln();
    }
    estimate as i64
}

impl AggregateFunction for HllAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        Ok(ctx.allocate(HLL_LEN))
    }

    fn update(
        &self,
        ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let src = args
            .first()
            .ok_or_else(|| "ndv expects one argument".to_string())?;
        if src.is_null() {
            return Ok(());
        }
        let desc = *ctx
            .get_arg_type(0)
            .ok_or_else(|| "ndv argument type missing".to_string())?;
        let hash_value = src.hash64(&desc, hash::FNV64_SEED);
        if hash_value != 0 {
            // Low bits pick the stream; the rank is the position of the
            // first one-bit after them.
            let idx = (hash_value & (HLL_LEN as u64 - 1)) as usize;
            let first_one_bit = ((hash_value >> HLL_PRECISION).trailing_zeros() + 1).min(64) as u8;
            let registers = state.as_mut_slice();
            registers[idx] = registers[idx].max(first_one_bit);
        }
        Ok(())
    }

    fn merge(
        &self,
        _ctx: &mut FunctionContext,
        src: &[u8],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        if src.len() != HLL_LEN {
            return Err(format!(
                "ndv intermediate size mismatch: expected {}, got {}",
                HLL_LEN,
                src.len()
            ));
        }
        for (dst, s) in state.as_mut_slice().iter_mut().zip(src.iter()) {
            *dst = (*dst).max(*s);
        }
        Ok(())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let result = estimate(state.as_slice());
        ctx.free(state);
        Ok(Datum::Varchar(result.to_string().into_bytes()))
    }
}
