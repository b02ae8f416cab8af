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

//! Flajolet-Martin probabilistic counting (Probabilistic Counting
//! Algorithms for Data Base Applications). Two variants share the state:
//! plain averaging hashes every value once per bitmap row with a
//! per-row seed; stochastic averaging (PCSA) hashes once and lets the
//! low bits pick the row.

use crate::agg::state::{get_u32, put_u32};
use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::Datum;

pub(in crate::agg) struct PcAgg {
    pub(in crate::agg) stochastic: bool,
}

const NUM_BITMAPS: usize = 64;
const BITMAP_LENGTH: u32 = 32;
/// Correction factor from the paper.
const PC_THETA: f64 = 0.77351;

const STATE_LEN: usize = NUM_BITMAPS * BITMAP_LENGTH as usize / 8;

/// The bitmap is a 64-row x 32-column bit matrix viewed as u32[64],
/// bit `(row, col)` being `word[row] & (1 << col)`.
fn set_bit(buf: &mut [u8], row: usize, col: u32) {
    let word = get_u32(buf, row * 4) | (1u32 << col);
    put_u32(buf, row * 4, word);
}

fn get_bit(buf: &[u8], row: usize, col: u32) -> bool {
    get_u32(buf, row * 4) & (1u32 << col) != 0
}

fn estimate(buf: &[u8]) -> f64 {
    if buf.iter().all(|b| *b == 0) {
        // No rows processed, zero distinct values.
        return 0.0;
    }

    // Average the number of leading 1-bits per row; the count is
    // proportional to log2 of 1/NUM_BITMAPS of the true cardinality, so
    // the estimate is 2^avg / theta.
    let mut sum = 0u32;
    for row in 0..NUM_BITMAPS {
        let mut run = 0u32;
        while run < BITMAP_LENGTH && get_bit(buf, row, run) {
            run += 1;
        }
        sum += run;
    }
    let avg = sum as f64 / NUM_BITMAPS as f64;
    2f64.powf(avg) / PC_THETA
}

impl AggregateFunction for PcAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        Ok(ctx.allocate(STATE_LEN))
    }

    fn update(
        &self,
        ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let src = args
            .first()
            .ok_or_else(|| "distinct estimate expects one argument".to_string())?;
        if src.is_null() {
            return Ok(());
        }
        let desc = *ctx
            .get_arg_type(0)
            .ok_or_else(|| "distinct estimate argument type missing".to_string())?;
        let buf = state.as_mut_slice();
        if self.stochastic {
            let hash = src.hash32(&desc, 0);
            let row = (hash as usize) % NUM_BITMAPS;
            let col = if hash == 0 {
                BITMAP_LENGTH - 1
            } else {
                // The quotient can lose its low one-bit entirely when the
                // hash is below 64; cap the column at the last slot.
                (hash / NUM_BITMAPS as u32)
                    .trailing_zeros()
                    .min(BITMAP_LENGTH - 1)
            };
            set_bit(buf, row, col);
        } else {
            for row in 0..NUM_BITMAPS {
                let hash = src.hash32(&desc, row as u32);
                let col = if hash == 0 {
                    BITMAP_LENGTH - 1
                } else {
                    hash.trailing_zeros()
                };
                set_bit(buf, row, col);
            }
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
                "distinct estimate intermediate size mismatch: expected {}, got {}",
                STATE_LEN,
                src.len()
            ));
        }
        for (dst, s) in state.as_mut_slice().iter_mut().zip(src.iter()) {
            *dst |= *s;
        }
        Ok(())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let mut raw = estimate(state.as_slice());
        if self.stochastic {
            // Stochastic averaging spreads the input over the rows, so
            // the per-row estimate has to be scaled back up.
            raw *= NUM_BITMAPS as f64;
        }
        ctx.free(state);
        let result = raw as i64;
        // Historical quirk kept for result parity: the estimate is
        // returned as its decimal string rather than as a bigint.
        Ok(Datum::Varchar(result.to_string().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix_addressing() {
        let mut buf = vec![0u8; STATE_LEN];
        set_bit(&mut buf, 0, 0);
        set_bit(&mut buf, 63, 31);
        set_bit(&mut buf, 7, 13);
        assert!(get_bit(&buf, 0, 0));
        assert!(get_bit(&buf, 63, 31));
        assert!(get_bit(&buf, 7, 13));
        assert!(!get_bit(&buf, 7, 14));
        // Row 63, column 31 is the top bit of the last u32 word.
        assert_eq!(buf[STATE_LEN - 1] & 0x80, 0x80);
    }

    #[test]
    fn test_estimate_empty_is_zero() {
        let buf = vec![0u8; STATE_LEN];
        assert_eq!(estimate(&buf), 0.0);
    }

    #[test]
    fn test_estimate_counts_leading_runs() {
        let mut buf = vec![0u8; STATE_LEN];
        // One leading 1-bit in every row: avg = 1, estimate = 2 / theta.
        for row in 0..NUM_BITMAPS {
            set_bit(&mut buf, row, 0);
        }
        let expected = 2.0 / PC_THETA;
        assert!((estimate(&buf) - expected).abs() < 1e-9);
    }
}
