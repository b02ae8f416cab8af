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

//! Single-pass variance (Welford/Knuth). An aggregate must not rescan
//! its input, so the textbook two-pass formulation is not an option;
//! the state carries the running mean, the sum of squared deviations
//! and the count, and partials combine with the parallel update rule.

use crate::agg::state::{get_f64, get_i64, put_f64, put_i64};
use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::Datum;

#[derive(Clone, Copy, Debug)]
pub(in crate::agg) enum VarKind {
    VariancePop,
    VarianceSamp,
    StddevPop,
    StddevSamp,
}

pub(in crate::agg) struct VarStdAgg {
    pub(in crate::agg) kind: VarKind,
}

const STATE_LEN: usize = 24;

const MEAN: usize = 0;
const M2: usize = 8;
const COUNT: usize = 16;

fn compute_variance(m2: f64, count: i64, pop: bool) -> f64 {
    // A single observation has zero variance by convention.
    if count == 1 {
        return 0.0;
    }
    if pop {
        m2 / count as f64
    } else {
        m2 / (count - 1) as f64
    }
}

fn merge_state(buf: &mut [u8], src_mean: f64, src_m2: f64, src_count: i64) {
    if src_count == 0 {
        return;
    }
    let dst_mean = get_f64(buf, MEAN);
    let dst_m2 = get_f64(buf, M2);
    let dst_count = get_i64(buf, COUNT);
    if dst_count == 0 {
        put_f64(buf, MEAN, src_mean);
        put_f64(buf, M2, src_m2);
        put_i64(buf, COUNT, src_count);
        return;
    }
    let delta = dst_mean - src_mean;
    let sum_count = (dst_count + src_count) as f64;
    put_f64(buf, MEAN, src_mean + delta * (dst_count as f64 / sum_count));
    put_f64(
        buf,
        M2,
        src_m2 + dst_m2 + (delta * delta) * (src_count as f64 * dst_count as f64 / sum_count),
    );
    put_i64(buf, COUNT, dst_count + src_count);
}

impl AggregateFunction for VarStdAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        Ok(ctx.allocate(STATE_LEN))
    }

    fn update(
        &self,
        _ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let src = args
            .first()
            .ok_or_else(|| "variance expects one argument".to_string())?;
        if src.is_null() {
            return Ok(());
        }
        let v = src
            .as_f64()
            .ok_or_else(|| format!("variance input type mismatch: {:?}", src.kind()))?;
        let buf = state.as_mut_slice();
        let count = get_i64(buf, COUNT);
        let mean = get_f64(buf, MEAN);
        let temp = count + 1;
        let delta = v - mean;
        let r = delta / temp as f64;
        put_f64(buf, MEAN, mean + r);
        put_f64(buf, M2, get_f64(buf, M2) + count as f64 * delta * r);
        put_i64(buf, COUNT, temp);
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
                "variance intermediate size mismatch: expected {}, got {}",
                STATE_LEN,
                src.len()
            ));
        }
        merge_state(
            state.as_mut_slice(),
            get_f64(src, MEAN),
            get_f64(src, M2),
            get_i64(src, COUNT),
        );
        Ok(())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let buf = state.as_slice();
        let m2 = get_f64(buf, M2);
        let count = get_i64(buf, COUNT);
        ctx.free(state);

        if count == 0 {
            return Ok(Datum::Null);
        }
        let result = match self.kind {
            VarKind::VarianceSamp => {
                return Ok(Datum::Double(compute_variance(m2, count, false)));
            }
            VarKind::VariancePop => compute_variance(m2, count, true),
            VarKind::StddevSamp => compute_variance(m2, count, false).sqrt(),
            VarKind::StddevPop => compute_variance(m2, count, true).sqrt(),
        };
        // The string-typed finalizes predate a numeric return path and
        // are kept for result parity.
        Ok(Datum::Varchar(result.to_string().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_merge_matches_single_pass() {
        // Fold [1, 2] and [3, 4, 5] separately, merge, and compare with
        // folding [1, 2, 3, 4, 5] in one state.
        let fold = |values: &[f64]| {
            let mut buf = vec![0u8; STATE_LEN];
            for v in values {
                let count = get_i64(&buf, COUNT);
                let mean = get_f64(&buf, MEAN);
                let temp = count + 1;
                let delta = v - mean;
                let r = delta / temp as f64;
                put_f64(&mut buf, MEAN, mean + r);
                let m2 = get_f64(&buf, M2);
                put_f64(&mut buf, M2, m2 + count as f64 * delta * r);
                put_i64(&mut buf, COUNT, temp);
            }
            buf
        };
        let left = fold(&[1.0, 2.0]);
        let right = fold(&[3.0, 4.0, 5.0]);
        let whole = fold(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let mut merged = left;
        merge_state(
            &mut merged,
            get_f64(&right, MEAN),
            get_f64(&right, M2),
            get_i64(&right, COUNT),
        );
        assert_eq!(get_i64(&merged, COUNT), 5);
        assert!((get_f64(&merged, MEAN) - get_f64(&whole, MEAN)).abs() < 1e-12);
        assert!((get_f64(&merged, M2) - get_f64(&whole, M2)).abs() < 1e-9);
    }

    #[test]
    fn test_merge_into_empty_state_copies_source() {
        let mut buf = vec![0u8; STATE_LEN];
        merge_state(&mut buf, 2.5, 10.0, 4);
        assert_eq!(get_f64(&buf, MEAN), 2.5);
        assert_eq!(get_f64(&buf, M2), 10.0);
        assert_eq!(get_i64(&buf, COUNT), 4);
    }
}
