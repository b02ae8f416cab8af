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

//! Streaming aggregate operators.
//!
//! Each operator is a bundle of pure functions over a position-independent
//! intermediate state: `init` produces the identity state, `update` folds
//! one row, `merge` combines a serialized partial produced on another
//! node, `serialize` emits the wire image, and `finalize` produces the
//! typed result and releases the state. Single-pass, partially mergeable:
//! the host parallelizes by folding independent states and merging them
//! in any grouping, and the documented state layouts make the merge unit
//! exactly the bytes that travel through the shuffle.

pub mod context;
mod functions;
pub mod state;

pub use context::FunctionContext;
pub use state::StateBuf;

use crate::value::Datum;

use functions::avg::AvgAgg;
use functions::count::CountAgg;
use functions::distinct_pc::PcAgg;
use functions::hll::HllAgg;
use functions::min_max::MinMaxAgg;
use functions::rank::RankAgg;
use functions::reservoir::{ReservoirAgg, ReservoirMode};
use functions::string_concat::StringConcatAgg;
use functions::sum::SumAgg;
use functions::variance::{VarKind, VarStdAgg};

/// One aggregate operator: five pure functions plus the analytic
/// `get_value` channel, sharing an intermediate [`StateBuf`].
///
/// Contracts:
/// - `update` skips NULL inputs; `args` is the full argument row so
///   multi-argument aggregates (`group_concat(value, separator)`) fit.
/// - `merge` is associative and commutative over serialized partials
///   (modulo floating-point rounding for the double-based states).
/// - `serialize` and `finalize` consume the state and return its buffer
///   to the context.
pub trait AggregateFunction: Send + Sync {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String>;

    fn update(
        &self,
        ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String>;

    fn merge(
        &self,
        ctx: &mut FunctionContext,
        src: &[u8],
        state: &mut StateBuf,
    ) -> Result<(), String>;

    fn serialize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Vec<u8>, String> {
        let bytes = state.as_slice().to_vec();
        ctx.free(state);
        Ok(bytes)
    }

    fn get_value(
        &self,
        _ctx: &mut FunctionContext,
        _state: &mut StateBuf,
    ) -> Result<Datum, String> {
        Err("get_value is not supported for this aggregate".to_string())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String>;
}

static COUNT: CountAgg = CountAgg { star: false };
static COUNT_STAR: CountAgg = CountAgg { star: true };
static SUM: SumAgg = SumAgg;
static MIN: MinMaxAgg = MinMaxAgg { is_min: true };
static MAX: MinMaxAgg = MinMaxAgg { is_min: false };
static AVG: AvgAgg = AvgAgg;
static GROUP_CONCAT: StringConcatAgg = StringConcatAgg;
static DISTINCT_PC: PcAgg = PcAgg { stochastic: false };
static DISTINCT_PCSA: PcAgg = PcAgg { stochastic: true };
static NDV: HllAgg = HllAgg;
static SAMPLE: ReservoirAgg = ReservoirAgg {
    mode: ReservoirMode::Sample,
};
static HISTOGRAM: ReservoirAgg = ReservoirAgg {
    mode: ReservoirMode::Histogram,
};
static APPX_MEDIAN: ReservoirAgg = ReservoirAgg {
    mode: ReservoirMode::AppxMedian,
};
static VARIANCE: VarStdAgg = VarStdAgg {
    kind: VarKind::VarianceSamp,
};
static VARIANCE_POP: VarStdAgg = VarStdAgg {
    kind: VarKind::VariancePop,
};
static STDDEV: VarStdAgg = VarStdAgg {
    kind: VarKind::StddevSamp,
};
static STDDEV_POP: VarStdAgg = VarStdAgg {
    kind: VarKind::StddevPop,
};
static RANK: RankAgg = RankAgg { dense: false };
static DENSE_RANK: RankAgg = RankAgg { dense: true };

/// Look up an aggregate operator by its function name.
pub fn resolve(name: &str) -> Result<&'static dyn AggregateFunction, String> {
    match name {
        "count" => Ok(&COUNT),
        "count_star" => Ok(&COUNT_STAR),
        "sum" => Ok(&SUM),
        "min" => Ok(&MIN),
        "max" => Ok(&MAX),
        "avg" => Ok(&AVG),
        "group_concat" | "string_agg" => Ok(&GROUP_CONCAT),
        "distinct_pc" | "distinctpc" => Ok(&DISTINCT_PC),
        "distinct_pcsa" | "distinctpcsa" => Ok(&DISTINCT_PCSA),
        "ndv" | "approx_count_distinct" => Ok(&NDV),
        "sample" => Ok(&SAMPLE),
        "histogram" => Ok(&HISTOGRAM),
        "appx_median" => Ok(&APPX_MEDIAN),
        "variance" | "variance_samp" | "var_samp" => Ok(&VARIANCE),
        "variance_pop" | "var_pop" => Ok(&VARIANCE_POP),
        "stddev" | "stddev_samp" | "std" => Ok(&STDDEV),
        "stddev_pop" => Ok(&STDDEV_POP),
        "rank" => Ok(&RANK),
        "dense_rank" => Ok(&DENSE_RANK),
        other => Err(format!("unsupported agg function: {}", other)),
    }
}
