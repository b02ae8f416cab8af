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

//! Reservoir sampling and the operators built on it (sample list,
//! histogram quantile boundaries, approximate median).
//!
//! The state is a fixed array of sample slots, each holding a value and
//! a weight key, followed by the sample count, the source size and the
//! generator state. Keys stay unassigned (-1) while a single partition
//! folds rows; before the state is shuffled, serialize assigns
//! approximate weighted-reservoir keys in
//! `[(source_size - num_samples) / source_size, 1]`, so that merging
//! partials keeps samples from larger partitions proportionally more
//! often. Merging then reduces to keeping the highest-keyed slots.

use std::collections::BinaryHeap;

use crate::agg::functions::common::{decode_value, encode_value, value_width};
use crate::agg::state::{get_f64, get_i32, get_i64, get_u64, put_f64, put_i32, put_i64, put_u64};
use crate::agg::{AggregateFunction, FunctionContext, StateBuf};
use crate::value::{Datum, TypeDesc, TypeKind};

const NUM_BUCKETS: usize = 100;
const NUM_SAMPLES_PER_BUCKET: usize = 200;
const NUM_SAMPLES: usize = NUM_BUCKETS * NUM_SAMPLES_PER_BUCKET;
/// Strings are stored truncated so the slot stays fixed size.
const MAX_STRING_SAMPLE_LEN: usize = 10;

#[derive(Clone, Copy, Debug)]
pub(in crate::agg) enum ReservoirMode {
    Sample,
    Histogram,
    AppxMedian,
}

pub(in crate::agg) struct ReservoirAgg {
    pub(in crate::agg) mode: ReservoirMode,
}

// Knuth's MMIX constants. One generator per state, its word stored in
// the wire image so replay across serialize boundaries is deterministic.
const LCG_MULT: u64 = 6364136223846793005;
const LCG_INC: u64 = 1442695040888963407;

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(LCG_MULT).wrapping_add(LCG_INC);
        // The raw LCG word has structured low bits; run it through the
        // murmur finalizer before any modulo draw.
        let mut z = self.0;
        z = (z ^ (z >> 33)).wrapping_mul(0xff51afd7ed558ccd);
        z = (z ^ (z >> 33)).wrapping_mul(0xc4ceb9fe1a85ec53);
        z ^ (z >> 33)
    }

    /// Uniform draw from `[0, max]`.
    fn next_inclusive(&mut self, max: i64) -> i64 {
        debug_assert!(max >= 0);
        (self.next() as u128 % (max as u128 + 1)) as i64
    }
}

struct Layout {
    kind: TypeKind,
    slot_len: usize,
    trailer: usize,
}

impl Layout {
    fn for_kind(kind: TypeKind) -> Result<Self, String> {
        let value_len = match kind {
            TypeKind::Varchar => MAX_STRING_SAMPLE_LEN + 4,
            other => value_width(other)?,
        };
        let slot_len = value_len + 8;
        Ok(Self {
            kind,
            slot_len,
            trailer: NUM_SAMPLES * slot_len,
        })
    }

    fn for_ctx(ctx: &FunctionContext, what: &str) -> Result<Self, String> {
        let desc = ctx
            .get_arg_type(0)
            .ok_or_else(|| format!("{} argument type missing", what))?;
        Self::for_kind(desc.kind)
    }

    fn state_len(&self) -> usize {
        self.trailer + 4 + 8 + 8
    }

    fn num_samples(&self, buf: &[u8]) -> usize {
        get_i32(buf, self.trailer) as usize
    }

    fn source_size(&self, buf: &[u8]) -> i64 {
        get_i64(buf, self.trailer + 4)
    }

    fn rng(&self, buf: &[u8]) -> Lcg {
        Lcg(get_u64(buf, self.trailer + 12))
    }

    fn store_rng(&self, buf: &mut [u8], rng: Lcg) {
        put_u64(buf, self.trailer + 12, rng.0);
    }

    fn key_at(&self, buf: &[u8], idx: usize) -> f64 {
        get_f64(buf, idx * self.slot_len + self.slot_len - 8)
    }

    fn write_slot(&self, buf: &mut [u8], idx: usize, value: &Datum, key: f64) -> Result<(), String> {
        let off = idx * self.slot_len;
        if self.kind == TypeKind::Varchar {
            let bytes = value
                .as_bytes()
                .ok_or_else(|| format!("sample input type mismatch: {:?}", value.kind()))?;
            let len = bytes.len().min(MAX_STRING_SAMPLE_LEN);
            buf[off..off + len].copy_from_slice(&bytes[..len]);
            for b in buf[off + len..off + MAX_STRING_SAMPLE_LEN].iter_mut() {
                *b = 0;
            }
            put_i32(buf, off + MAX_STRING_SAMPLE_LEN, len as i32);
        } else {
            encode_value(buf, off, value)?;
        }
        put_f64(buf, off + self.slot_len - 8, key);
        Ok(())
    }

    fn read_slot(&self, buf: &[u8], idx: usize) -> Result<(Datum, f64), String> {
        let off = idx * self.slot_len;
        let value = if self.kind == TypeKind::Varchar {
            let len = get_i32(buf, off + MAX_STRING_SAMPLE_LEN) as usize;
            Datum::Varchar(buf[off..off + len.min(MAX_STRING_SAMPLE_LEN)].to_vec())
        } else {
            decode_value(self.kind, buf, off)?
        };
        Ok((value, get_f64(buf, off + self.slot_len - 8)))
    }
}

/// Min-heap entry: `BinaryHeap` is a max-heap, so the ordering is
/// reversed to keep the smallest key on top.
struct HeapSlot {
    key: f64,
    val: Datum,
}

impl PartialEq for HeapSlot {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for HeapSlot {}

impl PartialOrd for HeapSlot {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapSlot {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.key.total_cmp(&self.key)
    }
}

fn sort_samples(samples: &mut [(Datum, f64)]) {
    samples.sort_by(|a, b| a.0.total_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
}

fn render_joined(samples: &[&Datum], desc: &TypeDesc) -> Datum {
    let rendered: Vec<String> = samples.iter().map(|v| v.display(desc)).collect();
    Datum::Varchar(rendered.join(", ").into_bytes())
}

impl AggregateFunction for ReservoirAgg {
    fn init(&self, ctx: &mut FunctionContext) -> Result<StateBuf, String> {
        let layout = Layout::for_ctx(ctx, "sample")?;
        Ok(ctx.allocate(layout.state_len()))
    }

    fn update(
        &self,
        ctx: &mut FunctionContext,
        args: &[Datum],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let src = args
            .first()
            .ok_or_else(|| "sample expects one argument".to_string())?;
        if src.is_null() {
            return Ok(());
        }
        let layout = Layout::for_ctx(ctx, "sample")?;
        let buf = state.as_mut_slice();
        let num_samples = layout.num_samples(buf);
        let source_size = layout.source_size(buf);

        if num_samples < NUM_SAMPLES {
            layout.write_slot(buf, num_samples, src, -1.0)?;
            put_i32(buf, layout.trailer, num_samples as i32 + 1);
        } else {
            let mut rng = layout.rng(buf);
            let r = rng.next_inclusive(source_size);
            layout.store_rng(buf, rng);
            if (r as usize) < NUM_SAMPLES {
                layout.write_slot(buf, r as usize, src, -1.0)?;
            }
        }
        put_i64(buf, layout.trailer + 4, source_size + 1);
        Ok(())
    }

    fn serialize(&self, ctx: &mut FunctionContext, mut state: StateBuf) -> Result<Vec<u8>, String> {
        let layout = Layout::for_ctx(ctx, "sample")?;
        let buf = state.as_mut_slice();
        let num_samples = layout.num_samples(buf);
        let source_size = layout.source_size(buf);

        // Weighted reservoir sampling assigns keys on insertion; within
        // one partition every row has the same weight, so key assignment
        // can be deferred to here and approximated by drawing from
        // [(source_size - num_samples) / source_size, 1]. Rows that were
        // not sampled would have keys below that range, which is what
        // biases the cross-partition merge toward larger sources.
        let mut rng = layout.rng(buf);
        for idx in 0..num_samples {
            if layout.key_at(buf, idx) >= 0.0 {
                continue;
            }
            let r = rng.next_inclusive(num_samples as i64 - 1);
            let key = (source_size - r) as f64 / source_size as f64;
            put_f64(
                buf,
                idx * layout.slot_len + layout.slot_len - 8,
                key,
            );
        }
        layout.store_rng(buf, rng);

        let bytes = state.as_slice().to_vec();
        ctx.free(state);
        Ok(bytes)
    }

    fn merge(
        &self,
        ctx: &mut FunctionContext,
        src: &[u8],
        state: &mut StateBuf,
    ) -> Result<(), String> {
        let layout = Layout::for_ctx(ctx, "sample")?;
        if src.len() != layout.state_len() {
            return Err(format!(
                "sample intermediate size mismatch: expected {}, got {}",
                layout.state_len(),
                src.len()
            ));
        }

        let buf = state.as_mut_slice();
        let mut heap = BinaryHeap::with_capacity(NUM_SAMPLES);
        for idx in 0..layout.num_samples(buf) {
            let (val, key) = layout.read_slot(buf, idx)?;
            heap.push(HeapSlot { key, val });
        }
        for idx in 0..layout.num_samples(src) {
            let (val, key) = layout.read_slot(src, idx)?;
            debug_assert!(key >= 0.0);
            if heap.len() < NUM_SAMPLES {
                heap.push(HeapSlot { key, val });
            } else if heap.peek().is_some_and(|min| key > min.key) {
                heap.pop();
                heap.push(HeapSlot { key, val });
            }
        }

        let merged = heap.into_vec();
        for (idx, slot) in merged.iter().enumerate() {
            layout.write_slot(buf, idx, &slot.val, slot.key)?;
        }
        put_i32(buf, layout.trailer, merged.len() as i32);
        let combined = layout.source_size(buf) + get_i64(src, layout.trailer + 4);
        put_i64(buf, layout.trailer + 4, combined);
        Ok(())
    }

    fn finalize(&self, ctx: &mut FunctionContext, state: StateBuf) -> Result<Datum, String> {
        let layout = Layout::for_ctx(ctx, "sample")?;
        let desc = *ctx.get_arg_type(0).expect("checked by layout");
        let buf = state.as_slice();
        let num_samples = layout.num_samples(buf);
        let mut samples = Vec::with_capacity(num_samples);
        for idx in 0..num_samples {
            samples.push(layout.read_slot(buf, idx)?);
        }
        ctx.free(state);

        match self.mode {
            ReservoirMode::Sample => {
                // Samples go out in slot order, which is insertion order
                // for a single-partition fold.
                let vals: Vec<&Datum> = samples.iter().map(|(v, _)| v).collect();
                Ok(render_joined(&vals, &desc))
            }
            ReservoirMode::Histogram => {
                sort_samples(&mut samples);
                let num_buckets = num_samples.min(NUM_BUCKETS);
                let samples_per_bucket = (num_samples / NUM_BUCKETS).max(1);
                let mut bounds = Vec::with_capacity(num_buckets);
                for bucket_idx in 0..num_buckets {
                    let sample_idx = (bucket_idx + 1) * samples_per_bucket - 1;
                    bounds.push(&samples[sample_idx].0);
                }
                Ok(render_joined(&bounds, &desc))
            }
            ReservoirMode::AppxMedian => {
                if num_samples == 0 {
                    return Ok(Datum::Null);
                }
                sort_samples(&mut samples);
                let median = &samples[num_samples / 2].0;
                Ok(Datum::Varchar(median.display(&desc).into_bytes()))
            }
        }
    }
}
