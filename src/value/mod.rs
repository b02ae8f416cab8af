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

pub mod decimal;
pub mod hash;

use std::cmp::Ordering;

use chrono::NaiveDate;

const UNIX_EPOCH_DAY_OFFSET: i32 = 719163;
const NANOS_PER_DAY: i64 = 86_400_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Timestamp,
    Varchar,
}

/// Declared type of an aggregate argument or return slot. Precision and
/// scale are only meaningful for `Decimal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeDesc {
    pub kind: TypeKind,
    pub precision: u8,
    pub scale: i8,
}

impl TypeDesc {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            precision: 0,
            scale: 0,
        }
    }

    pub fn decimal(precision: u8, scale: i8) -> Self {
        Self {
            kind: TypeKind::Decimal,
            precision,
            scale,
        }
    }
}

/// Calendar timestamp split into a day number (days since the Unix epoch)
/// and a time of day in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimestampValue {
    pub date: i32,
    pub time_of_day: i64,
}

impl TimestampValue {
    pub fn new(date: i32, time_of_day: i64) -> Self {
        Self { date, time_of_day }
    }

    /// Fractional days since the Unix epoch. Used by the averaging
    /// aggregates, which fold timestamps as doubles.
    pub fn to_days(self) -> f64 {
        self.date as f64 + self.time_of_day as f64 / NANOS_PER_DAY as f64
    }

    pub fn from_days(days: f64) -> Self {
        let mut date = days.floor() as i64;
        let mut time_of_day = ((days - days.floor()) * NANOS_PER_DAY as f64).round() as i64;
        if time_of_day >= NANOS_PER_DAY {
            date += 1;
            time_of_day -= NANOS_PER_DAY;
        }
        Self {
            date: date as i32,
            time_of_day,
        }
    }

    fn render(self) -> String {
        let date = NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_DAY_OFFSET + self.date)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        let seconds = self.time_of_day / 1_000_000_000;
        let nanos = self.time_of_day % 1_000_000_000;
        let base = format!(
            "{} {:02}:{:02}:{:02}",
            date.format("%Y-%m-%d"),
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        );
        if nanos == 0 {
            base
        } else {
            format!("{}.{:09}", base, nanos)
        }
    }
}

/// A tagged row value. `Null` stands for the SQL NULL of any type; update
/// paths skip it, so typed accessors never observe it.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Decimal(i128),
    Timestamp(TimestampValue),
    Varchar(Vec<u8>),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn kind(&self) -> Option<TypeKind> {
        match self {
            Datum::Null => None,
            Datum::Boolean(_) => Some(TypeKind::Boolean),
            Datum::TinyInt(_) => Some(TypeKind::TinyInt),
            Datum::SmallInt(_) => Some(TypeKind::SmallInt),
            Datum::Int(_) => Some(TypeKind::Int),
            Datum::BigInt(_) => Some(TypeKind::BigInt),
            Datum::Float(_) => Some(TypeKind::Float),
            Datum::Double(_) => Some(TypeKind::Double),
            Datum::Decimal(_) => Some(TypeKind::Decimal),
            Datum::Timestamp(_) => Some(TypeKind::Timestamp),
            Datum::Varchar(_) => Some(TypeKind::Varchar),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Boolean(v) => Some(*v as i64),
            Datum::TinyInt(v) => Some(*v as i64),
            Datum::SmallInt(v) => Some(*v as i64),
            Datum::Int(v) => Some(*v as i64),
            Datum::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::TinyInt(v) => Some(*v as f64),
            Datum::SmallInt(v) => Some(*v as f64),
            Datum::Int(v) => Some(*v as f64),
            Datum::BigInt(v) => Some(*v as f64),
            Datum::Float(v) => Some(*v as f64),
            Datum::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Datum::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<TimestampValue> {
        match self {
            Datum::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Datum::Varchar(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Packed little-endian byte image used for hashing. Decimals are
    /// hashed at the physical width selected by the declared precision,
    /// matching the storage width of the engine's decimal slots.
    pub fn raw_bytes(&self, desc: &TypeDesc) -> Vec<u8> {
        match self {
            Datum::Null => Vec::new(),
            Datum::Boolean(v) => vec![*v as u8],
            Datum::TinyInt(v) => v.to_le_bytes().to_vec(),
            Datum::SmallInt(v) => v.to_le_bytes().to_vec(),
            Datum::Int(v) => v.to_le_bytes().to_vec(),
            Datum::BigInt(v) => v.to_le_bytes().to_vec(),
            Datum::Float(v) => v.to_le_bytes().to_vec(),
            Datum::Double(v) => v.to_le_bytes().to_vec(),
            Datum::Decimal(v) => {
                let width = decimal::width_for_precision(desc.precision);
                debug_assert!(decimal::fits_width(*v, width));
                v.to_le_bytes()[..width].to_vec()
            }
            Datum::Timestamp(v) => {
                let mut out = Vec::with_capacity(12);
                out.extend_from_slice(&v.date.to_le_bytes());
                out.extend_from_slice(&v.time_of_day.to_le_bytes());
                out
            }
            Datum::Varchar(v) => v.clone(),
        }
    }

    /// Total order between two values of the same kind. Floats use the
    /// IEEE total order so the result is defined for NaN.
    pub fn total_cmp(&self, other: &Datum) -> Result<Ordering, String> {
        match (self, other) {
            (Datum::Boolean(l), Datum::Boolean(r)) => Ok(l.cmp(r)),
            (Datum::TinyInt(l), Datum::TinyInt(r)) => Ok(l.cmp(r)),
            (Datum::SmallInt(l), Datum::SmallInt(r)) => Ok(l.cmp(r)),
            (Datum::Int(l), Datum::Int(r)) => Ok(l.cmp(r)),
            (Datum::BigInt(l), Datum::BigInt(r)) => Ok(l.cmp(r)),
            (Datum::Float(l), Datum::Float(r)) => Ok(l.total_cmp(r)),
            (Datum::Double(l), Datum::Double(r)) => Ok(l.total_cmp(r)),
            (Datum::Decimal(l), Datum::Decimal(r)) => Ok(l.cmp(r)),
            (Datum::Timestamp(l), Datum::Timestamp(r)) => {
                Ok((l.date, l.time_of_day).cmp(&(r.date, r.time_of_day)))
            }
            (Datum::Varchar(l), Datum::Varchar(r)) => Ok(l.cmp(r)),
            _ => Err("value comparison type mismatch".to_string()),
        }
    }

    pub fn hash32(&self, desc: &TypeDesc, seed: u32) -> u32 {
        hash::fnv_hash64_to32(&self.raw_bytes(desc), hash::FNV64_SEED ^ seed as u64)
    }

    pub fn hash64(&self, desc: &TypeDesc, seed: u64) -> u64 {
        hash::fnv_hash64(&self.raw_bytes(desc), seed)
    }

    /// Render the value the way result sets print it: plain decimal
    /// notation, no locale, no exponent for integers.
    pub fn display(&self, desc: &TypeDesc) -> String {
        match self {
            Datum::Null => "NULL".to_string(),
            Datum::Boolean(v) => (if *v { "1" } else { "0" }).to_string(),
            Datum::TinyInt(v) => v.to_string(),
            Datum::SmallInt(v) => v.to_string(),
            Datum::Int(v) => v.to_string(),
            Datum::BigInt(v) => v.to_string(),
            Datum::Float(v) => v.to_string(),
            Datum::Double(v) => v.to_string(),
            Datum::Decimal(v) => format_decimal(*v, desc.scale),
            Datum::Timestamp(v) => v.render(),
            Datum::Varchar(v) => String::from_utf8_lossy(v).into_owned(),
        }
    }
}

fn format_decimal(unscaled: i128, scale: i8) -> String {
    let scale = scale as i32;
    if scale <= 0 {
        return unscaled.to_string();
    }

    let unscaled_str = unscaled.unsigned_abs().to_string();
    let scale_usize = scale as usize;

    if unscaled_str.len() <= scale_usize {
        let padded = format!("{:0>width$}", unscaled_str, width = scale_usize);
        if unscaled < 0 {
            format!("-0.{}", padded)
        } else {
            format!("0.{}", padded)
        }
    } else {
        let split_pos = unscaled_str.len() - scale_usize;
        let integer_part = &unscaled_str[..split_pos];
        let fractional_part = &unscaled_str[split_pos..];
        if unscaled < 0 {
            format!("-{}.{}", integer_part, fractional_part)
        } else {
            format!("{}.{}", integer_part, fractional_part)
        }
    }
}
