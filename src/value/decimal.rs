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

use arrow_buffer::i256;

pub const MAX_PRECISION: u8 = 38;

/// Physical storage width in bytes for a decimal of the given declared
/// precision: up to 9 digits fit 4 bytes, up to 19 fit 8, the rest 16.
pub fn width_for_precision(precision: u8) -> usize {
    if precision <= 9 {
        4
    } else if precision <= 19 {
        8
    } else {
        16
    }
}

/// Whether `value` survives a round trip through a `width`-byte slot.
pub fn fits_width(value: i128, width: usize) -> bool {
    match width {
        4 => i32::try_from(value).is_ok(),
        8 => i64::try_from(value).is_ok(),
        _ => true,
    }
}

/// Compute 10^exp in i128 with overflow checking.
pub fn pow10_i128(exp: usize) -> Result<i128, String> {
    let mut out: i128 = 1;
    for _ in 0..exp {
        out = out
            .checked_mul(10)
            .ok_or_else(|| "decimal overflow".to_string())?;
    }
    Ok(out)
}

fn pow10_i256(exp: usize) -> i256 {
    let mut out = i256::ONE;
    let ten = i256::from_i128(10);
    for _ in 0..exp {
        // 10^38 is far inside the i256 range.
        out = out.wrapping_mul(ten);
    }
    out
}

/// Integer division with ROUND_HALF_UP (half away from zero).
pub fn div_round_i128(dividend: i128, divisor: i128) -> i128 {
    debug_assert!(divisor != 0);

    let mut q = dividend / divisor;
    let r = dividend % divisor;

    if r == 0 {
        return q;
    }

    let abs_b = divisor.abs();
    let abs_r = r.abs();
    let threshold = (abs_b >> 1) + (abs_b & 1);

    if abs_r.cmp(&threshold) != Ordering::Less {
        let carry = if (dividend ^ divisor) < 0 { -1 } else { 1 };
        q += carry;
    }

    q
}

fn div_round_i256(dividend: i256, divisor: i256) -> i256 {
    debug_assert!(divisor != i256::ZERO);

    let mut q = dividend.wrapping_div(divisor);
    let r = dividend.wrapping_rem(divisor);

    if r == i256::ZERO {
        return q;
    }

    let abs_b = if divisor.is_negative() {
        divisor.wrapping_neg()
    } else {
        divisor
    };
    let abs_r = if r.is_negative() {
        r.wrapping_neg()
    } else {
        r
    };
    let threshold = (abs_b >> 1).wrapping_add(abs_b & i256::ONE);

    if abs_r.cmp(&threshold) != Ordering::Less {
        let carry = if dividend.is_negative() ^ divisor.is_negative() {
            i256::MINUS_ONE
        } else {
            i256::ONE
        };
        q = q.wrapping_add(carry);
    }

    q
}

#[derive(Clone, Copy, Debug)]
pub struct DivideResult {
    pub value: i128,
    pub is_nan: bool,
    pub overflow: bool,
}

/// Divide an accumulated decimal sum by an integer count, producing a
/// value at `out_scale`. The intermediate runs in 256 bits so rescaling
/// cannot wrap; `overflow` reports a result outside precision 38.
pub fn divide(sum: i128, sum_scale: i8, count: i64, out_scale: i8) -> DivideResult {
    if count == 0 {
        return DivideResult {
            value: 0,
            is_nan: true,
            overflow: false,
        };
    }

    let mut scaled = i256::from_i128(sum);
    let scale_diff = out_scale as i32 - sum_scale as i32;
    if scale_diff > 0 {
        scaled = scaled.wrapping_mul(pow10_i256(scale_diff as usize));
    } else if scale_diff < 0 {
        scaled = div_round_i256(scaled, pow10_i256(scale_diff.unsigned_abs() as usize));
    }

    let quotient = div_round_i256(scaled, i256::from_i128(count as i128));
    let abs_quotient = if quotient.is_negative() {
        quotient.wrapping_neg()
    } else {
        quotient
    };
    let bound = pow10_i256(MAX_PRECISION as usize);
    if abs_quotient >= bound {
        return DivideResult {
            value: 0,
            is_nan: false,
            overflow: true,
        };
    }
    match quotient.to_i128() {
        Some(value) => DivideResult {
            value,
            is_nan: false,
            overflow: false,
        },
        None => DivideResult {
            value: 0,
            is_nan: false,
            overflow: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_round_half_away_from_zero() {
        assert_eq!(div_round_i128(15, 10), 2);
        assert_eq!(div_round_i128(-15, 10), -2);
        assert_eq!(div_round_i128(14, 10), 1);
        assert_eq!(div_round_i128(-14, 10), -1);
        assert_eq!(div_round_i128(16, -10), -2);
    }

    #[test]
    fn test_divide_rounds_at_out_scale() {
        // avg(0.01, 0.02) at scale 2: 3 / 2 -> 2 (0.02).
        let r = divide(3, 2, 2, 2);
        assert!(!r.is_nan && !r.overflow);
        assert_eq!(r.value, 2);
    }

    #[test]
    fn test_divide_zero_count_is_nan() {
        assert!(divide(1, 0, 0, 0).is_nan);
    }

    #[test]
    fn test_divide_overflow_detected() {
        let max38 = pow10_i128(38).unwrap() - 1;
        let r = divide(max38, 0, 1, 4);
        assert!(r.overflow);
    }

    #[test]
    fn test_width_for_precision() {
        assert_eq!(width_for_precision(9), 4);
        assert_eq!(width_for_precision(10), 8);
        assert_eq!(width_for_precision(19), 8);
        assert_eq!(width_for_precision(38), 16);
    }
}
