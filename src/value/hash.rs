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

//! Seeded FNV-1a hashing. The distinct estimators depend on this exact
//! algorithm: partial states hashed on different nodes must agree
//! bit-for-bit before they are merged.

pub const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;
pub const FNV64_SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a over `data`, continuing from `hash`. Pass [`FNV64_SEED`] (or a
/// per-stream variation of it) as the initial value.
pub fn fnv_hash64(data: &[u8], hash: u64) -> u64 {
    let mut hash = hash;
    for byte in data {
        hash = (hash ^ *byte as u64).wrapping_mul(FNV64_PRIME);
    }
    hash
}

/// 64-bit hash folded to 32 bits by xoring the halves.
pub fn fnv_hash64_to32(data: &[u8], hash: u64) -> u32 {
    let hash = fnv_hash64(data, hash);
    ((hash >> 32) ^ (hash & 0xffff_ffff)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_vectors() {
        // Standard FNV-1a 64 test vectors.
        assert_eq!(fnv_hash64(b"", FNV64_SEED), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv_hash64(b"a", FNV64_SEED), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv_hash64(b"foobar", FNV64_SEED), 0x85944171f73967e8);
    }

    #[test]
    fn test_seed_changes_stream() {
        let a = fnv_hash64(b"payload", FNV64_SEED);
        let b = fnv_hash64(b"payload", FNV64_SEED ^ 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fold_mixes_both_halves() {
        let h = fnv_hash64(b"x", FNV64_SEED);
        let folded = fnv_hash64_to32(b"x", FNV64_SEED);
        assert_eq!(folded, ((h >> 32) ^ (h & 0xffff_ffff)) as u32);
    }
}
