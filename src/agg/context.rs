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

use tracing::warn;

use crate::value::TypeDesc;

use super::state::StateBuf;

/// Per-invocation execution context an aggregate runs against.
///
/// It owns the three services every operator needs: state-buffer
/// allocation with byte accounting (so the host's memory tracker sees
/// aggregate state), the declared argument/return type descriptors, and
/// a non-fatal warning channel.
///
/// Every buffer handed out by [`allocate`](Self::allocate) must come
/// back through [`free`](Self::free) (finalize and serialize do this);
/// [`outstanding_bytes`](Self::outstanding_bytes) reports what is still
/// live.
#[derive(Debug)]
pub struct FunctionContext {
    arg_types: Vec<TypeDesc>,
    return_type: TypeDesc,
    outstanding_bytes: i64,
    peak_bytes: i64,
    warnings: Vec<String>,
}

impl FunctionContext {
    pub fn new(arg_types: Vec<TypeDesc>, return_type: TypeDesc) -> Self {
        Self {
            arg_types,
            return_type,
            outstanding_bytes: 0,
            peak_bytes: 0,
            warnings: Vec::new(),
        }
    }

    pub fn allocate(&mut self, len: usize) -> StateBuf {
        self.consume(len as i64);
        StateBuf::new(len)
    }

    pub fn reallocate(&mut self, buf: &mut StateBuf, new_len: usize) {
        self.consume(new_len as i64 - buf.len() as i64);
        buf.resize(new_len);
    }

    pub fn free(&mut self, buf: StateBuf) {
        self.outstanding_bytes -= buf.len() as i64;
        drop(buf);
    }

    fn consume(&mut self, bytes: i64) {
        self.outstanding_bytes += bytes;
        self.peak_bytes = self.peak_bytes.max(self.outstanding_bytes);
    }

    pub fn get_arg_type(&self, idx: usize) -> Option<&TypeDesc> {
        self.arg_types.get(idx)
    }

    pub fn get_return_type(&self) -> &TypeDesc {
        &self.return_type
    }

    pub fn add_warning(&mut self, msg: &str) {
        warn!(target: "streamagg", "{}", msg);
        self.warnings.push(msg.to_string());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn outstanding_bytes(&self) -> i64 {
        self.outstanding_bytes
    }

    pub fn peak_bytes(&self) -> i64 {
        self.peak_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeKind;

    #[test]
    fn test_allocation_accounting() {
        let mut ctx = FunctionContext::new(
            vec![TypeDesc::new(TypeKind::BigInt)],
            TypeDesc::new(TypeKind::BigInt),
        );
        let mut buf = ctx.allocate(16);
        assert_eq!(ctx.outstanding_bytes(), 16);
        ctx.reallocate(&mut buf, 64);
        assert_eq!(ctx.outstanding_bytes(), 64);
        ctx.reallocate(&mut buf, 32);
        assert_eq!(ctx.outstanding_bytes(), 32);
        assert_eq!(ctx.peak_bytes(), 64);
        ctx.free(buf);
        assert_eq!(ctx.outstanding_bytes(), 0);
    }
}
