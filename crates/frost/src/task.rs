// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Task execution hook reached through [`Codec::compute1`](crate::Codec::compute1).

/// A unit of work the task executor can step without knowing its type.
pub trait Completion {
    /// Run one zero-argument step.
    fn compute1(&mut self);
}

impl<F: FnMut()> Completion for F {
    fn compute1(&mut self) {
        self()
    }
}
