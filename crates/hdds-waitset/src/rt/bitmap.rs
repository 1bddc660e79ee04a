// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::atomic::{AtomicUsize, Ordering};

const BITS_PER_WORD: usize = usize::BITS as usize;

/// Lock-free bitmap recording which driver slots were signalled since the
/// last drain. Lets the driver coalesce eventfd writes to one per slot.
pub(super) struct SignalBitmap {
    words: Box<[AtomicUsize]>,
    capacity: usize,
}

impl SignalBitmap {
    pub(super) fn new(capacity: usize) -> Self {
        let words = (0..capacity.div_ceil(BITS_PER_WORD))
            .map(|_| AtomicUsize::new(0))
            .collect();
        Self { words, capacity }
    }

    /// Mark `index`; returns `true` if it was already pending.
    pub(super) fn mark(&self, index: usize) -> bool {
        if index >= self.capacity {
            return true;
        }

        let bit = 1usize << (index % BITS_PER_WORD);
        let prev = self.words[index / BITS_PER_WORD].fetch_or(bit, Ordering::AcqRel);
        (prev & bit) != 0
    }

    /// Forget a pending mark (slot released before the waiter drained it).
    pub(super) fn clear(&self, index: usize) {
        if index < self.capacity {
            let bit = 1usize << (index % BITS_PER_WORD);
            self.words[index / BITS_PER_WORD].fetch_and(!bit, Ordering::AcqRel);
        }
    }

    /// Drain every pending mark in ascending order.
    pub(super) fn drain(&self) -> Vec<usize> {
        let mut indices = Vec::new();

        for (word_idx, word) in self.words.iter().enumerate() {
            let mut value = word.swap(0, Ordering::AcqRel);
            while value != 0 {
                let bit_offset = value.trailing_zeros() as usize;
                value &= value - 1;
                let index = word_idx * BITS_PER_WORD + bit_offset;
                if index < self.capacity {
                    indices.push(index);
                }
            }
        }

        indices
    }
}
