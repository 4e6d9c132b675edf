//! Transfer buffer pool
//!
//! A fixed set of coherent DMA buffers, each large enough for one encoded
//! frame, plus the two indices shared between the producer and the
//! completion interrupt:
//!
//! - **armed**: the buffer the DMA engine is currently streaming. Written
//!   only by the completion handler.
//! - **pending**: a freshly encoded buffer waiting to be shown at the next
//!   frame boundary. Published by the producer, consumed by the handler.
//!
//! Both live in [`FrameSlots`] as single atomics, so a publish is never
//! partially visible and no lock is needed in interrupt context.

use core::sync::atomic::{AtomicUsize, Ordering};

use heapless::Vec;
use log::{debug, warn};

use crate::config::POOL_SIZE;
use crate::error::{AllocError, Error};

/// Memory the DMA engine can read from
///
/// Implementations must be coherent (uncached or otherwise requiring no
/// software cache maintenance): the device must observe processor writes
/// in program order.
pub trait DmaBuffer {
    /// Bus address the DMA engine reads from
    fn phys_addr(&self) -> u32;

    /// Processor view of the buffer
    fn as_words(&self) -> &[u32];

    /// Mutable processor view of the buffer
    fn as_words_mut(&mut self) -> &mut [u32];
}

/// Source of coherent DMA buffers
///
/// On a hosted kernel this wraps the coherent DMA allocator; on bare metal
/// it usually carves buffers out of an uncached region.
pub trait DmaAllocator {
    /// Buffer type handed out
    type Buffer: DmaBuffer;

    /// Allocate a buffer of `words` 32-bit words
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] when no coherent memory is available.
    fn allocate(&mut self, words: usize) -> Result<Self::Buffer, AllocError>;

    /// Return a buffer to the allocator
    fn release(&mut self, buffer: Self::Buffer);
}

const NO_BUFFER: usize = usize::MAX;

/// Indices shared between the producer and the completion handler
#[derive(Debug)]
pub struct FrameSlots {
    armed: AtomicUsize,
    pending: AtomicUsize,
}

impl FrameSlots {
    /// Slots with buffer 0 armed and nothing pending
    pub const fn new() -> Self {
        Self {
            armed: AtomicUsize::new(0),
            pending: AtomicUsize::new(NO_BUFFER),
        }
    }

    /// Index of the buffer being streamed
    pub fn armed(&self) -> usize {
        self.armed.load(Ordering::Acquire)
    }

    /// Index of the buffer waiting for the next frame boundary, if any
    pub fn pending(&self) -> Option<usize> {
        match self.pending.load(Ordering::Acquire) {
            NO_BUFFER => None,
            index => Some(index),
        }
    }

    /// Whether a freshly encoded buffer is waiting to be shown
    pub fn is_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Publish `index` as the next buffer to show
    ///
    /// The release store orders every write into the buffer before the
    /// index becomes visible. Returns the previously pending index if it
    /// was superseded before being shown.
    pub fn publish(&self, index: usize) -> Option<usize> {
        match self.pending.swap(index, Ordering::AcqRel) {
            NO_BUFFER => None,
            previous => Some(previous),
        }
    }

    /// Take the pending index, leaving the slot empty
    pub fn take_pending(&self) -> Option<usize> {
        match self.pending.swap(NO_BUFFER, Ordering::AcqRel) {
            NO_BUFFER => None,
            index => Some(index),
        }
    }

    /// Record `index` as the buffer now streaming
    pub fn mark_armed(&self, index: usize) {
        self.armed.store(index, Ordering::Release);
    }
}

impl Default for FrameSlots {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-size pool of transfer buffers
///
/// Constructed all-or-nothing by [`allocate`](Self::allocate) and returned
/// to the allocator in one piece by [`release`](Self::release). The pool
/// cannot grow or shrink in between.
#[derive(Debug)]
pub struct TransferBufferPool<B, const N: usize = POOL_SIZE> {
    buffers: [B; N],
    words: usize,
}

impl<B: DmaBuffer, const N: usize> TransferBufferPool<B, N> {
    /// Allocate `N` buffers of `words` words each
    ///
    /// Every buffer is zero-filled before the pool is returned.
    ///
    /// # Errors
    ///
    /// Returns `Error::Allocation` if any allocation fails; buffers already
    /// allocated are released before returning.
    pub fn allocate<A>(allocator: &mut A, words: usize) -> Result<Self, Error>
    where
        A: DmaAllocator<Buffer = B>,
    {
        let mut built: Vec<B, N> = Vec::new();
        for index in 0..N {
            match allocator.allocate(words) {
                Ok(mut buffer) => {
                    let provided = buffer.as_words().len();
                    if provided < words {
                        allocator.release(buffer);
                        Self::unwind(allocator, &mut built);
                        return Err(Error::BufferTooSmall {
                            required: words,
                            provided,
                        });
                    }
                    buffer.as_words_mut().fill(0);
                    // Capacity is N and the loop runs N times
                    if let Err(buffer) = built.push(buffer) {
                        allocator.release(buffer);
                    }
                }
                Err(err) => {
                    warn!("transfer buffer {index} allocation failed, releasing {}", built.len());
                    Self::unwind(allocator, &mut built);
                    return Err(Error::Allocation(AllocError {
                        index,
                        words: err.words,
                    }));
                }
            }
        }

        match built.into_array() {
            Ok(buffers) => {
                debug!("allocated {N} transfer buffers of {words} words");
                Ok(Self { buffers, words })
            }
            Err(mut partial) => {
                let index = partial.len();
                Self::unwind(allocator, &mut partial);
                Err(Error::Allocation(AllocError { index, words }))
            }
        }
    }

    fn unwind<A>(allocator: &mut A, built: &mut Vec<B, N>)
    where
        A: DmaAllocator<Buffer = B>,
    {
        while let Some(buffer) = built.pop() {
            allocator.release(buffer);
        }
    }

    /// Buffer at `index`
    pub fn buffer(&self, index: usize) -> Option<&B> {
        self.buffers.get(index)
    }

    /// Mutable buffer at `index`
    pub fn buffer_mut(&mut self, index: usize) -> Option<&mut B> {
        self.buffers.get_mut(index)
    }

    /// Bus address of the buffer at `index`
    pub fn phys_addr(&self, index: usize) -> Option<u32> {
        self.buffers.get(index).map(DmaBuffer::phys_addr)
    }

    /// Bus addresses of every buffer, by index
    pub fn phys_addrs(&self) -> [u32; N] {
        core::array::from_fn(|i| self.buffers[i].phys_addr())
    }

    /// Number of buffers
    pub const fn len(&self) -> usize {
        N
    }

    /// Whether the pool holds no buffers
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Words per buffer
    pub const fn words_per_buffer(&self) -> usize {
        self.words
    }

    /// Mutable access to every buffer
    pub(crate) fn buffers_mut(&mut self) -> &mut [B; N] {
        &mut self.buffers
    }

    /// Return every buffer to the allocator
    ///
    /// Takes the pool by value: once the DMA channel is stopped the caller
    /// gives up the pool, so no buffer can be freed while still armed.
    pub fn release<A>(self, allocator: &mut A)
    where
        A: DmaAllocator<Buffer = B>,
    {
        for buffer in self.buffers {
            allocator.release(buffer);
        }
        debug!("released {N} transfer buffers");
    }
}

/// Pick an idle buffer for the producer
///
/// Walks forward from `cursor` and returns the first index that is not
/// armed. The caller must have emptied the pending slot first, so the armed
/// index cannot move while the returned buffer is being filled. A pool of a
/// single buffer has no idle slot; pipelines reject such pools at compile
/// time.
pub(crate) fn next_idle(cursor: usize, len: usize, armed: usize) -> usize {
    (1..=len)
        .map(|step| (cursor + step) % len)
        .find(|&index| index != armed)
        .unwrap_or(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockAllocator;

    #[test]
    fn test_allocate_full_pool() {
        let mut allocator = MockAllocator::new();
        let pool: TransferBufferPool<_> = TransferBufferPool::allocate(&mut allocator, 16).unwrap();

        assert_eq!(pool.len(), 8);
        assert_eq!(allocator.live, 8);
        assert_eq!(pool.words_per_buffer(), 16);
        for index in 0..8 {
            let buffer = pool.buffer(index).unwrap();
            assert!(buffer.as_words().iter().all(|&w| w == 0));
        }
        assert!(pool.buffer(8).is_none());
    }

    #[test]
    fn test_allocation_is_all_or_nothing() {
        for fail_at in 0..8 {
            let mut allocator = MockAllocator::failing_at(fail_at);
            let result: Result<TransferBufferPool<_>, _> =
                TransferBufferPool::allocate(&mut allocator, 16);

            assert_eq!(
                result.err(),
                Some(Error::Allocation(AllocError {
                    index: fail_at,
                    words: 16
                }))
            );
            assert_eq!(allocator.live, 0, "leak when failing at {fail_at}");
            assert_eq!(allocator.released.len(), fail_at);
        }
    }

    #[test]
    fn test_short_buffer_unwinds_whole_pool() {
        for short_at in [0, 3, 7] {
            let mut allocator = MockAllocator::short_at(short_at);
            let result: Result<TransferBufferPool<_>, _> =
                TransferBufferPool::allocate(&mut allocator, 16);

            assert_eq!(
                result.err(),
                Some(Error::BufferTooSmall {
                    required: 16,
                    provided: 15
                })
            );
            assert_eq!(allocator.live, 0, "leak when slot {short_at} is short");
            assert_eq!(allocator.requests, short_at + 1);
            assert_eq!(allocator.released.len(), short_at + 1);
        }
    }

    #[test]
    fn test_release_returns_every_buffer() {
        let mut allocator = MockAllocator::new();
        let pool: TransferBufferPool<_, 3> =
            TransferBufferPool::allocate(&mut allocator, 4).unwrap();
        let addrs = pool.phys_addrs();

        pool.release(&mut allocator);
        assert_eq!(allocator.live, 0);
        assert_eq!(allocator.released, addrs.to_vec());
    }

    #[test]
    fn test_phys_addrs_are_distinct() {
        let mut allocator = MockAllocator::new();
        let pool: TransferBufferPool<_> = TransferBufferPool::allocate(&mut allocator, 4).unwrap();
        let addrs = pool.phys_addrs();
        for (i, a) in addrs.iter().enumerate() {
            assert_eq!(pool.phys_addr(i), Some(*a));
            assert!(addrs[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn test_slots_publish_and_take() {
        let slots = FrameSlots::new();
        assert_eq!(slots.armed(), 0);
        assert!(!slots.is_pending());

        assert_eq!(slots.publish(3), None);
        assert_eq!(slots.pending(), Some(3));
        // A newer frame supersedes one that was never shown
        assert_eq!(slots.publish(4), Some(3));

        assert_eq!(slots.take_pending(), Some(4));
        assert_eq!(slots.take_pending(), None);
        slots.mark_armed(4);
        assert_eq!(slots.armed(), 4);
    }

    #[test]
    fn test_next_idle_walks_forward_skipping_armed() {
        assert_eq!(next_idle(0, 8, 0), 1);
        assert_eq!(next_idle(0, 8, 1), 2);
        assert_eq!(next_idle(7, 8, 0), 1);
        assert_eq!(next_idle(6, 8, 3), 7);
    }

    #[test]
    fn test_next_idle_never_returns_armed() {
        for cursor in 0..8 {
            for armed in 0..8 {
                assert_ne!(next_idle(cursor, 8, armed), armed);
            }
        }
        assert_eq!(next_idle(0, 2, 1), 0);
        assert_eq!(next_idle(1, 2, 1), 0);
    }
}
