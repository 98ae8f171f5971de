//! Reference-counted sample buffers
//!
//! Buffers are 16-byte aligned so downstream stages can SIMD-downconvert the
//! raw capture format without a realigning copy. A buffer starts at
//! refcount 1 when acquired; `add_ref`/`release` adjust it, and storage is
//! freed exactly when the count reaches zero. Once shared, a buffer's
//! samples are immutable — only the acquirer may have written to it.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

pub type Sample = i32;

pub const SAMPLE_MAX: Sample = Sample::MAX;
pub const SAMPLE_MIN: Sample = Sample::MIN;

const ALIGN: usize = 16;

struct Header {
    refs: AtomicUsize,
    len: usize,
}

/// An owning handle to a reference-counted sample buffer.
///
/// Cloning a `Buffer` increments the refcount (it does not duplicate the
/// storage); dropping decrements it and frees storage on the last release.
/// This mirrors the explicit acquire/add_ref/release vocabulary of the
/// underlying pool while giving ordinary Rust ownership semantics.
pub struct Buffer {
    header: NonNull<Header>,
    data: NonNull<Sample>,
}

unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

fn layout_for(len: usize) -> Layout {
    let header_layout = Layout::new::<Header>();
    let data_layout = Layout::array::<Sample>(len).expect("buffer length overflow");
    header_layout
        .extend(data_layout)
        .expect("buffer layout overflow")
        .0
        .align_to(ALIGN)
        .expect("alignment overflow")
}

impl Buffer {
    /// Allocate a new buffer of `len` samples with refcount 1.
    pub fn acquire(len: usize) -> Buffer {
        let layout = layout_for(len);
        unsafe {
            let raw = alloc(layout);
            if raw.is_null() {
                handle_alloc_error(layout);
            }
            let header_ptr = raw as *mut Header;
            header_ptr.write(Header {
                refs: AtomicUsize::new(1),
                len,
            });

            let data_offset = Layout::new::<Header>()
                .extend(Layout::array::<Sample>(len).unwrap())
                .unwrap()
                .1;
            let data_ptr = raw.add(data_offset) as *mut Sample;
            std::ptr::write_bytes(data_ptr, 0, len);

            Buffer {
                header: NonNull::new_unchecked(header_ptr),
                data: NonNull::new_unchecked(data_ptr),
            }
        }
    }

    pub fn len(&self) -> usize {
        unsafe { self.header.as_ref().len }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[Sample] {
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len()) }
    }

    /// Mutable access. Safe to call as long as no clone of this buffer has
    /// been shared yet — callers that have handed out a clone must not
    /// write further (mirrors the single-writer invariant of the pool).
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.len()) }
    }

    pub fn refcount(&self) -> usize {
        unsafe { self.header.as_ref().refs.load(Ordering::Acquire) }
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        unsafe {
            self.header.as_ref().refs.fetch_add(1, Ordering::AcqRel);
        }
        Buffer {
            header: self.header,
            data: self.data,
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            let prev = self.header.as_ref().refs.fetch_sub(1, Ordering::AcqRel);
            if prev == 1 {
                let len = self.header.as_ref().len;
                let layout = layout_for(len);
                dealloc(self.header.as_ptr() as *mut u8, layout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_refcount_one() {
        let buf = Buffer::acquire(16);
        assert_eq!(buf.refcount(), 1);
    }

    #[test]
    fn clone_increments_refcount_and_shares_storage() {
        let a = Buffer::acquire(4);
        let b = a.clone();
        assert_eq!(a.refcount(), 2);
        assert_eq!(b.refcount(), 2);
    }

    #[test]
    fn drop_decrements_refcount() {
        let a = Buffer::acquire(4);
        let b = a.clone();
        assert_eq!(a.refcount(), 2);
        drop(b);
        assert_eq!(a.refcount(), 1);
    }

    #[test]
    fn freshly_acquired_buffer_is_zeroed() {
        let buf = Buffer::acquire(8);
        assert!(buf.as_slice().iter().all(|&x| x == 0));
    }

    #[test]
    fn is_aligned_to_sixteen_bytes() {
        let buf = Buffer::acquire(3);
        let addr = buf.as_slice().as_ptr() as usize;
        assert_eq!(addr % ALIGN, 0);
    }

    #[test]
    fn many_clones_release_back_to_one_reference() {
        let a = Buffer::acquire(4);
        let clones: Vec<_> = (0..20).map(|_| a.clone()).collect();
        assert_eq!(a.refcount(), 21);
        drop(clones);
        assert_eq!(a.refcount(), 1);
    }
}
