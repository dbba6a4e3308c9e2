//! Header-tagged raw blocks.
//!
//! Every block handed out by a [`BlockAlloc`] starts with a hidden header.
//! The byte length of the payload is stored in the machine word right in
//! front of the payload, so the size of a block can always be recovered from
//! the bare payload pointer:
//!
//! ```text
//! base                                   payload
//! |<------------ HEADER_SIZE ------------>|<------------- len ------------->|
//! |  padding ...         | len: usize     |  element 0 | element 1 | ...     |
//! ```
//!
//! Consumers only ever see the payload pointer.
use core::{
	mem,
	ptr::NonNull
};
use std::alloc::{
	self,
	Layout
};

/// Alignment of every block, and therefore of every payload.
pub const BLOCK_ALIGN: usize = 16;

/// Number of bytes in front of the payload.
///
/// The header is as large as the block alignment so that the payload keeps it.
/// Only its last word is used, to store the payload length.
pub const HEADER_SIZE: usize = BLOCK_ALIGN;

const WORD: usize = mem::size_of::<usize>();

const _: () = assert!(WORD <= HEADER_SIZE && HEADER_SIZE % mem::align_of::<usize>() == 0);

/// Source of header-tagged blocks.
///
/// There is a single allocator per process: the functions of this trait take no receiver,
/// the implementing type is only used to select the strategy at compile time.
///
/// # Safety
///
/// Every pointer returned by `allocate` or `reallocate` must address the first payload byte
/// of a block aligned on [`BLOCK_ALIGN`] whose header holds the requested length
/// (see [`tag`]). The payload must be valid for reads and writes of that many bytes
/// until it is passed to `reallocate` or `free`.
pub unsafe trait BlockAlloc {
	/// Allocates a block with a payload of `len` bytes.
	///
	/// Returns `None` if the system refuses the request.
	/// `len` must not be zero.
	fn allocate(len: usize) -> Option<NonNull<u8>>;

	/// Resizes the block whose payload starts at `payload` to hold `len` bytes.
	///
	/// The bytes common to the old and new payload are preserved.
	/// On failure `None` is returned and the original block is left untouched.
	///
	/// # Safety
	///
	/// `payload` must come from this allocator and must not have been freed.
	/// `len` must not be zero.
	unsafe fn reallocate(payload: NonNull<u8>, len: usize) -> Option<NonNull<u8>>;

	/// Releases the block whose payload starts at `payload`.
	///
	/// # Safety
	///
	/// `payload` must come from this allocator and must not have been freed.
	unsafe fn free(payload: NonNull<u8>);
}

/// The process heap, as exposed by the Rust global allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Heap;

unsafe impl BlockAlloc for Heap {
	fn allocate(len: usize) -> Option<NonNull<u8>> {
		debug_assert!(len > 0, "attempt to allocate a block of size 0");

		let layout = block_layout(len)?;
		// SAFETY: the layout has a non-zero size since it includes the header.
		let base = NonNull::new(unsafe { alloc::alloc(layout) })?;
		log::trace!("allocated block of {} bytes at {:p}", len, base);

		// SAFETY: the block is `HEADER_SIZE + len` bytes long and aligned on `BLOCK_ALIGN`.
		Some(unsafe { tag(base, len) })
	}

	unsafe fn reallocate(payload: NonNull<u8>, len: usize) -> Option<NonNull<u8>> {
		debug_assert!(len > 0, "attempt to reallocate a block to size 0");

		let new_layout = block_layout(len)?;
		let old_len = block_len(payload);
		let base = untag(payload);
		// The old layout has been validated when the block was created.
		let old_layout = Layout::from_size_align_unchecked(old_len + HEADER_SIZE, BLOCK_ALIGN);

		let base = NonNull::new(alloc::realloc(base.as_ptr(), old_layout, new_layout.size()))?;
		log::trace!("reallocated block from {} to {} bytes at {:p}", old_len, len, base);

		Some(tag(base, len))
	}

	unsafe fn free(payload: NonNull<u8>) {
		let len = block_len(payload);
		let layout = Layout::from_size_align_unchecked(len + HEADER_SIZE, BLOCK_ALIGN);
		alloc::dealloc(untag(payload).as_ptr(), layout)
	}
}

/// Layout of a whole block (header included) with a payload of `len` bytes.
///
/// Returns `None` if the block size would overflow or exceed `isize::MAX`.
#[inline]
pub fn block_layout(len: usize) -> Option<Layout> {
	let size = len.checked_add(HEADER_SIZE)?;
	Layout::from_size_align(size, BLOCK_ALIGN).ok()
}

/// Writes the header of the block starting at `base` and returns its payload pointer.
///
/// # Safety
///
/// `base` must be aligned on [`BLOCK_ALIGN`] and valid for writes of `HEADER_SIZE` bytes.
#[inline]
pub unsafe fn tag(base: NonNull<u8>, len: usize) -> NonNull<u8> {
	let payload = base.as_ptr().add(HEADER_SIZE);
	(payload.sub(WORD) as *mut usize).write(len);
	NonNull::new_unchecked(payload)
}

/// Returns the start of the block whose payload is `payload`.
///
/// # Safety
///
/// `payload` must be a payload pointer produced by [`tag`].
#[inline]
pub unsafe fn untag(payload: NonNull<u8>) -> NonNull<u8> {
	NonNull::new_unchecked(payload.as_ptr().sub(HEADER_SIZE))
}

/// Reads the payload length stored in the header of a block.
///
/// # Safety
///
/// `payload` must be a payload pointer produced by [`tag`], of a block that is still alive.
#[inline]
pub unsafe fn block_len(payload: NonNull<u8>) -> usize {
	(payload.as_ptr().sub(WORD) as *const usize).read()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn allocate_writes_the_header() {
		let payload = Heap::allocate(40).unwrap();
		unsafe {
			assert_eq!(block_len(payload), 40);
			assert_eq!(payload.as_ptr() as usize % BLOCK_ALIGN, 0);
			assert_eq!(untag(payload).as_ptr().add(HEADER_SIZE), payload.as_ptr());
			Heap::free(payload);
		}
	}

	#[test]
	fn reallocate_keeps_the_payload() {
		unsafe {
			let payload = Heap::allocate(4).unwrap();
			payload.as_ptr().copy_from_nonoverlapping([1u8, 2, 3, 4].as_ptr(), 4);

			let grown = Heap::reallocate(payload, 4096).unwrap();
			assert_eq!(block_len(grown), 4096);
			assert_eq!(core::slice::from_raw_parts(grown.as_ptr(), 4), &[1, 2, 3, 4]);

			let shrunk = Heap::reallocate(grown, 2).unwrap();
			assert_eq!(block_len(shrunk), 2);
			assert_eq!(core::slice::from_raw_parts(shrunk.as_ptr(), 2), &[1, 2]);
			Heap::free(shrunk);
		}
	}

	#[test]
	fn oversized_requests_fail_softly() {
		assert!(Heap::allocate(usize::MAX).is_none());
		assert!(Heap::allocate(usize::MAX - HEADER_SIZE + 1).is_none());

		unsafe {
			let payload = Heap::allocate(8).unwrap();
			assert!(Heap::reallocate(payload, usize::MAX).is_none());
			// the original block is untouched.
			assert_eq!(block_len(payload), 8);
			Heap::free(payload);
		}
	}

	#[test]
	fn block_layout_includes_the_header() {
		let layout = block_layout(3).unwrap();
		assert_eq!(layout.size(), 3 + HEADER_SIZE);
		assert_eq!(layout.align(), BLOCK_ALIGN);
		assert!(block_layout(usize::MAX).is_none());
	}
}
