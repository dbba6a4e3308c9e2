//! Capacity introspection.
//!
//! The capacity of a block is never stored next to the pointer:
//! it is always derived from the block header.
use core::{
	mem,
	ptr::NonNull
};
use crate::raw;

/// Number of elements of `elem_size` bytes that fit in the payload at `ptr`.
///
/// Returns 0 for a null pointer.
///
/// # Safety
///
/// If not null, `ptr` must be the payload pointer of a live header-tagged block.
#[inline]
pub unsafe fn capacity_of(ptr: *const u8, elem_size: usize) -> usize {
	debug_assert_ne!(elem_size, 0);
	byte_len_of(ptr) / elem_size
}

/// Payload length, in bytes, of the block at `ptr`.
///
/// Returns 0 for a null pointer.
///
/// # Safety
///
/// If not null, `ptr` must be the payload pointer of a live header-tagged block.
#[inline]
pub unsafe fn byte_len_of(ptr: *const u8) -> usize {
	match NonNull::new(ptr as *mut u8) {
		Some(payload) => raw::block_len(payload),
		None => 0
	}
}

/// Typed form of [`capacity_of`].
///
/// # Safety
///
/// Same as [`capacity_of`].
#[inline]
pub unsafe fn capacity<T>(ptr: *const T) -> usize {
	capacity_of(ptr.cast(), mem::size_of::<T>())
}
