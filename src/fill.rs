//! Element construction and destruction helpers.
//!
//! These functions work on raw element ranges and never touch block headers.
//! Every fallible construction loop is transactional: if constructing an element panics,
//! the elements already constructed in the destination are destroyed before the panic
//! resumes, and the source is left as it was.
use core::{
	ptr,
	slice
};
use crate::relocate::{
	Element,
	Transfer
};

/// Destination range under construction.
///
/// Destroys the `len` first elements at `start` when dropped, unless forgotten.
struct Partial<T> {
	start: *mut T,
	len: usize
}

impl<T> Drop for Partial<T> {
	fn drop(&mut self) {
		unsafe { drop_reverse(self.start, self.len) }
	}
}

/// Drops the `len` values at `start`, last one first.
#[inline]
unsafe fn drop_reverse<T>(start: *mut T, mut len: usize) {
	while len > 0 {
		len -= 1;
		ptr::drop_in_place(start.add(len))
	}
}

/// Copy-constructs `n` values from `src` into `dst`, one at a time.
///
/// # Safety
///
/// `src` must point to `n` initialized values, `dst` must be valid for writes of `n` values
/// and the two ranges must not overlap.
pub(crate) unsafe fn clone_into<T: Clone>(src: *const T, dst: *mut T, n: usize) {
	let src = slice::from_raw_parts(src, n);
	let mut guard = Partial { start: dst, len: 0 };

	for value in src {
		ptr::write(dst.add(guard.len), value.clone());
		guard.len += 1;
	}

	core::mem::forget(guard)
}

/// Copy-constructs the values of `src` into the uninitialized memory at `dst`.
///
/// Trivial element types are copied flat.
///
/// # Safety
///
/// `dst` must be valid for writes of `src.len()` values and must not overlap `src`.
pub unsafe fn fill<T: Element + Clone>(dst: *mut T, src: &[T]) {
	if <T::Transfer as Transfer<T>>::TRIVIAL {
		ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len())
	} else {
		clone_into(src.as_ptr(), dst, src.len())
	}
}

/// Carries `n` values from `src` into the uninitialized memory at `dst`
/// using the transfer strategy of `T`.
///
/// Returns `true` if the values at `src` are still alive and must be destroyed by the caller,
/// `false` if they have been moved out.
///
/// # Safety
///
/// `src` must point to `n` initialized values, `dst` must be valid for writes of `n` values
/// and the two ranges must not overlap.
/// If `false` is returned, the values at `src` must not be used or dropped anymore.
#[inline]
pub unsafe fn fill_move<T: Element>(dst: *mut T, src: *mut T, n: usize) -> bool {
	<T::Transfer as Transfer<T>>::transfer(src, dst, n);
	<T::Transfer as Transfer<T>>::KEEPS_SOURCE
}

/// Destroys the values in `[begin, end)`, in reverse order.
///
/// Does nothing for trivial element types.
///
/// # Safety
///
/// `begin..end` must be a range of initialized values of a single allocation.
/// The values must not be used afterward.
#[inline]
pub unsafe fn destroy_range<T: Element>(begin: *mut T, end: *mut T) {
	if !<T::Transfer as Transfer<T>>::TRIVIAL {
		let len = end.offset_from(begin);
		debug_assert!(len >= 0);
		drop_reverse(begin, len as usize)
	}
}
