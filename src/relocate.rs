//! Relocation capabilities of element types.
//!
//! A [`Vector`](crate::Vector) carries its elements from one block to another when it grows.
//! How this is done is a property of the element type, resolved at compile time
//! through the [`Element`] trait:
//!
//! - [`Trivial`] types are plain data. A block holding them can be resized in place
//!   and nothing needs to happen when they are discarded.
//! - [`ByMove`] types are moved bitwise into a fresh block, but their destructor must run
//!   when they are cleared or truncated away.
//! - [`ByClone`] types are copy-constructed into a fresh block.
//!   The original elements stay alive until every copy exists,
//!   so a panicking `clone` leaves the source untouched.
//!
//! ```
//! use tag_vec::{element, Vector};
//!
//! #[derive(Clone, Copy)]
//! struct Point {
//! 	x: f32,
//! 	y: f32
//! }
//!
//! #[derive(Clone)]
//! struct Named {
//! 	name: String
//! }
//!
//! element! {
//! 	Point => Trivial,
//! 	Named => ByClone
//! }
//!
//! assert!(tag_vec::is_trivially_relocatable::<Point>());
//! assert!(!tag_vec::is_trivially_relocatable::<Named>());
//!
//! let mut points: Vector<Point> = Vector::new();
//! points.push_back(Point { x: 1.0, y: 2.0 }).unwrap();
//! assert_eq!(points[0].y, 2.0);
//! ```
use core::ptr;
use std::{
	rc::Rc,
	sync::Arc
};
use crate::fill;

/// Strategy used to carry `n` values of `T` from a block to another.
///
/// # Safety
///
/// `TRIVIAL` may only be `true` if a flat byte copy is a valid duplicate of a value and values
/// need no teardown. `KEEPS_SOURCE` must be `true` exactly when the source values are still
/// alive (and must be dropped by the caller) after a successful `transfer`.
pub unsafe trait Transfer<T> {
	/// Whether `T` is trivially relocatable.
	const TRIVIAL: bool;

	/// Whether the source values are still alive after a transfer.
	const KEEPS_SOURCE: bool;

	/// Transfers `n` values from `src` into the uninitialized memory at `dst`.
	///
	/// If this panics, every value already written to `dst` has been dropped
	/// and the source is left untouched.
	///
	/// # Safety
	///
	/// `src` must point to `n` initialized values, `dst` must be valid for writes of `n` values
	/// and the two ranges must not overlap.
	unsafe fn transfer(src: *const T, dst: *mut T, n: usize);
}

/// Plain data: flat copy, no teardown.
#[derive(Clone, Copy, Debug)]
pub struct Trivial;

/// Bitwise move into a fresh block, teardown on removal.
#[derive(Clone, Copy, Debug)]
pub struct ByMove;

/// Copy-construction into a fresh block, teardown on removal.
#[derive(Clone, Copy, Debug)]
pub struct ByClone;

unsafe impl<T: Copy> Transfer<T> for Trivial {
	const TRIVIAL: bool = true;
	const KEEPS_SOURCE: bool = false;

	#[inline]
	unsafe fn transfer(src: *const T, dst: *mut T, n: usize) {
		ptr::copy_nonoverlapping(src, dst, n)
	}
}

unsafe impl<T> Transfer<T> for ByMove {
	const TRIVIAL: bool = false;
	const KEEPS_SOURCE: bool = false;

	#[inline]
	unsafe fn transfer(src: *const T, dst: *mut T, n: usize) {
		ptr::copy_nonoverlapping(src, dst, n)
	}
}

unsafe impl<T: Clone> Transfer<T> for ByClone {
	const TRIVIAL: bool = false;
	const KEEPS_SOURCE: bool = true;

	#[inline]
	unsafe fn transfer(src: *const T, dst: *mut T, n: usize) {
		fill::clone_into(src, dst, n)
	}
}

/// Type that can be stored in a [`Vector`](crate::Vector).
pub trait Element: Sized {
	/// How values are carried to a new block.
	type Transfer: Transfer<Self>;
}

/// Returns `true` if `T` is trivially relocatable.
#[inline]
pub const fn is_trivially_relocatable<T: Element>() -> bool {
	<T::Transfer as Transfer<T>>::TRIVIAL
}

/// Implements [`Element`] for a list of types.
///
/// Each type is followed by the name of its transfer strategy:
/// `Trivial`, `ByMove` or `ByClone`.
///
/// ```
/// # use tag_vec::element;
/// #[derive(Clone, Copy)]
/// struct Rgb(u8, u8, u8);
///
/// element! { Rgb => Trivial }
/// ```
#[macro_export]
macro_rules! element {
	($($ty:ty => $transfer:ident),* $(,)?) => {
		$(
			impl $crate::Element for $ty {
				type Transfer = $crate::relocate::$transfer;
			}
		)*
	};
}

macro_rules! trivial {
	($($ty:ty),*) => {
		element! { $($ty => Trivial),* }
	};
}

trivial!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char);

element! { String => ByMove }

impl<'a, T: ?Sized> Element for &'a T {
	type Transfer = Trivial;
}

impl<T: ?Sized> Element for *const T {
	type Transfer = Trivial;
}

impl<T: ?Sized> Element for *mut T {
	type Transfer = Trivial;
}

impl<T: ?Sized> Element for Box<T> {
	type Transfer = ByMove;
}

impl<T> Element for Vec<T> {
	type Transfer = ByMove;
}

impl<T> Element for Option<T> {
	type Transfer = ByMove;
}

impl<T: ?Sized> Element for Rc<T> {
	type Transfer = ByMove;
}

impl<T: ?Sized> Element for Arc<T> {
	type Transfer = ByMove;
}

impl<T, const N: usize> Element for [T; N] {
	type Transfer = ByMove;
}
