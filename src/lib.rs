//! This crate provides the [`Vector`] data structure,
//! a contiguous growable array that knows its capacity without storing it.
//! A `Vector` is only a pointer and a length:
//! the capacity is recovered from a small header placed right in front of the data
//! by the block allocator (see the [`raw`] module).
//!
//! How elements are relocated when the vector grows is decided at compile time
//! by the [`Element`] trait.
//! Trivially relocatable types (integers, floats, references, ...) are reallocated in place,
//! other types are transferred into a fresh block one at a time,
//! and a panic during the transfer leaves the vector untouched.
//!
//! ## Basic usage
//!
//! ```rust
//! use tag_vec::Vector;
//!
//! let mut v: Vector<u32> = Vector::new(); // no allocation yet.
//! v.push_back(1).unwrap(); // first block: room for 10 elements.
//! v.push_back(2).unwrap();
//! assert_eq!(v.capacity(), 10);
//!
//! v.resize(11).unwrap(); // new elements are default-constructed.
//! assert_eq!(v.len(), 11);
//! assert_eq!(v.capacity(), 11);
//! assert_eq!(v[10], 0);
//! ```
//!
//! Allocation failures are reported as [`ReserveError`] values,
//! the vector being left in its previous state:
//! ```rust
//! # use tag_vec::{Vector, ReserveError};
//! let mut v: Vector<u64> = Vector::new();
//! assert!(matches!(
//! 	v.reserve(usize::MAX),
//! 	Err(ReserveError::CapacityOverflow { .. })
//! ));
//! assert_eq!(v.capacity(), 0);
//! ```
//!
//! User types opt in with the [`element!`] macro:
//! ```rust
//! use tag_vec::{element, Vector};
//!
//! #[derive(Clone, Default)]
//! struct Label(String);
//!
//! element! { Label => ByMove }
//!
//! let mut labels: Vector<Label> = Vector::new();
//! labels.initialize_with_len(3).unwrap();
//! assert_eq!(labels.len(), 3);
//! ```
pub mod raw;
pub mod capacity;
pub mod relocate;
pub mod fill;
mod error;
mod vector;

pub use error::ReserveError;
pub use raw::{
	BlockAlloc,
	Heap
};
pub use relocate::{
	is_trivially_relocatable,
	Element
};
pub use vector::{
	Vector,
	GROWTH_FACTOR,
	INITIAL_CAPACITY
};
