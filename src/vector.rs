use core::{
	cmp,
	fmt,
	iter::FromIterator,
	marker::PhantomData,
	mem,
	ops::{
		Deref,
		DerefMut
	},
	ptr::{
		self,
		NonNull
	},
	slice
};
use std::alloc::handle_alloc_error;
use crate::{
	capacity,
	fill,
	raw::{
		self,
		BlockAlloc,
		Heap,
		BLOCK_ALIGN
	},
	relocate::{
		ByMove,
		Element,
		Transfer
	},
	ReserveError
};

/// Capacity of the first block allocated when growing an empty vector.
pub const INITIAL_CAPACITY: usize = 10;

/// Factor applied to the capacity when a full vector grows.
pub const GROWTH_FACTOR: usize = 2;

/// Contiguous growable array type whose capacity is stored in the block header.
///
/// A `Vector` is only a pointer and a length: its capacity is always read back from the
/// header placed by the [`BlockAlloc`] right in front of the data.
///
/// How elements are carried from a block to a bigger one depends on
/// the [`Element`] implementation of `T`:
/// trivially relocatable types are reallocated in place,
/// other types are transferred one by one into a fresh block.
/// Should a transfer panic, the new block is released and the vector is left untouched.
///
/// Allocation failures never panic: every operation that may allocate returns a
/// [`ReserveError`] and leaves the vector in its previous state.
///
/// # Example
///
/// ```
/// use tag_vec::Vector;
///
/// let mut v: Vector<u32> = Vector::new();
/// v.push_back(1).unwrap();
/// v.push_back(2).unwrap();
/// v.push_back(3).unwrap();
///
/// assert_eq!(v, [1, 2, 3]);
/// assert_eq!(v.capacity(), 10);
/// ```
pub struct Vector<T: Element, A: BlockAlloc = Heap> {
	/// Payload pointer of the owned block, if any.
	data: Option<NonNull<T>>,

	/// Number of live elements.
	len: usize,

	/// Owns some `T`s.
	marker: PhantomData<T>,

	/// Allocator.
	alloc: PhantomData<A>
}

impl<T: Element, A: BlockAlloc> Drop for Vector<T, A> {
	fn drop(&mut self) {
		self.free()
	}
}

impl<T: Element, A: BlockAlloc> Vector<T, A> {
	const LAYOUT_CHECK: () = assert!(
		mem::size_of::<T>() != 0 && mem::align_of::<T>() <= BLOCK_ALIGN,
		"vector elements must have a non-zero size and an alignment no greater than BLOCK_ALIGN"
	);

	/// Constructs a new, empty `Vector`.
	///
	/// The vector does not allocate until elements are pushed onto it.
	#[inline]
	pub const fn new() -> Self {
		#[allow(clippy::let_unit_value)]
		let () = Self::LAYOUT_CHECK;

		Vector {
			data: None,
			len: 0,
			marker: PhantomData,
			alloc: PhantomData
		}
	}

	/// Creates a `Vector` directly from a payload pointer and a length.
	///
	/// The capacity is recovered from the block header.
	///
	/// # Safety
	///
	/// `ptr` must be null with `len` equal to 0, or come from [`into_raw_parts`](Self::into_raw_parts)
	/// of a `Vector<T, A>`, with `len` no greater than the length it returned.
	/// The `len` first elements must be initialized.
	#[inline]
	pub unsafe fn from_raw_parts(ptr: *mut T, len: usize) -> Self {
		let mut v = Self::new();
		v.data = NonNull::new(ptr);
		debug_assert!(len <= v.capacity());
		v.len = len;
		v
	}

	/// Decomposes a `Vector` into its payload pointer and length.
	///
	/// The pointer is null if the vector owns no block.
	/// The memory is not released: use [`from_raw_parts`](Self::from_raw_parts)
	/// to get it back.
	#[inline]
	pub fn into_raw_parts(self) -> (*mut T, usize) {
		let mut this = mem::ManuallyDrop::new(self);
		(this.as_mut_ptr(), this.len)
	}

	/// Returns the number of elements in the vector.
	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	/// Returns `true` if the vector contains no elements.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns the number of elements the vector can hold without reallocating.
	///
	/// This is read from the block header, 0 if no block is owned.
	#[inline]
	pub fn capacity(&self) -> usize {
		// SAFETY: the pointer is either null or the payload of the block we own.
		unsafe { capacity::capacity(self.as_ptr()) }
	}

	/// Returns a raw pointer to the vector's buffer, or a null pointer if it owns no block.
	///
	/// The caller must ensure that the vector outlives the pointer this
	/// function returns, or else it will end up pointing to garbage.
	/// Modifying the vector may cause its buffer to be reallocated,
	/// which would also make any pointers to it invalid.
	#[inline]
	pub fn as_ptr(&self) -> *const T {
		match self.data {
			Some(data) => data.as_ptr(),
			None => ptr::null()
		}
	}

	/// Returns an unsafe mutable pointer to the vector's buffer,
	/// or a null pointer if it owns no block.
	#[inline]
	pub fn as_mut_ptr(&mut self) -> *mut T {
		match self.data {
			Some(data) => data.as_ptr(),
			None => ptr::null_mut()
		}
	}

	/// Extracts a slice containing the entire vector.
	#[inline]
	pub fn as_slice(&self) -> &[T] {
		match self.data {
			// SAFETY: the `len` first elements are initialized.
			Some(data) => unsafe { slice::from_raw_parts(data.as_ptr(), self.len) },
			None => &[]
		}
	}

	/// Extracts a mutable slice of the entire vector.
	#[inline]
	pub fn as_mut_slice(&mut self) -> &mut [T] {
		match self.data {
			// SAFETY: the `len` first elements are initialized.
			Some(data) => unsafe { slice::from_raw_parts_mut(data.as_ptr(), self.len) },
			None => &mut []
		}
	}

	/// Releases the current block and allocates a new one with room for
	/// `capacity` elements (at least one).
	///
	/// The vector is empty afterward, even if the allocation fails.
	pub fn initialize(&mut self, capacity: usize) -> Result<(), ReserveError> {
		self.free();
		self.data = Some(Self::allocate(cmp::max(capacity, 1))?);
		Ok(())
	}

	/// Releases the current block and fills a new one with `len` default values.
	pub fn initialize_with_len(&mut self, len: usize) -> Result<(), ReserveError> where T: Default {
		self.initialize(len)?;
		self.resize(len)
	}

	/// Replaces the content of the vector with clones of `values`.
	///
	/// The new block is allocated with the exact capacity needed.
	/// If the allocation fails or a `clone` panics, the vector keeps its previous content.
	pub fn initialize_from_slice(&mut self, values: &[T]) -> Result<(), ReserveError> where T: Clone {
		let mut fresh = Self::new();
		let data = Self::allocate(cmp::max(values.len(), 1))?;
		fresh.data = Some(data);

		// SAFETY: the block has room for `values.len()` elements.
		// If `fill` panics it destroys its partial work and `fresh` releases the block.
		unsafe {
			fill::fill(data.as_ptr(), values);
		}
		fresh.len = values.len();

		*self = fresh;
		Ok(())
	}

	/// Replaces the content of the vector with the values of `values`, in order.
	///
	/// The new block is allocated with the capacity announced by the iterator.
	/// If the allocation fails or the iterator panics, the vector keeps its previous content.
	pub fn initialize_from<I>(&mut self, values: I) -> Result<(), ReserveError> where I: IntoIterator<Item = T>, I::IntoIter: ExactSizeIterator {
		let values = values.into_iter();
		let capacity = values.len();

		let mut fresh = Self::new();
		let data = Self::allocate(cmp::max(capacity, 1))?;
		fresh.data = Some(data);

		for value in values.take(capacity) {
			// SAFETY: `fresh.len < capacity`.
			unsafe {
				ptr::write(data.as_ptr().add(fresh.len), value);
			}
			fresh.len += 1;
		}

		*self = fresh;
		Ok(())
	}

	/// Moves the content of `other` into `self`, leaving `other` empty
	/// without any block.
	///
	/// The previous content of `self` is released.
	#[inline]
	pub fn take_from(&mut self, other: &mut Self) {
		self.free();
		self.swap(other)
	}

	/// Replaces the content of `self` with a deep copy of `other`.
	///
	/// If the copy fails, `self` is left untouched.
	pub fn copy_from(&mut self, other: &Self) -> Result<(), ReserveError> where T: Clone {
		let mut copy = other.try_clone()?;
		self.swap(&mut copy);
		Ok(())
	}

	/// Returns a deep copy of the vector, with the same capacity.
	pub fn try_clone(&self) -> Result<Self, ReserveError> where T: Clone {
		let mut copy = Self::new();

		if self.data.is_some() {
			let data = Self::allocate(cmp::max(self.capacity(), 1))?;
			copy.data = Some(data);

			// SAFETY: the new block is at least as large as ours.
			unsafe {
				fill::fill(data.as_ptr(), self.as_slice());
			}
			copy.len = self.len;
		}

		Ok(copy)
	}

	/// Makes sure the vector can hold at least `capacity` elements.
	///
	/// If `capacity` is 0, the vector grows anyway:
	/// its capacity is multiplied by [`GROWTH_FACTOR`],
	/// or set to [`INITIAL_CAPACITY`] if it owns no block.
	/// Otherwise does nothing if the capacity is already sufficient.
	///
	/// The length and the elements are not modified. If the allocation fails,
	/// or if relocating an element panics, the vector keeps its original block.
	///
	/// # Example
	///
	/// ```
	/// # use tag_vec::Vector;
	/// let mut v: Vector<u8> = Vector::new();
	/// v.reserve(0).unwrap();
	/// assert_eq!(v.capacity(), 10);
	/// v.reserve(0).unwrap();
	/// assert_eq!(v.capacity(), 20);
	/// v.reserve(15).unwrap();
	/// assert_eq!(v.capacity(), 20);
	/// ```
	pub fn reserve(&mut self, capacity: usize) -> Result<(), ReserveError> {
		let current = self.capacity();

		let target = if capacity == 0 {
			if current == 0 {
				INITIAL_CAPACITY
			} else {
				current.saturating_mul(GROWTH_FACTOR)
			}
		} else if capacity <= current {
			return Ok(())
		} else {
			capacity
		};

		self.grow_to(target)
	}

	/// Resizes the vector so that its length is `len`.
	///
	/// New elements are default-constructed; extra elements are destroyed, last one first.
	/// The capacity is only changed if the vector must grow beyond it.
	pub fn resize(&mut self, len: usize) -> Result<(), ReserveError> where T: Default {
		self.resize_with(len, T::default)
	}

	/// Resizes the vector so that its length is `len`, constructing new elements with `f`.
	///
	/// If `f` panics, the elements constructed so far are kept.
	pub fn resize_with<F>(&mut self, len: usize, f: F) -> Result<(), ReserveError> where F: FnMut() -> T {
		if len > self.len {
			if len > self.capacity() {
				self.reserve(len)?;
			}

			self.extend_with(len - self.len, f);
		} else {
			self.truncate(len);
		}

		Ok(())
	}

	/// Appends an element to the back of the vector.
	///
	/// If the vector is full it grows first (see [`reserve`](Self::reserve)).
	/// If growing fails, `value` is dropped and the vector is unchanged.
	#[inline]
	pub fn push_back(&mut self, value: T) -> Result<(), ReserveError> {
		self.emplace_back(|| value)
	}

	/// Constructs an element at the back of the vector.
	///
	/// Room is made before `f` is called.
	/// If `f` panics, the length is unchanged.
	pub fn emplace_back<F>(&mut self, f: F) -> Result<(), ReserveError> where F: FnOnce() -> T {
		if self.len == self.capacity() {
			self.reserve(0)?;
		}

		// SAFETY: there is room for one more element.
		unsafe {
			let end = self.as_mut_ptr().add(self.len);
			ptr::write(end, f());
		}

		self.len += 1;
		Ok(())
	}

	/// Destroys every element.
	///
	/// The block is kept, hence the capacity is unchanged.
	#[inline]
	pub fn clear(&mut self) {
		self.truncate(0)
	}

	/// Exchanges the content of two vectors, without moving any element.
	#[inline]
	pub fn swap(&mut self, other: &mut Self) {
		mem::swap(&mut self.data, &mut other.data);
		mem::swap(&mut self.len, &mut other.len);
	}

	/// Destroys every element and releases the block.
	///
	/// Calling it again, or dropping the vector afterward, does nothing more.
	pub fn free(&mut self) {
		self.clear();
		if let Some(data) = self.data.take() {
			// SAFETY: the block comes from `A` and is no longer referenced.
			unsafe {
				A::free(data.cast())
			}
		}
	}

	/// Shortens the vector to `len` elements, destroying the rest last one first.
	fn truncate(&mut self, len: usize) {
		if len >= self.len {
			return
		}

		let old_len = self.len;
		// A panicking destructor must not lead to a double drop.
		self.len = len;

		// SAFETY: the elements in `len..old_len` are initialized and no longer counted.
		unsafe {
			let data = self.as_mut_ptr();
			fill::destroy_range(data.add(len), data.add(old_len))
		}
	}

	/// Appends `n` elements constructed with `f`.
	///
	/// The capacity must be sufficient.
	fn extend_with<F>(&mut self, n: usize, mut f: F) where F: FnMut() -> T {
		debug_assert!(self.len + n <= self.capacity());

		unsafe {
			let mut end = self.as_mut_ptr().add(self.len);
			let mut local_len = SetLenOnDrop::new(&mut self.len);

			for _ in 0..n {
				ptr::write(end, f());
				end = end.add(1);
				// Increment the length in every step in case `f` panics.
				local_len.increment_len(1);
			}

			// len set by scope guard
		}
	}

	/// Number of bytes needed to store `capacity` elements.
	fn bytes_for(capacity: usize) -> Result<usize, ReserveError> {
		let elem_size = mem::size_of::<T>();

		match capacity.checked_mul(elem_size) {
			Some(bytes) if raw::block_layout(bytes).is_some() => Ok(bytes),
			_ => {
				log::error!("can't allocate {} elements of {} bytes", capacity, elem_size);
				Err(ReserveError::CapacityOverflow {
					requested: capacity,
					elem_size
				})
			}
		}
	}

	/// Allocates a new block with room for `capacity` elements.
	fn allocate(capacity: usize) -> Result<NonNull<T>, ReserveError> {
		#[allow(clippy::let_unit_value)]
		let () = Self::LAYOUT_CHECK;

		let bytes = Self::bytes_for(capacity)?;
		match A::allocate(bytes) {
			Some(payload) => Ok(payload.cast()),
			None => {
				log::error!("failed to allocate {} bytes for a vector of {} elements", bytes, capacity);
				Err(ReserveError::AllocFailed { bytes })
			}
		}
	}

	/// Grows the vector to exactly `capacity` elements.
	///
	/// The capacity must be greater than the current one.
	fn grow_to(&mut self, capacity: usize) -> Result<(), ReserveError> {
		debug_assert!(capacity > self.capacity());

		match self.data {
			None => {
				self.data = Some(Self::allocate(capacity)?);
				Ok(())
			},
			Some(data) => {
				if <T::Transfer as Transfer<T>>::TRIVIAL {
					self.grow_in_place(data, capacity)
				} else {
					self.grow_by_transfer(data, capacity)
				}
			}
		}
	}

	/// Resizes the current block, letting the allocator move the bytes if needed.
	fn grow_in_place(&mut self, data: NonNull<T>, capacity: usize) -> Result<(), ReserveError> {
		let bytes = Self::bytes_for(capacity)?;

		// SAFETY: `data` is the payload of the block we own.
		match unsafe { A::reallocate(data.cast(), bytes) } {
			Some(payload) => {
				log::trace!("vector block resized to {} elements", capacity);
				self.data = Some(payload.cast());
				Ok(())
			},
			None => {
				log::error!("failed to reserve {} bytes for a vector of {} elements", bytes, capacity);
				Err(ReserveError::AllocFailed { bytes })
			}
		}
	}

	/// Transfers every element to a new block, then releases the current one.
	fn grow_by_transfer(&mut self, data: NonNull<T>, capacity: usize) -> Result<(), ReserveError> {
		let block = Self::allocate(capacity)?;
		let guard = BlockGuard::<A>::new(block.cast());

		// SAFETY: the new block has room for `len` elements and is distinct from ours.
		// On panic, `fill_move` undoes its partial work, the guard releases the new block
		// and `self` still owns the original elements.
		let keeps_source = unsafe { fill::fill_move(block.as_ptr(), data.as_ptr(), self.len) };
		mem::forget(guard);

		self.data = Some(block);
		log::trace!("vector elements transferred to a block of {} elements", capacity);

		// SAFETY: if the source is still alive it is destroyed exactly once,
		// then the block is released.
		unsafe {
			if keeps_source {
				fill::destroy_range(data.as_ptr(), data.as_ptr().add(self.len));
			}

			A::free(data.cast());
		}

		Ok(())
	}
}

/// Releases a block when dropped, unless forgotten.
struct BlockGuard<A: BlockAlloc> {
	payload: NonNull<u8>,
	alloc: PhantomData<A>
}

impl<A: BlockAlloc> BlockGuard<A> {
	#[inline]
	fn new(payload: NonNull<u8>) -> Self {
		BlockGuard {
			payload,
			alloc: PhantomData
		}
	}
}

impl<A: BlockAlloc> Drop for BlockGuard<A> {
	fn drop(&mut self) {
		unsafe { A::free(self.payload) }
	}
}

// Set the length of the vec when the `SetLenOnDrop` value goes out of scope.
//
// The length field in SetLenOnDrop is a local variable
// that the optimizer will see does not alias with any stores through the data pointer.
struct SetLenOnDrop<'a> {
	len: &'a mut usize,
	local_len: usize
}

impl<'a> SetLenOnDrop<'a> {
	#[inline]
	fn new(len: &'a mut usize) -> Self {
		SetLenOnDrop {
			local_len: *len,
			len
		}
	}

	#[inline]
	fn increment_len(&mut self, increment: usize) {
		self.local_len += increment;
	}
}

impl Drop for SetLenOnDrop<'_> {
	#[inline]
	fn drop(&mut self) {
		*self.len = self.local_len;
	}
}

impl<T: Element, A: BlockAlloc> Default for Vector<T, A> {
	#[inline]
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Element + Clone, A: BlockAlloc> Clone for Vector<T, A> {
	/// Deep copy of the vector.
	///
	/// # Panics
	///
	/// Panics on capacity overflow, and calls [`handle_alloc_error`]
	/// if the allocation fails. Use [`Vector::try_clone`] to handle errors.
	fn clone(&self) -> Self {
		handle_reserve(self.try_clone())
	}
}

impl<T: Element, A: BlockAlloc> Element for Vector<T, A> {
	type Transfer = ByMove;
}

unsafe impl<T: Element + Send, A: BlockAlloc> Send for Vector<T, A> {}
unsafe impl<T: Element + Sync, A: BlockAlloc> Sync for Vector<T, A> {}

impl<T: Element, A: BlockAlloc> Deref for Vector<T, A> {
	type Target = [T];

	#[inline]
	fn deref(&self) -> &[T] {
		self.as_slice()
	}
}

impl<T: Element, A: BlockAlloc> DerefMut for Vector<T, A> {
	#[inline]
	fn deref_mut(&mut self) -> &mut [T] {
		self.as_mut_slice()
	}
}

impl<'v, T: Element, A: BlockAlloc> IntoIterator for &'v Vector<T, A> {
	type Item = &'v T;
	type IntoIter = slice::Iter<'v, T>;

	fn into_iter(self) -> slice::Iter<'v, T> {
		self.iter()
	}
}

impl<'v, T: Element, A: BlockAlloc> IntoIterator for &'v mut Vector<T, A> {
	type Item = &'v mut T;
	type IntoIter = slice::IterMut<'v, T>;

	fn into_iter(self) -> slice::IterMut<'v, T> {
		self.iter_mut()
	}
}

impl<T: Element, A: BlockAlloc> Extend<T> for Vector<T, A> {
	/// # Panics
	///
	/// Panics on capacity overflow, and calls [`handle_alloc_error`]
	/// if an allocation fails.
	fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
		let iter = iter.into_iter();
		let (lower, _) = iter.size_hint();
		if lower > self.capacity() - self.len {
			handle_reserve(self.reserve(self.len.saturating_add(lower)));
		}

		for value in iter {
			handle_reserve(self.push_back(value))
		}
	}
}

impl<T: Element, A: BlockAlloc> FromIterator<T> for Vector<T, A> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		let mut v = Self::new();
		v.extend(iter);
		v
	}
}

impl<T: Element + fmt::Debug, A: BlockAlloc> fmt::Debug for Vector<T, A> {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

impl<T: Element, A: BlockAlloc> AsRef<[T]> for Vector<T, A> {
	#[inline]
	fn as_ref(&self) -> &[T] {
		self
	}
}

impl<T: Element, A: BlockAlloc> AsMut<[T]> for Vector<T, A> {
	#[inline]
	fn as_mut(&mut self) -> &mut [T] {
		self
	}
}

macro_rules! impl_slice_eq {
	([$($vars:tt)*] $lhs:ty, $rhs:ty) => {
		impl<$($vars)*> PartialEq<$rhs> for $lhs where T: PartialEq<U> {
			#[inline]
			fn eq(&self, other: &$rhs) -> bool { self[..] == other[..] }
			#[inline]
			fn ne(&self, other: &$rhs) -> bool { self[..] != other[..] }
		}
	}
}

impl_slice_eq! { [T: Element, U: Element, A: BlockAlloc, B: BlockAlloc] Vector<T, A>, Vector<U, B> }
impl_slice_eq! { [T: Element, U, A: BlockAlloc] Vector<T, A>, Vec<U> }
impl_slice_eq! { [T, U: Element, A: BlockAlloc] Vec<T>, Vector<U, A> }
impl_slice_eq! { [T: Element, U, A: BlockAlloc] Vector<T, A>, &[U] }
impl_slice_eq! { [T: Element, U, A: BlockAlloc] Vector<T, A>, &mut [U] }
impl_slice_eq! { [T, U: Element, A: BlockAlloc] &[T], Vector<U, A> }
impl_slice_eq! { [T: Element, U, A: BlockAlloc, const N: usize] Vector<T, A>, [U; N] }
impl_slice_eq! { [T: Element, U, A: BlockAlloc, const N: usize] Vector<T, A>, &[U; N] }

impl<T: Element + Eq, A: BlockAlloc> Eq for Vector<T, A> {}

// Central function for reserve error handling.
#[inline]
fn handle_reserve<R>(result: Result<R, ReserveError>) -> R {
	match result {
		Ok(r) => r,
		Err(ReserveError::CapacityOverflow { .. }) => capacity_overflow(),
		Err(ReserveError::AllocFailed { bytes }) => match raw::block_layout(bytes) {
			Some(layout) => handle_alloc_error(layout),
			None => capacity_overflow()
		}
	}
}

// One central function responsible for reporting capacity overflows. This'll
// ensure that the code generation related to these panics is minimal as there's
// only one location which panics rather than a bunch throughout the module.
fn capacity_overflow() -> ! {
	panic!("capacity overflow");
}
