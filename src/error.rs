use thiserror::Error;

/// Error returned when a [`Vector`](crate::Vector) cannot obtain the memory it needs.
///
/// The vector is always left in its previous state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ReserveError {
	/// The requested capacity cannot be expressed in bytes.
	#[error("can't allocate {requested} elements of {elem_size} bytes: capacity overflow")]
	CapacityOverflow {
		/// Number of elements requested.
		requested: usize,

		/// Size of one element.
		elem_size: usize
	},

	/// The allocator refused the request.
	#[error("failed to allocate a block of {bytes} bytes")]
	AllocFailed {
		/// Payload size of the requested block.
		bytes: usize
	}
}
