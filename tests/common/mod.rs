//! Shared test fixtures: a block allocator that can be told to fail,
//! a log sink that records messages per thread, and an element type that panics on demand.
#![allow(dead_code)]

use std::{
	cell::{
		Cell,
		RefCell
	},
	ptr::NonNull,
	rc::Rc,
	sync::Once
};
use tag_vec::{
	raw::{
		BlockAlloc,
		Heap
	},
	relocate::ByClone,
	Element
};

thread_local! {
	/// Number of allocator requests to grant before refusing, if any.
	static GRANTS: Cell<Option<usize>> = Cell::new(None);

	static RECORDS: RefCell<Vec<(log::Level, String)>> = RefCell::new(Vec::new());
}

/// Heap allocator refusing requests once its budget is spent.
///
/// The budget is per thread so that tests can run in parallel.
pub struct Failing;

impl Failing {
	/// Grants the next `n` requests, then refuses every request.
	pub fn fail_after(n: usize) {
		GRANTS.with(|grants| grants.set(Some(n)))
	}

	/// Grants every request.
	pub fn reset() {
		GRANTS.with(|grants| grants.set(None))
	}

	fn grant() -> bool {
		GRANTS.with(|grants| match grants.get() {
			None => true,
			Some(0) => false,
			Some(n) => {
				grants.set(Some(n - 1));
				true
			}
		})
	}
}

unsafe impl BlockAlloc for Failing {
	fn allocate(len: usize) -> Option<NonNull<u8>> {
		if Self::grant() {
			Heap::allocate(len)
		} else {
			None
		}
	}

	unsafe fn reallocate(payload: NonNull<u8>, len: usize) -> Option<NonNull<u8>> {
		if Self::grant() {
			Heap::reallocate(payload, len)
		} else {
			None
		}
	}

	unsafe fn free(payload: NonNull<u8>) {
		Heap::free(payload)
	}
}

struct Capture;

impl log::Log for Capture {
	fn enabled(&self, _metadata: &log::Metadata) -> bool {
		true
	}

	fn log(&self, record: &log::Record) {
		RECORDS.with(|records| records.borrow_mut().push((record.level(), record.args().to_string())))
	}

	fn flush(&self) {}
}

static CAPTURE: Capture = Capture;
static INSTALL: Once = Once::new();

/// Installs the capturing logger (once) and clears the records of the current thread.
pub fn capture_logs() {
	INSTALL.call_once(|| {
		log::set_logger(&CAPTURE).expect("another logger is installed");
		log::set_max_level(log::LevelFilter::Trace);
	});

	RECORDS.with(|records| records.borrow_mut().clear())
}

/// Messages logged by the current thread at the given level since the last [`capture_logs`].
pub fn logged(level: log::Level) -> Vec<String> {
	RECORDS.with(|records| {
		records.borrow().iter().filter(|(l, _)| *l == level).map(|(_, msg)| msg.clone()).collect()
	})
}

/// Shared counters of a family of [`Fragile`] values.
#[derive(Clone, Default)]
pub struct Counters {
	pub clones: Rc<Cell<usize>>,
	pub drops: Rc<Cell<usize>>
}

impl Counters {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a value that panics on the `fail_at`-th clone of its family.
	pub fn fragile(&self, value: u32, fail_at: usize) -> Fragile {
		Fragile {
			value,
			fail_at,
			counters: self.clone()
		}
	}

	/// Number of values of this family currently alive.
	pub fn live(&self, created: usize) -> usize {
		created + self.clones.get() - self.drops.get()
	}
}

/// Non-trivial element relocated by copy, whose `clone` panics on demand.
pub struct Fragile {
	pub value: u32,
	fail_at: usize,
	counters: Counters
}

impl Clone for Fragile {
	fn clone(&self) -> Self {
		let n = self.counters.clones.get() + 1;
		if n == self.fail_at {
			panic!("clone #{} of {} failed", n, self.value)
		}

		self.counters.clones.set(n);
		Fragile {
			value: self.value,
			fail_at: self.fail_at,
			counters: self.counters.clone()
		}
	}
}

impl Drop for Fragile {
	fn drop(&mut self) {
		self.counters.drops.set(self.counters.drops.get() + 1)
	}
}

impl Element for Fragile {
	type Transfer = ByClone;
}
