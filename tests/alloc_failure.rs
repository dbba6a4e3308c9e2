use log::Level;
use tag_vec::{
	ReserveError,
	Vector,
	INITIAL_CAPACITY
};

mod common;
use common::{
	capture_logs,
	logged,
	Counters,
	Failing,
	Fragile
};

#[test]
fn first_allocation_failure() {
	capture_logs();
	Failing::fail_after(0);

	let mut v: Vector<u32, Failing> = Vector::new();
	assert_eq!(v.initialize(5), Err(ReserveError::AllocFailed { bytes: 20 }));
	assert_eq!(v.len(), 0);
	assert_eq!(v.capacity(), 0);
	assert_eq!(v.push_back(1), Err(ReserveError::AllocFailed { bytes: 40 }));
	assert!(v.is_empty());
	assert_eq!(logged(Level::Error).len(), 2);

	Failing::reset();
}

#[test]
fn failed_reallocation_keeps_the_block() {
	capture_logs();
	Failing::fail_after(1);

	let mut v: Vector<u64, Failing> = Vector::new();
	for i in 0..INITIAL_CAPACITY as u64 {
		v.push_back(i).unwrap();
	}
	assert!(logged(Level::Error).is_empty());

	let ptr = v.as_ptr();
	assert_eq!(v.push_back(10), Err(ReserveError::AllocFailed { bytes: 160 }));
	assert_eq!(v.as_ptr(), ptr);
	assert_eq!(v.capacity(), INITIAL_CAPACITY);
	assert_eq!(v, (0..INITIAL_CAPACITY as u64).collect::<Vec<_>>());

	let errors = logged(Level::Error);
	assert_eq!(errors.len(), 1);
	assert!(errors[0].contains("160 bytes"));

	Failing::reset();
	v.push_back(10).unwrap();
	assert_eq!(v.len(), INITIAL_CAPACITY + 1);
}

#[test]
fn failed_transfer_allocation_keeps_the_elements() {
	capture_logs();
	Failing::fail_after(1);

	let counters = Counters::new();
	let mut v: Vector<Fragile, Failing> = Vector::new();
	for i in 0..3 {
		v.push_back(counters.fragile(i, usize::MAX)).unwrap();
	}

	assert!(matches!(v.reserve(100), Err(ReserveError::AllocFailed { .. })));
	assert_eq!(v.len(), 3);
	assert_eq!(v.capacity(), INITIAL_CAPACITY);
	assert_eq!(counters.clones.get(), 0);
	assert_eq!(logged(Level::Error).len(), 1);

	Failing::reset();
}

#[test]
fn failed_copy_leaves_the_target_untouched() {
	let mut a: Vector<String, Failing> = Vector::new();
	a.push_back("a".to_string()).unwrap();
	let mut b: Vector<String, Failing> = Vector::new();
	b.push_back("b".to_string()).unwrap();

	Failing::fail_after(0);
	assert!(a.copy_from(&b).is_err());
	assert!(a.try_clone().is_err());
	assert!(a.initialize_from_slice(&["c".to_string()]).is_err());
	assert_eq!(a, ["a"]);
	Failing::reset();
}

#[test]
fn capacity_overflow_is_logged() {
	capture_logs();

	let mut v: Vector<u32> = Vector::new();
	let requested = usize::MAX / 2;
	assert_eq!(
		v.reserve(requested),
		Err(ReserveError::CapacityOverflow { requested, elem_size: 4 })
	);
	assert_eq!(v.capacity(), 0);
	assert_eq!(logged(Level::Error).len(), 1);
}

#[test]
fn successful_operations_log_no_error() {
	capture_logs();

	let mut v: Vector<String> = Vector::new();
	for i in 0..100 {
		v.push_back(i.to_string()).unwrap();
	}
	v.resize(500).unwrap();
	v.clear();

	assert!(logged(Level::Error).is_empty());
	assert!(!logged(Level::Trace).is_empty());
}

#[test]
fn error_messages() {
	assert_eq!(
		ReserveError::AllocFailed { bytes: 64 }.to_string(),
		"failed to allocate a block of 64 bytes"
	);
	assert_eq!(
		ReserveError::CapacityOverflow { requested: 3, elem_size: 8 }.to_string(),
		"can't allocate 3 elements of 8 bytes: capacity overflow"
	);
}
