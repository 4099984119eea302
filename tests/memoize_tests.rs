// Tests for the #[memery] attribute and #[memoize] methods
//
// These tests verify that memoized methods compute once per distinct
// argument list and per instance, and that clearing the cache forces
// recomputation.

use memery::{memery, MemeryCache, Memoizable, MemoizedMethods};
use serial_test::serial;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[derive(Default, Memoizable)]
struct Calculator {
    cache: MemeryCache,
}

#[memery]
impl Calculator {
    /// Doubles `x`.
    #[memoize]
    pub fn double(&self, x: i32) -> i32 {
        CALL_COUNT.fetch_add(1, Ordering::SeqCst);
        x * 2
    }

    #[memoize]
    pub fn greeting(&self, name: &str, excited: bool) -> String {
        CALL_COUNT.fetch_add(1, Ordering::SeqCst);
        if excited {
            format!("Hello, {name}!")
        } else {
            format!("Hello, {name}")
        }
    }

    #[memoize]
    pub fn shared(&self) -> Arc<Vec<u8>> {
        CALL_COUNT.fetch_add(1, Ordering::SeqCst);
        Arc::new(vec![1, 2, 3])
    }

    #[memoize]
    pub fn sum(&self, values: &[i64]) -> i64 {
        CALL_COUNT.fetch_add(1, Ordering::SeqCst);
        values.iter().sum()
    }

    pub fn not_memoized(&self) -> u32 {
        CALL_COUNT.fetch_add(1, Ordering::SeqCst)
    }
}

#[test_log::test]
#[serial]
fn test_same_arguments_compute_once() {
    CALL_COUNT.store(0, Ordering::SeqCst);
    let calculator = Calculator::default();

    assert_eq!(calculator.double(3), 6);
    assert_eq!(calculator.double(3), 6);
    assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 1);

    // A different argument is a different entry
    assert_eq!(calculator.double(4), 8);
    assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 2);
    assert_eq!(calculator.memery_cache().len(), 2);
}

#[test]
#[serial]
fn test_reference_arguments_are_keyed_by_value() {
    CALL_COUNT.store(0, Ordering::SeqCst);
    let calculator = Calculator::default();

    let first = String::from("Ada");
    let second = String::from("Ada");
    assert_eq!(calculator.greeting(&first, true), "Hello, Ada!");
    assert_eq!(calculator.greeting(&second, true), "Hello, Ada!");
    assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 1);

    assert_eq!(calculator.greeting("Ada", false), "Hello, Ada");
    assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 2);

    assert_eq!(calculator.sum(&[1, 2, 3]), 6);
    assert_eq!(calculator.sum(&vec![1, 2, 3]), 6);
    assert_eq!(calculator.sum(&[3, 2, 1]), 6);
    // Argument order is part of the key
    assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 4);
}

#[test]
#[serial]
fn test_cached_result_is_the_stored_value() {
    CALL_COUNT.store(0, Ordering::SeqCst);
    let calculator = Calculator::default();

    let first = calculator.shared();
    let second = calculator.shared();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 1);
}

#[test]
#[serial]
fn test_instances_do_not_share_results() {
    CALL_COUNT.store(0, Ordering::SeqCst);
    let first = Calculator::default();
    let second = Calculator::default();

    first.double(10);
    second.double(10);
    assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 2);

    first.clear_memery_cache();
    assert!(first.memery_cache().is_empty());
    assert_eq!(second.memery_cache().len(), 1);
}

#[test_log::test]
#[serial]
fn test_clear_forces_recomputation() {
    CALL_COUNT.store(0, Ordering::SeqCst);
    let calculator = Calculator::default();

    // Clearing before anything is cached is harmless
    calculator.clear_memery_cache();

    calculator.double(1);
    calculator.double(2);
    calculator.clear_memery_cache();
    calculator.clear_memery_cache();

    calculator.double(1);
    calculator.double(2);
    assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 4);
}

#[test]
#[serial]
fn test_unmemoized_methods_are_untouched() {
    CALL_COUNT.store(0, Ordering::SeqCst);
    let calculator = Calculator::default();

    assert_eq!(calculator.not_memoized(), 0);
    assert_eq!(calculator.not_memoized(), 1);
    assert!(calculator.memery_cache().is_empty());
}

#[test]
fn test_memoized_query() {
    assert!(Calculator::is_memoized("double"));
    assert!(Calculator::is_memoized("greeting"));
    assert!(!Calculator::is_memoized("not_memoized"));
    assert!(!Calculator::is_memoized("missing"));

    let registry = Calculator::memoized_methods();
    assert_eq!(registry.type_name(), "Calculator");
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["double", "greeting", "shared", "sum"]
    );
}

#[derive(Default, Memoizable)]
struct Fibonacci {
    cache: MemeryCache,
    calls: AtomicU32,
}

#[memery]
impl Fibonacci {
    #[memoize]
    pub fn fib(&self, n: u64) -> u64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if n < 2 {
            n
        } else {
            self.fib(n - 1) + self.fib(n - 2)
        }
    }
}

#[test]
fn test_recursive_calls_reenter_the_cache() {
    let fibonacci = Fibonacci::default();

    assert_eq!(fibonacci.fib(50), 12_586_269_025);
    assert_eq!(fibonacci.calls.load(Ordering::SeqCst), 51);

    assert_eq!(fibonacci.fib(50), 12_586_269_025);
    assert_eq!(fibonacci.calls.load(Ordering::SeqCst), 51);
}

#[derive(Default, Memoizable)]
struct Declared {
    cache: MemeryCache,
    calls: AtomicU32,
}

#[memery(memoize(square), memoize(cube, ttl = 60))]
impl Declared {
    pub fn square(&self, x: u32) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        x * x
    }

    pub fn cube(&self, x: u32) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        x * x * x
    }
}

#[test]
fn test_block_level_declarations() {
    let declared = Declared::default();

    assert_eq!(declared.square(3), 9);
    assert_eq!(declared.square(3), 9);
    assert_eq!(declared.cube(2), 8);
    assert_eq!(declared.cube(2), 8);
    assert_eq!(declared.calls.load(Ordering::SeqCst), 2);

    let cube = Declared::memoized_methods().get("cube").unwrap();
    assert_eq!(cube.ttl(), Some(std::time::Duration::from_secs(60)));
    assert!(Declared::memoized_methods().get("square").unwrap().ttl().is_none());
}

#[derive(Default, Memoizable)]
struct Unit {
    cache: MemeryCache,
    calls: AtomicU32,
}

#[memery]
impl Unit {
    #[memoize]
    pub fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_unit_results_are_cached() {
    let unit = Unit::default();
    unit.touch();
    unit.touch();
    assert_eq!(unit.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_version_is_exposed() {
    assert_eq!(memery::VERSION, env!("CARGO_PKG_VERSION"));
}
