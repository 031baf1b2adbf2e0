//! Runs in its own test binary so that no other test can touch the shared
//! executor before these threads race to create it.
use script_executor::ScriptExecutor;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_concurrent_first_access_yields_one_instance() {
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ScriptExecutor::instance() as *const ScriptExecutor as usize
            })
        })
        .collect();
    let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addrs.iter().all(|a| *a == addrs[0]));
    assert!(std::ptr::eq(
        ScriptExecutor::instance(),
        addrs[0] as *const ScriptExecutor
    ));
}
