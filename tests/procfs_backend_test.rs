//! Linux procfs backend against the test process itself

#![cfg(target_os = "linux")]

use memory_recorder::process::{NativeOpener, ProcfsProcess};
use memory_recorder::{
    Address, AddressWidth, MemoryValue, PointerChain, ProcessMemory, ProcessOpener, Session,
    ValueType,
};
use std::hint::black_box;
use std::thread;
use std::time::Duration;

fn address_of<T>(value: &T) -> String {
    format!("{:x}", value as *const T as usize)
}

#[test]
fn test_read_value_from_self() {
    let value: i32 = black_box(-123_456);
    let session = Session::new(NativeOpener::new());

    assert_eq!(
        session
            .read_value(std::process::id(), &address_of(&value), ValueType::I32)
            .unwrap(),
        MemoryValue::I32(-123_456)
    );
}

#[test]
fn test_resolve_pointer_in_self() {
    let target: u64 = black_box(0xFEED_FACE);
    let boxed: Box<*const u64> = Box::new(&target as *const u64);
    let slot = &*boxed as *const *const u64 as u64;

    let session = Session::new(NativeOpener::new());
    let chain = PointerChain::from_address(Address::new(slot), vec![0, 0]);
    let resolved = session.resolve_pointer(std::process::id(), &chain).unwrap();

    assert_eq!(resolved, Address::new(&target as *const u64 as u64));
    assert_eq!(session.address_width(std::process::id()).unwrap(), AddressWidth::native());
}

#[test]
fn test_modules_include_test_binary() {
    let process = ProcfsProcess::open(std::process::id()).unwrap();
    let exe = std::env::current_exe().unwrap();
    let exe_name = exe.file_name().unwrap().to_string_lossy().into_owned();

    let modules = process.enumerate_modules().unwrap();
    assert!(
        modules.iter().any(|m| m.name == exe_name),
        "{} not in {:?}",
        exe_name,
        modules
    );
}

#[test]
fn test_self_is_a_candidate() {
    let processes = NativeOpener::new().list_candidate_processes().unwrap();
    assert!(processes.iter().any(|p| p.pid == std::process::id()));
}

#[test]
fn test_record_own_memory() {
    let data: [u8; 8] = black_box([1, 2, 3, 4, 5, 6, 7, 8]);
    let session = Session::new(NativeOpener::new());

    session
        .start_recording(std::process::id(), &address_of(&data), 8, 10)
        .unwrap();
    thread::sleep(Duration::from_millis(50));
    let frames = session.stop_recording().unwrap();

    assert!(frames >= 1);
    assert_eq!(session.get_frame(0).unwrap(), data.to_vec());
}
