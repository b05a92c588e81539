//! §4.M memory manager tests that exercise behaviors the module's own
//! `#[cfg(test)]` block doesn't already cover: segment-typed byte sizing,
//! global storage, one-past-the-end pointer arithmetic, and popped stack
//! frames actually releasing their addresses.

use frontc::config::TargetProperties;
use frontc::memory::{byte_size, segment_of, MemoryManager, Segment};
use frontc::symbol::intern;
use frontc::types::typespec::{Modifier, Terminator, Typespec};

fn i32_ty() -> Typespec {
    Typespec::new(Terminator::BaseType(intern("i32")))
}

#[test]
fn byte_size_matches_the_declared_primitive_width() {
    let target = TargetProperties::host();
    assert_eq!(byte_size(&i32_ty(), &target), 4);
    assert_eq!(byte_size(&Typespec::new(Terminator::BaseType(intern("u8"))), &target), 1);
    assert_eq!(byte_size(&Typespec::new(Terminator::BaseType(intern("f64"))), &target), 8);
}

#[test]
fn byte_size_of_a_pointer_tracks_the_target_s_pointer_width() {
    let ptr_ty = i32_ty().with_modifier(Modifier::Pointer);
    let target32 = TargetProperties { pointer_size: 4, endianness: frontc::config::Endianness::host() };
    let target64 = TargetProperties { pointer_size: 8, endianness: frontc::config::Endianness::host() };
    assert_eq!(byte_size(&ptr_ty, &target32), 4);
    assert_eq!(byte_size(&ptr_ty, &target64), 8);
}

#[test]
fn global_storage_round_trips_written_bytes() {
    let mut mm = MemoryManager::new(TargetProperties::host());
    let addr = mm.add_global(4);
    assert_eq!(segment_of(addr), Segment::Global);
    assert!(mm.write(addr, &[1, 2, 3, 4]));
    assert_eq!(mm.read(addr, 4), Some(vec![1, 2, 3, 4]));
}

#[test]
fn popped_stack_frame_addresses_are_no_longer_dereferenceable() {
    let mut mm = MemoryManager::new(TargetProperties::host());
    let addrs = mm.push_stack_frame(&[4]);
    mm.start_lifetime(addrs[0], 4);
    assert!(mm.write(addrs[0], &[9, 9, 9, 9]));
    mm.pop_stack_frame();
    assert!(!mm.check_dereference(addrs[0], 4));
}

#[test]
fn one_past_the_end_pointer_arithmetic_is_allowed_but_flagged() {
    let mut mm = MemoryManager::new(TargetProperties::host());
    let addr = mm.heap_allocate(4, 4); // 4 elements of 4 bytes each
    let result = mm.do_pointer_arithmetic(addr, 4, 4).expect("one-past-the-end is in range");
    assert!(result.is_one_past_the_end);
    assert!(mm.do_pointer_arithmetic(addr, 5, 4).is_none());
}

#[test]
fn comparing_pointers_is_also_provenance_checked() {
    let mut mm = MemoryManager::new(TargetProperties::host());
    let a = mm.heap_allocate(4, 4);
    // Within the same allocation, ordering works (built on the same
    // provenance-checked difference as `do_pointer_difference`).
    assert_eq!(mm.compare_pointers(a, a + 4), Some(std::cmp::Ordering::Less));
    let b = mm.heap_allocate(4, 4);
    assert_eq!(mm.compare_pointers(a, b), None);
}
