//! Per-segment object representations (§4.M). Each object owns its raw
//! bytes and (for stack/heap objects) a liveness bitset; pointer arithmetic
//! and dereference checks are implemented once here and reused by every
//! segment manager in [`super`].

use crate::config::{Endianness, TargetProperties};
use bit_vec::BitVec;

/// Result of [`GlobalObject::do_pointer_arithmetic`] and friends (§4.M
/// `do_pointer_arithmetic`): one step past the end is allowed and recorded,
/// anything further is a bounds failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerArithmeticResult {
    pub address: u64,
    pub is_one_past_the_end: bool,
}

/// Outcome of [`super::heap::HeapManager::free`] (§4.M "Heap `free`").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreeResult {
    Good,
    DoubleFree,
    UnknownAddress,
    AddressInsideObject,
}

/// A bit per byte: whether that byte currently holds a live value (§4.M
/// "Lifetime"). `start_lifetime`/`end_lifetime` flip ranges; loads/stores
/// over a non-live range fail.
#[derive(Clone, Debug)]
pub struct LifetimeBitset {
    bits: BitVec,
}

impl LifetimeBitset {
    #[must_use]
    pub fn new(size: usize, initially_alive: bool) -> Self {
        LifetimeBitset { bits: BitVec::from_elem(size, initially_alive) }
    }

    pub fn set_range(&mut self, begin: usize, end: usize, value: bool) {
        for i in begin..end {
            self.bits.set(i, value);
        }
    }

    #[must_use]
    pub fn is_all(&self, begin: usize, end: usize) -> bool {
        (begin..end).all(|i| self.bits.get(i).unwrap_or(false))
    }

    #[must_use]
    pub fn is_none(&self, begin: usize, end: usize) -> bool {
        (begin..end).all(|i| !self.bits.get(i).unwrap_or(true))
    }
}

/// Shared bounds/arithmetic/dereference logic for every flavor of object
/// (§4.M: global, stack, and heap objects share the same pointer-arithmetic
/// and dereference-check contract, differing only in how they track
/// liveness).
#[derive(Clone, Debug)]
pub struct ObjectStorage {
    pub address: u64,
    pub size: u64,
    pub memory: Vec<u8>,
}

impl ObjectStorage {
    #[must_use]
    pub fn new(address: u64, size: u64) -> Self {
        ObjectStorage { address, size, memory: vec![0u8; size as usize] }
    }

    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.address && addr < self.address + self.size
    }

    #[must_use]
    pub fn check_dereference(&self, addr: u64, subobject_size: u64) -> bool {
        addr >= self.address && addr + subobject_size <= self.address + self.size
    }

    #[must_use]
    pub fn do_pointer_arithmetic(&self, addr: u64, amount: i64, elem_size: u64) -> Option<PointerArithmeticResult> {
        let offset = amount.checked_mul(elem_size as i64)?;
        let new_addr = if offset >= 0 { addr.checked_add(offset as u64)? } else { addr.checked_sub((-offset) as u64)? };
        let end = self.address + self.size;
        if new_addr < self.address || new_addr > end {
            return None;
        }
        Some(PointerArithmeticResult { address: new_addr, is_one_past_the_end: new_addr == end })
    }

    #[must_use]
    pub fn do_pointer_difference(&self, lhs: u64, rhs: u64, elem_size: u64) -> Option<i64> {
        if elem_size == 0 || !self.contains_inclusive_end(lhs) || !self.contains_inclusive_end(rhs) {
            return None;
        }
        let diff = lhs as i64 - rhs as i64;
        if diff % elem_size as i64 != 0 {
            return None;
        }
        Some(diff / elem_size as i64)
    }

    fn contains_inclusive_end(&self, addr: u64) -> bool {
        addr >= self.address && addr <= self.address + self.size
    }

    pub fn read(&self, addr: u64, len: u64) -> Option<&[u8]> {
        if !self.check_dereference(addr, len) {
            return None;
        }
        let start = (addr - self.address) as usize;
        self.memory.get(start..start + len as usize)
    }

    pub fn write(&mut self, addr: u64, bytes: &[u8]) -> Option<()> {
        if !self.check_dereference(addr, bytes.len() as u64) {
            return None;
        }
        let start = (addr - self.address) as usize;
        self.memory[start..start + bytes.len()].copy_from_slice(bytes);
        Some(())
    }
}

/// A global (static-storage-duration) object (§4.M `global_object`).
#[derive(Clone, Debug)]
pub struct GlobalObject {
    pub storage: ObjectStorage,
}

/// A stack object, alive for the lifetime of its enclosing frame (§4.M
/// `stack_object`).
#[derive(Clone, Debug)]
pub struct StackObject {
    pub storage: ObjectStorage,
    pub lifetime: LifetimeBitset,
}

impl StackObject {
    #[must_use]
    pub fn new(address: u64, size: u64, always_initialized: bool) -> Self {
        StackObject { storage: ObjectStorage::new(address, size), lifetime: LifetimeBitset::new(size as usize, always_initialized) }
    }

    fn local(&self, addr: u64) -> usize {
        (addr - self.storage.address) as usize
    }

    pub fn start_lifetime(&mut self, begin: u64, end: u64) {
        self.lifetime.set_range(self.local(begin), self.local(end), true);
    }

    pub fn end_lifetime(&mut self, begin: u64, end: u64) {
        self.lifetime.set_range(self.local(begin), self.local(end), false);
    }

    #[must_use]
    pub fn is_alive(&self, begin: u64, end: u64) -> bool {
        self.lifetime.is_all(self.local(begin), self.local(end))
    }
}

/// A heap allocation's backing storage (§4.M `heap_object`); the allocation
/// it belongs to tracks the freed/double-free bookkeeping (see
/// [`super::heap::Allocation`]).
#[derive(Clone, Debug)]
pub struct HeapObject {
    pub storage: ObjectStorage,
    pub elem_size: u64,
    pub count: u64,
    pub lifetime: LifetimeBitset,
}

impl HeapObject {
    #[must_use]
    pub fn new(address: u64, elem_size: u64, count: u64) -> Self {
        let size = elem_size * count;
        HeapObject { storage: ObjectStorage::new(address, size), elem_size, count, lifetime: LifetimeBitset::new(size as usize, true) }
    }
}

/// Byteswaps `bytes` in place when `target` disagrees with the host (§4.M
/// "Endianness is a configured property").
pub fn maybe_byteswap(bytes: &mut [u8], target: &TargetProperties) {
    if !target.endianness.matches_host() {
        bytes.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_one_past_the_end_is_allowed_once() {
        let obj = ObjectStorage::new(0x1000, 16);
        let r = obj.do_pointer_arithmetic(0x1000, 4, 4).unwrap();
        assert_eq!(r.address, 0x1010);
        assert!(r.is_one_past_the_end);
        assert!(obj.do_pointer_arithmetic(0x1000, 5, 4).is_none());
    }

    #[test]
    fn difference_divides_by_element_size() {
        let obj = ObjectStorage::new(0x1000, 16);
        assert_eq!(obj.do_pointer_difference(0x1008, 0x1000, 4), Some(2));
    }

    #[test]
    fn lifetime_tracks_initialized_ranges() {
        let mut obj = StackObject::new(0x2000, 8, false);
        assert!(!obj.is_alive(0x2000, 0x2008));
        obj.start_lifetime(0x2000, 0x2008);
        assert!(obj.is_alive(0x2000, 0x2008));
        obj.end_lifetime(0x2000, 0x2004);
        assert!(!obj.is_alive(0x2000, 0x2008));
        assert!(obj.is_alive(0x2004, 0x2008));
    }
}
