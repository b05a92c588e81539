//! The comptime memory manager (§4.M): four segments with fixed address
//! ranges, so that deciding which segment an address belongs to is a single
//! range check. Backs the abstract machine (§4.C.2) during `consteval_try`.

pub mod meta;
pub mod object;

use crate::config::TargetProperties;
use crate::symbol::intern;
use crate::types::typespec::{Modifier, Terminator, Typespec};
use meta::MetaMemoryManager;
use object::{FreeResult, GlobalObject, HeapObject, ObjectStorage, PointerArithmeticResult, StackObject};

pub const GLOBAL_BEGIN: u64 = 0x1_0000_0000;
pub const STACK_BEGIN: u64 = 0x2_0000_0000;
pub const HEAP_BEGIN: u64 = 0x3_0000_0000;
pub const META_BEGIN: u64 = 0x4_0000_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Invalid,
    Global,
    Stack,
    Heap,
    Meta,
}

#[must_use]
pub fn segment_of(addr: u64) -> Segment {
    if addr >= META_BEGIN {
        Segment::Meta
    } else if addr >= HEAP_BEGIN {
        Segment::Heap
    } else if addr >= STACK_BEGIN {
        Segment::Stack
    } else if addr >= GLOBAL_BEGIN {
        Segment::Global
    } else {
        Segment::Invalid
    }
}

/// Byte size of a typespec under `target` (§4.M feeds `constant_value_from_object`
/// / `alloca` sizing; this core never lowers to a real target so only the
/// shapes the abstract machine itself allocates need a size).
#[must_use]
pub fn byte_size(ty: &Typespec, target: &TargetProperties) -> u64 {
    if let Some(m) = ty.modifiers.first() {
        return match m {
            Modifier::Pointer | Modifier::LvalueReference | Modifier::MoveReference | Modifier::AutoReference | Modifier::AutoReferenceMut => {
                target.pointer_size as u64
            }
            Modifier::ArraySlice => target.pointer_size as u64 * 2,
            Modifier::Array(n) => n * byte_size(&Typespec { modifiers: ty.modifiers[1..].into(), terminator: ty.terminator.clone() }, target),
            Modifier::Optional => {
                1 + byte_size(&Typespec { modifiers: ty.modifiers[1..].into(), terminator: ty.terminator.clone() }, target)
            }
            Modifier::Mut | Modifier::Const | Modifier::Consteval | Modifier::Variadic => {
                byte_size(&Typespec { modifiers: ty.modifiers[1..].into(), terminator: ty.terminator.clone() }, target)
            }
        };
    }
    match &ty.terminator {
        Terminator::BaseType(name) => match name.as_str() {
            "i8" | "u8" | "bool" => 1,
            "i16" | "u16" => 2,
            "i32" | "u32" | "f32" | "char" => 4,
            "i64" | "u64" | "f64" => 8,
            _ => target.pointer_size as u64,
        },
        Terminator::Void => 0,
        Terminator::Tuple(elems) => elems.iter().map(|e| byte_size(e, target)).sum(),
        Terminator::Enum(cases) => {
            let _ = cases;
            4
        }
        Terminator::Auto
        | Terminator::Typename
        | Terminator::Function { .. }
        | Terminator::Unresolved(_)
        | Terminator::GenericParam(_)
        | Terminator::Typeof(_) => target.pointer_size as u64,
    }
}

struct StackFrame {
    id: u32,
    objects: Vec<StackObject>,
    next_address: u64,
}

/// Owns every live segment for one top-level fold request (§4.M
/// `memory_manager`). Constructed fresh per `consteval_try` call so no state
/// leaks between independent folding attempts.
pub struct MemoryManager {
    target: TargetProperties,
    globals: Vec<GlobalObject>,
    global_next: u64,
    frames: Vec<StackFrame>,
    next_frame_id: u32,
    heap: Vec<(HeapObject, bool)>,
    heap_next: u64,
    meta: MetaMemoryManager,
}

impl MemoryManager {
    #[must_use]
    pub fn new(target: TargetProperties) -> Self {
        MemoryManager {
            target,
            globals: Vec::new(),
            global_next: GLOBAL_BEGIN,
            frames: Vec::new(),
            next_frame_id: 0,
            heap: Vec::new(),
            heap_next: HEAP_BEGIN,
            meta: MetaMemoryManager::new(META_BEGIN),
        }
    }

    pub fn add_global(&mut self, size: u64) -> u64 {
        let addr = self.global_next;
        self.global_next += size.max(1);
        self.globals.push(GlobalObject { storage: ObjectStorage::new(addr, size) });
        addr
    }

    /// Pushes a fresh frame with one object per `sizes` (§4.M
    /// `push_stack_frame`), returning each object's base address in order.
    pub fn push_stack_frame(&mut self, sizes: &[u64]) -> Vec<u64> {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        let mut addr = STACK_BEGIN;
        for frame in &self.frames {
            addr = addr.max(frame.next_address);
        }
        let mut addresses = Vec::with_capacity(sizes.len());
        let mut objects = Vec::with_capacity(sizes.len());
        for &size in sizes {
            addresses.push(addr);
            objects.push(StackObject::new(addr, size, false));
            addr += size.max(1);
        }
        self.frames.push(StackFrame { id, objects, next_address: addr });
        addresses
    }

    /// Pops the most recent frame, ending every object's lifetime (§4.M
    /// `pop_stack_frame`).
    pub fn pop_stack_frame(&mut self) {
        self.frames.pop();
    }

    #[must_use]
    pub fn current_frame_ids(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.id).collect()
    }

    fn find_stack_object(&self, addr: u64) -> Option<&StackObject> {
        self.frames.iter().flat_map(|f| &f.objects).find(|o| o.storage.contains(addr))
    }

    fn find_stack_object_mut(&mut self, addr: u64) -> Option<&mut StackObject> {
        self.frames.iter_mut().flat_map(|f| &mut f.objects).find(|o| o.storage.contains(addr))
    }

    fn find_global(&self, addr: u64) -> Option<&GlobalObject> {
        self.globals.iter().find(|g| g.storage.contains(addr))
    }

    fn find_heap(&self, addr: u64) -> Option<&(HeapObject, bool)> {
        self.heap.iter().find(|(h, _)| h.storage.contains(addr))
    }

    /// `allocate` (§4.M `heap_manager::allocate`).
    pub fn heap_allocate(&mut self, elem_size: u64, count: u64) -> u64 {
        let addr = self.heap_next;
        self.heap_next += (elem_size * count).max(1);
        self.heap.push((HeapObject::new(addr, elem_size, count), false));
        addr
    }

    /// `free` (§4.M "Heap `free`": the allocation is never erased, so a
    /// double-free is still detectable).
    pub fn heap_free(&mut self, addr: u64) -> FreeResult {
        match self.heap.iter_mut().find(|(h, _)| h.storage.address == addr) {
            Some((_, freed)) if *freed => FreeResult::DoubleFree,
            Some((_, freed)) => {
                *freed = true;
                FreeResult::Good
            }
            None => match self.find_heap(addr) {
                Some(_) => FreeResult::AddressInsideObject,
                None => FreeResult::UnknownAddress,
            },
        }
    }

    #[must_use]
    pub fn is_freed(&self, addr: u64) -> Option<bool> {
        self.find_heap(addr).map(|(_, freed)| *freed)
    }

    #[must_use]
    pub fn check_dereference(&self, addr: u64, size: u64) -> bool {
        match segment_of(addr) {
            Segment::Global => self.find_global(addr).is_some_and(|g| g.storage.check_dereference(addr, size)),
            Segment::Stack => self
                .find_stack_object(addr)
                .is_some_and(|o| o.storage.check_dereference(addr, size) && o.is_alive(addr, addr + size)),
            Segment::Heap => self.find_heap(addr).is_some_and(|(h, freed)| !freed && h.storage.check_dereference(addr, size) && h.lifetime.is_all(0, h.storage.size as usize)),
            Segment::Meta | Segment::Invalid => false,
        }
    }

    pub fn read(&self, addr: u64, size: u64) -> Option<Vec<u8>> {
        if !self.check_dereference(addr, size) {
            return None;
        }
        match segment_of(addr) {
            Segment::Global => self.find_global(addr).and_then(|g| g.storage.read(addr, size)).map(<[u8]>::to_vec),
            Segment::Stack => self.find_stack_object(addr).and_then(|o| o.storage.read(addr, size)).map(<[u8]>::to_vec),
            Segment::Heap => self.find_heap(addr).and_then(|(h, _)| h.storage.read(addr, size)).map(<[u8]>::to_vec),
            Segment::Meta | Segment::Invalid => None,
        }
    }

    pub fn write(&mut self, addr: u64, bytes: &[u8]) -> bool {
        if !self.check_dereference(addr, bytes.len() as u64) {
            return false;
        }
        match segment_of(addr) {
            Segment::Stack => self.find_stack_object_mut(addr).and_then(|o| o.storage.write(addr, bytes)).is_some(),
            Segment::Heap => self
                .heap
                .iter_mut()
                .find(|(h, _)| h.storage.contains(addr))
                .and_then(|(h, _)| h.storage.write(addr, bytes))
                .is_some(),
            _ => false,
        }
    }

    pub fn start_lifetime(&mut self, addr: u64, size: u64) {
        if let Some(o) = self.find_stack_object_mut(addr) {
            o.start_lifetime(addr, addr + size);
        }
    }

    pub fn end_lifetime(&mut self, addr: u64, size: u64) {
        if let Some(o) = self.find_stack_object_mut(addr) {
            o.end_lifetime(addr, addr + size);
        }
    }

    /// `do_pointer_arithmetic` (§4.M): dispatches to whichever segment owns
    /// `addr`, failing if it leaves the object (one-past-the-end excepted).
    #[must_use]
    pub fn do_pointer_arithmetic(&self, addr: u64, amount: i64, elem_size: u64) -> Option<PointerArithmeticResult> {
        match segment_of(addr) {
            Segment::Global => self.find_global(addr)?.storage.do_pointer_arithmetic(addr, amount, elem_size),
            Segment::Stack => self.find_stack_object(addr)?.storage.do_pointer_arithmetic(addr, amount, elem_size),
            Segment::Heap => self.find_heap(addr).map(|(h, _)| h)?.storage.do_pointer_arithmetic(addr, amount, elem_size),
            Segment::Meta | Segment::Invalid => None,
        }
    }

    /// `do_pointer_difference` (§4.M): defined only when `lhs`/`rhs` share
    /// provenance, i.e. resolve to the same backing object.
    #[must_use]
    pub fn do_pointer_difference(&self, lhs: u64, rhs: u64, elem_size: u64) -> Option<i64> {
        let seg = segment_of(lhs);
        if seg != segment_of(rhs) {
            return None;
        }
        match seg {
            Segment::Global => {
                let g = self.find_global(lhs)?;
                if !g.storage.contains(rhs) {
                    return None;
                }
                g.storage.do_pointer_difference(lhs, rhs, elem_size)
            }
            Segment::Stack => {
                let o = self.find_stack_object(lhs)?;
                if !o.storage.contains(rhs) {
                    return None;
                }
                o.storage.do_pointer_difference(lhs, rhs, elem_size)
            }
            Segment::Heap => {
                let (h, _) = self.find_heap(lhs)?;
                if !h.storage.contains(rhs) {
                    return None;
                }
                h.storage.do_pointer_difference(lhs, rhs, elem_size)
            }
            Segment::Meta | Segment::Invalid => None,
        }
    }

    /// `compare_pointers` (§4.M): ordering for same-provenance pointers,
    /// `None` across objects.
    #[must_use]
    pub fn compare_pointers(&self, lhs: u64, rhs: u64) -> Option<std::cmp::Ordering> {
        self.do_pointer_difference(lhs, rhs, 1).map(|d| d.cmp(&0))
    }

    #[must_use]
    pub fn target(&self) -> TargetProperties {
        self.target
    }

    pub fn rewrite_escaping_pointer(&mut self, addr: u64, frame_id: u32) -> u64 {
        self.meta.make_dangling(addr, frame_id)
    }

    #[must_use]
    pub fn is_valid_meta_address(&self, addr: u64) -> bool {
        self.meta.is_valid(addr, &self.current_frame_ids())
    }
}

#[must_use]
pub fn bool_type_name() -> crate::symbol::Symbol {
    intern("bool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_classification_is_a_single_range_check() {
        assert_eq!(segment_of(GLOBAL_BEGIN), Segment::Global);
        assert_eq!(segment_of(STACK_BEGIN), Segment::Stack);
        assert_eq!(segment_of(HEAP_BEGIN), Segment::Heap);
        assert_eq!(segment_of(META_BEGIN), Segment::Meta);
        assert_eq!(segment_of(0), Segment::Invalid);
    }

    #[test]
    fn stack_frame_objects_get_disjoint_addresses() {
        let mut mm = MemoryManager::new(TargetProperties::host());
        let addrs = mm.push_stack_frame(&[4, 8]);
        assert_eq!(addrs.len(), 2);
        assert!(addrs[1] >= addrs[0] + 4);
    }

    #[test]
    fn double_free_is_detected_without_erasing_the_allocation() {
        let mut mm = MemoryManager::new(TargetProperties::host());
        let addr = mm.heap_allocate(4, 1);
        assert_eq!(mm.heap_free(addr), FreeResult::Good);
        assert_eq!(mm.heap_free(addr), FreeResult::DoubleFree);
        assert_eq!(mm.is_freed(addr), Some(true));
    }

    #[test]
    fn cross_provenance_difference_is_rejected() {
        let mut mm = MemoryManager::new(TargetProperties::host());
        let a = mm.heap_allocate(4, 4);
        let b = mm.heap_allocate(4, 4);
        assert_eq!(mm.do_pointer_difference(a, a + 8, 4), Some(-2));
        assert_eq!(mm.do_pointer_difference(a, b, 4), None);
    }

    #[test]
    fn stack_read_before_lifetime_start_fails() {
        let mut mm = MemoryManager::new(TargetProperties::host());
        let addrs = mm.push_stack_frame(&[4]);
        assert!(mm.read(addrs[0], 4).is_none());
        mm.start_lifetime(addrs[0], 4);
        assert!(mm.write(addrs[0], &[1, 2, 3, 4]));
        assert_eq!(mm.read(addrs[0], 4), Some(vec![1, 2, 3, 4]));
    }
}
