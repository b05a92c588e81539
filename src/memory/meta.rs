//! Meta addresses (§4.M "'Meta' addresses are synthetic"): when a pointer
//! into a stack frame would outlive that frame, the manager rewrites it to a
//! synthetic address in the meta segment that remembers the frame it came
//! from, so later dereferences can report a precise dangling-use error
//! instead of reading whatever now occupies that stack slot.

/// A meta address standing in for a stack pointer that escaped its frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackObjectPointer {
    pub stack_address: u64,
    pub frame_id: u32,
}

/// A meta address standing in for a one-past-the-end pointer, kept separate
/// from ordinary object addresses so it never aliases a real byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OnePastTheEnd {
    pub address: u64,
}

#[derive(Clone, Debug, Default)]
pub struct MetaMemoryManager {
    begin: u64,
    next: u64,
    stack_pointers: Vec<StackObjectPointer>,
    one_past_the_end: Vec<OnePastTheEnd>,
}

impl MetaMemoryManager {
    #[must_use]
    pub fn new(begin: u64) -> Self {
        MetaMemoryManager { begin, next: begin, stack_pointers: Vec::new(), one_past_the_end: Vec::new() }
    }

    /// Rewrites `stack_address` (in `frame_id`) to a fresh meta address,
    /// returning the synthetic pointer a pop-surviving reference should
    /// carry instead.
    pub fn make_dangling(&mut self, stack_address: u64, frame_id: u32) -> u64 {
        let addr = self.next;
        self.next += 1;
        self.stack_pointers.push(StackObjectPointer { stack_address, frame_id });
        addr
    }

    pub fn make_one_past_the_end_address(&mut self, real_address: u64) -> u64 {
        let addr = self.next;
        self.next += 1;
        self.one_past_the_end.push(OnePastTheEnd { address: real_address });
        addr
    }

    #[must_use]
    pub fn is_meta_address(&self, addr: u64) -> bool {
        addr >= self.begin
    }

    /// Whether `addr` still refers to a frame present in
    /// `live_frame_ids` (§4.M `is_valid`): a meta address for a frame that
    /// has since popped is a dangling-use.
    #[must_use]
    pub fn is_valid(&self, addr: u64, live_frame_ids: &[u32]) -> bool {
        self.stack_pointers
            .iter()
            .enumerate()
            .find(|(i, _)| self.begin + *i as u64 == addr)
            .map(|(_, p)| live_frame_ids.contains(&p.frame_id))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_pointer_is_invalid_once_frame_pops() {
        let mut meta = MetaMemoryManager::new(0x9000);
        let addr = meta.make_dangling(0x4000, 7);
        assert!(meta.is_valid(addr, &[7]));
        assert!(!meta.is_valid(addr, &[8]));
    }
}
