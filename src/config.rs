//! Target properties the driver hands the core before compiling (§6 "To the
//! driver": `set_target_properties`). The memory manager's segment
//! addressing and integer-literal typing both depend on these.

/// Byte order for `constant_value_from_object` / `object_from_constant_value`
/// (§4.M): when the host and target disagree, conversions byteswap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    #[must_use]
    pub fn host() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    #[must_use]
    pub fn matches_host(self) -> bool {
        self == Endianness::host()
    }
}

/// Properties of the compilation target (§6 `set_target_properties`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetProperties {
    pub pointer_size: u32,
    pub endianness: Endianness,
}

impl TargetProperties {
    #[must_use]
    pub fn host() -> Self {
        TargetProperties { pointer_size: std::mem::size_of::<usize>() as u32, endianness: Endianness::host() }
    }
}

impl Default for TargetProperties {
    fn default() -> Self {
        TargetProperties::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_endianness_matches_itself() {
        assert!(Endianness::host().matches_host());
    }
}
