use bg_vm_types::{
    common::MemAddress,
    constants::{region_slot_base, CONTEXT_BASE, STACK_BASE},
    exit_reason::FaultReason,
};

/// Read/write permission flags of one memory region, independently settable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
}

impl Permissions {
    pub const READ_WRITE: Permissions = Permissions {
        read: true,
        write: true,
    };
    pub const READ_ONLY: Permissions = Permissions {
        read: true,
        write: false,
    };
}

/// One contiguous block of caller memory the sandboxed program may touch.
///
/// The borrow bounds the region to a single request; the engine never retains
/// it past one run.
#[derive(Debug)]
pub struct MemoryRegion<'req> {
    bytes: &'req mut [u8],
    perms: Permissions,
}

impl<'req> MemoryRegion<'req> {
    pub fn read_write(bytes: &'req mut [u8]) -> Self {
        Self {
            bytes,
            perms: Permissions::READ_WRITE,
        }
    }

    pub fn read_only(bytes: &'req mut [u8]) -> Self {
        Self {
            bytes,
            perms: Permissions::READ_ONLY,
        }
    }

    pub fn with_permissions(bytes: &'req mut [u8], perms: Permissions) -> Self {
        Self { bytes, perms }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn permissions(&self) -> Permissions {
        self.perms
    }
}

/// The ordered set of caller-supplied regions for one execution. Region
/// slot `i` is mapped into the sandbox at [`region_slot_base`]`(i)`; slot
/// order is part of the calling convention and must not be reordered.
#[derive(Debug, Default)]
pub struct RegionTable<'req> {
    regions: Vec<MemoryRegion<'req>>,
}

impl<'req> RegionTable<'req> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a region and returns its slot number.
    pub fn push(&mut self, region: MemoryRegion<'req>) -> usize {
        self.regions.push(region);
        self.regions.len() - 1
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&MemoryRegion<'req>> {
        self.regions.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryRegion<'req>> {
        self.regions.iter()
    }
}

/// Access width of a single load or store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    B,
    H,
    W,
    D,
}

impl Width {
    pub fn bytes(&self) -> usize {
        match self {
            Width::B => 1,
            Width::H => 2,
            Width::W => 4,
            Width::D => 8,
        }
    }
}

enum Segment {
    Stack,
    Context,
    Region(usize),
}

/// The complete address-space view of one run: the engine-owned stack, the
/// read-only caller context copy, and the numbered caller regions. Every
/// load and store resolves through here; anything outside faults.
pub struct SandboxMemory<'m, 'req> {
    stack: &'m mut [u8],
    context: &'m [u8],
    regions: &'m mut RegionTable<'req>,
}

impl<'m, 'req> SandboxMemory<'m, 'req> {
    pub fn new(
        stack: &'m mut [u8],
        context: &'m [u8],
        regions: &'m mut RegionTable<'req>,
    ) -> Self {
        Self {
            stack,
            context,
            regions,
        }
    }

    fn resolve(
        &self,
        address: MemAddress,
        len: usize,
        write: bool,
    ) -> Result<(Segment, usize), FaultReason> {
        let fault = FaultReason::AccessViolation { address, write };

        let in_window = |base: MemAddress, size: usize| -> Option<usize> {
            let offset = address.checked_sub(base)? as usize;
            (offset.checked_add(len)? <= size).then_some(offset)
        };

        if let Some(offset) = in_window(STACK_BASE, self.stack.len()) {
            return Ok((Segment::Stack, offset));
        }
        if let Some(offset) = in_window(CONTEXT_BASE, self.context.len()) {
            if write {
                return Err(fault);
            }
            return Ok((Segment::Context, offset));
        }
        for (slot, region) in self.regions.iter().enumerate() {
            if let Some(offset) = in_window(region_slot_base(slot), region.len()) {
                let perms = region.permissions();
                let allowed = if write { perms.write } else { perms.read };
                if !allowed {
                    return Err(fault);
                }
                return Ok((Segment::Region(slot), offset));
            }
        }
        Err(fault)
    }

    pub fn load(&self, address: MemAddress, width: Width) -> Result<u64, FaultReason> {
        let len = width.bytes();
        let (segment, offset) = self.resolve(address, len, false)?;
        let bytes = match segment {
            Segment::Stack => &self.stack[offset..offset + len],
            Segment::Context => &self.context[offset..offset + len],
            Segment::Region(slot) => &self.regions.regions[slot].bytes[offset..offset + len],
        };
        let value = match width {
            Width::B => bytes[0] as u64,
            Width::H => u16::from_le_bytes(bytes.try_into().unwrap()) as u64,
            Width::W => u32::from_le_bytes(bytes.try_into().unwrap()) as u64,
            Width::D => u64::from_le_bytes(bytes.try_into().unwrap()),
        };
        Ok(value)
    }

    pub fn store(&mut self, address: MemAddress, width: Width, value: u64) -> Result<(), FaultReason> {
        let len = width.bytes();
        let (segment, offset) = self.resolve(address, len, true)?;
        let bytes = match segment {
            Segment::Stack => &mut self.stack[offset..offset + len],
            // resolve rejects context writes
            Segment::Context => unreachable!("context window is read-only"),
            Segment::Region(slot) => {
                &mut self.regions.regions[slot].bytes[offset..offset + len]
            }
        };
        match width {
            Width::B => bytes[0] = value as u8,
            Width::H => bytes.copy_from_slice(&(value as u16).to_le_bytes()),
            Width::W => bytes.copy_from_slice(&(value as u32).to_le_bytes()),
            Width::D => bytes.copy_from_slice(&value.to_le_bytes()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_vm_types::constants::STACK_SIZE;

    fn empty_table() -> RegionTable<'static> {
        RegionTable::new()
    }

    #[test]
    fn stack_window_is_readable_and_writable() {
        let mut stack = [0u8; STACK_SIZE];
        let mut regions = empty_table();
        let mut mem = SandboxMemory::new(&mut stack, &[], &mut regions);
        mem.store(STACK_BASE, Width::D, 0xdead_beef).unwrap();
        assert_eq!(mem.load(STACK_BASE, Width::D).unwrap(), 0xdead_beef);
    }

    #[test]
    fn context_window_rejects_writes() {
        let mut stack = [0u8; STACK_SIZE];
        let context = [7u8; 16];
        let mut regions = empty_table();
        let mut mem = SandboxMemory::new(&mut stack, &context, &mut regions);
        assert_eq!(mem.load(CONTEXT_BASE, Width::B).unwrap(), 7);
        assert_eq!(
            mem.store(CONTEXT_BASE, Width::B, 1),
            Err(FaultReason::AccessViolation {
                address: CONTEXT_BASE,
                write: true
            })
        );
    }

    #[test]
    fn region_permissions_are_enforced() {
        let mut stack = [0u8; STACK_SIZE];
        let mut backing = [0u8; 32];
        let mut regions = RegionTable::new();
        let slot = regions.push(MemoryRegion::read_only(&mut backing));
        let base = region_slot_base(slot);
        let mut mem = SandboxMemory::new(&mut stack, &[], &mut regions);
        assert!(mem.load(base, Width::W).is_ok());
        assert!(mem.store(base, Width::W, 1).is_err());
    }

    #[test]
    fn access_beyond_region_end_faults() {
        let mut stack = [0u8; STACK_SIZE];
        let mut backing = [0u8; 8];
        let mut regions = RegionTable::new();
        let slot = regions.push(MemoryRegion::read_write(&mut backing));
        let base = region_slot_base(slot);
        let mut mem = SandboxMemory::new(&mut stack, &[], &mut regions);
        // last in-bounds octet
        assert!(mem.load(base + 7, Width::B).is_ok());
        // one past the end, and a wide access straddling the boundary
        assert!(mem.load(base + 8, Width::B).is_err());
        assert!(mem.load(base + 4, Width::D).is_err());
    }

    #[test]
    fn unmapped_address_faults() {
        let mut stack = [0u8; STACK_SIZE];
        let mut regions = empty_table();
        let mem = SandboxMemory::new(&mut stack, &[], &mut regions);
        assert_eq!(
            mem.load(0x0000_1000, Width::W),
            Err(FaultReason::AccessViolation {
                address: 0x0000_1000,
                write: false
            })
        );
    }
}
