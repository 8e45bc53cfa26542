//! Global Descriptor Table and Task State Segment structures.
//!
//! The kernel uses a fixed 7-slot GDT per CPU: null, kernel code, kernel
//! data, user code, user data, and the two-slot 64-bit TSS descriptor.

use core::mem::size_of;

/// Bit positions and masks for x86_64 segment descriptors.
mod segment_bits {
    /// Shift converting a GDT index to a selector value (skips TI and RPL).
    pub const SELECTOR_INDEX_SHIFT: u16 = 3;
    /// Mask for the 2-bit requested privilege level field.
    pub const RPL_MASK: u16 = 0b11;
}

/// A segment selector value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SegmentSelector(u16);

impl SegmentSelector {
    /// Creates a selector for GDT entry `index` with privilege `rpl`.
    #[inline]
    #[must_use]
    pub const fn new(index: u16, rpl: u16) -> Self {
        Self((index << segment_bits::SELECTOR_INDEX_SHIFT) | (rpl & segment_bits::RPL_MASK))
    }

    /// The null selector.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Returns the raw `u16` value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the GDT index (bits 3..15).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0 >> segment_bits::SELECTOR_INDEX_SHIFT
    }

    /// Returns the requested privilege level (bits 0..1).
    #[inline]
    #[must_use]
    pub const fn rpl(self) -> u16 {
        self.0 & segment_bits::RPL_MASK
    }
}

/// A GDT descriptor entry.
#[derive(Debug, Clone, Copy)]
pub enum Descriptor {
    /// A 64-bit code/data segment (one slot).
    UserSegment(u64),
    /// A 128-bit system segment such as a TSS (two slots: low, high).
    SystemSegment(u64, u64),
}

impl Descriptor {
    /// TSS type nibble: 64-bit TSS (available).
    const TSS_TYPE_AVAILABLE_64: u64 = 0x9;
    /// Bit position of the present flag.
    const TSS_PRESENT_BIT: u64 = 47;

    /// Creates a null descriptor.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self::UserSegment(0)
    }

    /// 64-bit kernel code segment: L=1, P=1, DPL=0, execute/read.
    #[inline]
    #[must_use]
    pub const fn kernel_code_segment() -> Self {
        Self::UserSegment(0x00AF_9A00_0000_FFFF)
    }

    /// Kernel data segment: P=1, DPL=0, read/write.
    #[inline]
    #[must_use]
    pub const fn kernel_data_segment() -> Self {
        Self::UserSegment(0x00CF_9200_0000_FFFF)
    }

    /// 64-bit user code segment: L=1, P=1, DPL=3, execute/read.
    #[inline]
    #[must_use]
    pub const fn user_code_segment() -> Self {
        Self::UserSegment(0x00AF_FA00_0000_FFFF)
    }

    /// User data segment: P=1, DPL=3, read/write.
    #[inline]
    #[must_use]
    pub const fn user_data_segment() -> Self {
        Self::UserSegment(0x00CF_F200_0000_FFFF)
    }

    /// Creates a 128-bit TSS descriptor pair for the TSS at `tss`.
    ///
    /// The descriptor is created in the *available* state, so it can be
    /// loaded with `ltr` again after a previous load marked it busy.
    #[must_use]
    pub fn tss_segment(tss: &TaskStateSegment) -> Self {
        let tss_ptr = core::ptr::from_ref(tss) as u64;
        let limit = (size_of::<TaskStateSegment>() - 1) as u64;

        // Low 64 bits:
        //  bits  0..15: limit[0..15]
        //  bits 16..39: base[0..23]
        //  bits 40..43: type (0x9 = 64-bit TSS available)
        //  bits 45..46: DPL (0)
        //  bit      47: present
        //  bits 48..51: limit[16..19]
        //  bits 56..63: base[24..31]
        let low = (limit & 0xFFFF)
            | ((tss_ptr & 0xFF_FFFF) << 16)
            | (Self::TSS_TYPE_AVAILABLE_64 << 40)
            | (1 << Self::TSS_PRESENT_BIT)
            | ((limit & 0xF_0000) << 32)
            | ((tss_ptr & 0xFF00_0000) << 32);

        // High 64 bits: base[32..63].
        let high = (tss_ptr >> 32) & 0xFFFF_FFFF;

        Self::SystemSegment(low, high)
    }
}

/// Pointer to the GDT or IDT, the operand of `lgdt`/`lidt`.
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct DescriptorTablePointer {
    /// Size of the table in bytes, minus one.
    pub limit: u16,
    /// Linear base address of the table.
    pub base: u64,
}

/// Number of 64-bit GDT slots: null + kernel code + kernel data + user code
/// + user data + TSS low + TSS high.
pub const GDT_SLOTS: usize = 7;

/// A Global Descriptor Table with the kernel's fixed 7-slot layout.
#[repr(C, align(16))]
pub struct GlobalDescriptorTable {
    table: [u64; GDT_SLOTS],
    len: usize,
}

impl GlobalDescriptorTable {
    /// Creates an empty GDT containing only the null descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table: [0; GDT_SLOTS],
            len: 1,
        }
    }

    /// Appends a descriptor, returning its selector (RPL 0).
    ///
    /// # Panics
    ///
    /// Panics if the table is full.
    pub fn append(&mut self, descriptor: Descriptor) -> SegmentSelector {
        let index = self.len as u16;
        match descriptor {
            Descriptor::UserSegment(bits) => {
                assert!(self.len < GDT_SLOTS, "GDT full");
                self.table[self.len] = bits;
                self.len += 1;
            }
            Descriptor::SystemSegment(low, high) => {
                assert!(self.len + 2 <= GDT_SLOTS, "GDT full");
                self.table[self.len] = low;
                self.table[self.len + 1] = high;
                self.len += 2;
            }
        }
        SegmentSelector::new(index, 0)
    }

    /// Overwrites the two-slot system descriptor starting at `index`.
    ///
    /// Used to refresh the TSS descriptor (clearing the busy bit) before
    /// reloading the task register.
    pub fn set_system_descriptor(&mut self, index: u16, descriptor: Descriptor) {
        let Descriptor::SystemSegment(low, high) = descriptor else {
            panic!("set_system_descriptor: not a system segment");
        };
        let index = index as usize;
        assert!(index + 1 < GDT_SLOTS, "GDT system descriptor out of range");
        self.table[index] = low;
        self.table[index + 1] = high;
    }

    /// Returns the pointer structure describing this table for `lgdt`.
    #[must_use]
    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (GDT_SLOTS * size_of::<u64>() - 1) as u16,
            base: self.table.as_ptr() as u64,
        }
    }

    /// Loads this GDT into the CPU.
    ///
    /// # Safety
    ///
    /// The table must contain valid descriptors and must outlive its use by
    /// the CPU (i.e. live in a `static` or other stable storage).
    pub unsafe fn load(&self) {
        unsafe {
            crate::arch::x86_64::instructions::tables::lgdt(&self.pointer());
        }
    }
}

impl Default for GlobalDescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The 64-bit Task State Segment.
///
/// Only `rsp0` is meaningful to this kernel: the CPU loads it as the stack
/// pointer on every ring 3 to ring 0 transition.
#[derive(Debug, Clone, Copy)]
#[repr(C, packed(4))]
pub struct TaskStateSegment {
    _reserved1: u32,
    /// Stack pointers for rings 0-2 (`rsp0` is index 0).
    pub privilege_stack_table: [u64; 3],
    _reserved2: u64,
    /// Interrupt stack table (unused by this kernel).
    pub interrupt_stack_table: [u64; 7],
    _reserved3: u64,
    _reserved4: u16,
    /// Offset from the TSS base to the I/O permission bitmap.
    pub iomap_base: u16,
}

impl TaskStateSegment {
    /// Creates a TSS with all stack pointers zero and no I/O bitmap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _reserved1: 0,
            privilege_stack_table: [0; 3],
            _reserved2: 0,
            interrupt_stack_table: [0; 7],
            _reserved3: 0,
            _reserved4: 0,
            iomap_base: size_of::<TaskStateSegment>() as u16,
        }
    }
}

impl Default for TaskStateSegment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_encoding() {
        let sel = SegmentSelector::new(3, 3);
        assert_eq!(sel.as_u16(), 0x1B);
        assert_eq!(sel.index(), 3);
        assert_eq!(sel.rpl(), 3);
    }

    #[test]
    fn fixed_layout_selectors() {
        let mut gdt = GlobalDescriptorTable::new();
        let kcode = gdt.append(Descriptor::kernel_code_segment());
        let kdata = gdt.append(Descriptor::kernel_data_segment());
        let ucode = gdt.append(Descriptor::user_code_segment());
        let udata = gdt.append(Descriptor::user_data_segment());
        assert_eq!(kcode.as_u16(), 0x08);
        assert_eq!(kdata.as_u16(), 0x10);
        assert_eq!(ucode.index(), 3);
        assert_eq!(udata.index(), 4);
    }

    #[test]
    fn tss_descriptor_occupies_two_slots() {
        let tss = TaskStateSegment::new();
        let mut gdt = GlobalDescriptorTable::new();
        gdt.append(Descriptor::kernel_code_segment());
        gdt.append(Descriptor::kernel_data_segment());
        gdt.append(Descriptor::user_code_segment());
        gdt.append(Descriptor::user_data_segment());
        let tss_sel = gdt.append(Descriptor::tss_segment(&tss));
        assert_eq!(tss_sel.index(), 5);
        assert_eq!(gdt.len, 7);
    }

    #[test]
    fn tss_descriptor_base_round_trip() {
        let tss = TaskStateSegment::new();
        let tss_ptr = core::ptr::from_ref(&tss) as u64;
        let Descriptor::SystemSegment(low, high) = Descriptor::tss_segment(&tss) else {
            panic!("TSS must be a system segment");
        };
        let base = ((low >> 16) & 0xFF_FFFF) | (((low >> 56) & 0xFF) << 24) | (high << 32);
        assert_eq!(base, tss_ptr);
        // Present bit and available-TSS type.
        assert_eq!((low >> 47) & 1, 1);
        assert_eq!((low >> 40) & 0xF, 0x9);
    }

    #[test]
    fn tss_size_is_104_bytes() {
        assert_eq!(size_of::<TaskStateSegment>(), 104);
    }
}
