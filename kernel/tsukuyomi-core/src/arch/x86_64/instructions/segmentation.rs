//! Segment register manipulation.

use crate::arch::x86_64::structures::gdt::SegmentSelector;

/// Reloads the code segment register (CS) using a far return.
///
/// # Safety
///
/// The selector must reference a valid long-mode code segment descriptor.
#[inline]
pub unsafe fn set_cs(selector: SegmentSelector) {
    #[cfg(target_os = "none")]
    unsafe {
        core::arch::asm!(
            "push {sel}",
            "lea {tmp}, [rip + 2f]",
            "push {tmp}",
            "retfq",
            "2:",
            sel = in(reg) u64::from(selector.as_u16()),
            tmp = lateout(reg) _,
            options(preserves_flags),
        );
    }
    #[cfg(not(target_os = "none"))]
    {
        let _ = selector;
    }
}

macro_rules! segment_load_fn {
    ($(#[$doc:meta])* $name:ident, $reg:literal) => {
        $(#[$doc])*
        ///
        /// # Safety
        ///
        /// The selector must reference a valid data segment descriptor (or
        /// be the null selector).
        #[inline]
        pub unsafe fn $name(selector: SegmentSelector) {
            #[cfg(target_os = "none")]
            unsafe {
                core::arch::asm!(
                    concat!("mov ", $reg, ", {:x}"),
                    in(reg) selector.as_u16(),
                    options(nostack, preserves_flags),
                );
            }
            #[cfg(not(target_os = "none"))]
            {
                let _ = selector;
            }
        }
    };
}

segment_load_fn!(
    /// Loads the data segment register (DS).
    load_ds,
    "ds"
);
segment_load_fn!(
    /// Loads the extra segment register (ES).
    load_es,
    "es"
);
segment_load_fn!(
    /// Loads the stack segment register (SS).
    load_ss,
    "ss"
);
segment_load_fn!(
    /// Loads the FS segment register.
    load_fs,
    "fs"
);
segment_load_fn!(
    /// Loads the GS segment register.
    load_gs,
    "gs"
);
