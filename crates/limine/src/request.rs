//! Request structures for the Limine boot protocol.
//!
//! Each request carries a unique 4-part magic ID that the bootloader scans
//! for in the `.requests` section, a revision, and a response pointer slot
//! the bootloader fills in before handing over control.

use core::cell::UnsafeCell;

use crate::response::{
    FramebufferResponse, HhdmResponse, MemMapResponse, ModuleResponse, Response, RsdpResponse,
};

/// Builds a Limine request ID from the common magic plus two request-specific
/// words.
macro_rules! limine_id {
    ($part1:expr, $part2:expr) => {
        [
            0xc7b1_dd30_df4c_8b88u64,
            0x0a82_e883_a194_f07bu64,
            $part1,
            $part2,
        ]
    };
}

/// Marker placed at the start of the request block.
///
/// Lets the bootloader narrow its scan for requests. If a start marker is
/// used, an end marker must also be present.
#[repr(C, align(8))]
pub struct RequestsStartMarker([u64; 4]);

impl RequestsStartMarker {
    /// The Limine ID for the requests start marker.
    pub const ID: [u64; 4] = [
        0xf6b8_f4b3_9de7_d1ae,
        0xfab9_1a69_40fc_b9cf,
        0x785c_6ed0_15d3_e316,
        0x181e_920a_7852_b9d9,
    ];

    /// Creates a new `RequestsStartMarker`.
    #[must_use]
    pub const fn new() -> Self {
        Self(Self::ID)
    }
}

impl Default for RequestsStartMarker {
    fn default() -> Self {
        Self::new()
    }
}

/// Marker placed at the end of the request block.
#[repr(C, align(8))]
pub struct RequestsEndMarker([u64; 2]);

impl RequestsEndMarker {
    /// The Limine ID for the requests end marker.
    pub const ID: [u64; 2] = [0xadc0_e053_1bb1_0d03, 0x9572_709f_3176_4c62];

    /// Creates a new `RequestsEndMarker`.
    #[must_use]
    pub const fn new() -> Self {
        Self(Self::ID)
    }
}

impl Default for RequestsEndMarker {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares which protocol base revision the kernel targets.
///
/// The bootloader overwrites the revision word with zero when the requested
/// revision is supported.
#[repr(C, align(8))]
pub struct BaseRevision(UnsafeCell<[u64; 3]>);

impl BaseRevision {
    /// The Limine ID for the base revision tag.
    pub const ID: [u64; 2] = [0xf956_2b2d_5c95_a6c8, 0x6a7b_3849_4453_6bdc];

    /// Creates a new `BaseRevision` requesting revision 3.
    #[must_use]
    pub const fn new() -> Self {
        Self(UnsafeCell::new([Self::ID[0], Self::ID[1], 3]))
    }

    /// Returns `true` if the bootloader acknowledged the requested revision.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        // SAFETY: The bootloader writes this cell before the kernel runs;
        // afterwards it is only ever read.
        unsafe { (*self.0.get())[2] == 0 }
    }
}

// SAFETY: Written only by the bootloader before the kernel starts, read-only
// afterwards.
unsafe impl Sync for BaseRevision {}

/// Generates a request struct with the standard id/revision/response layout.
macro_rules! request_struct {
    (
        $(#[$doc:meta])*
        $name:ident, $response:ty, $id1:expr, $id2:expr
    ) => {
        $(#[$doc])*
        #[repr(C, align(8))]
        pub struct $name {
            id: [u64; 4],
            revision: u64,
            response: Response<$response>,
        }

        impl $name {
            /// The Limine ID for this request.
            pub const ID: [u64; 4] = limine_id!($id1, $id2);

            /// Creates a new request with revision 0.
            #[must_use]
            pub const fn new() -> Self {
                Self {
                    id: Self::ID,
                    revision: 0,
                    response: Response::empty(),
                }
            }

            /// Returns the bootloader-provided response, if available.
            #[must_use]
            pub fn response(&self) -> Option<&$response> {
                self.response.get()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        // SAFETY: The response slot is written only by the bootloader before
        // the kernel starts and is read-only afterwards.
        unsafe impl Sync for $name {}
    };
}

request_struct!(
    /// Requests the higher-half direct map offset.
    HhdmRequest,
    HhdmResponse,
    0x48dc_f1cb_8ad2_b852,
    0x6398_4e95_9a98_244b
);

request_struct!(
    /// Requests the physical memory map.
    MemMapRequest,
    MemMapResponse,
    0x67cf_3d9d_378a_806f,
    0xe304_acdf_c50c_3c62
);

request_struct!(
    /// Requests the physical address of the ACPI RSDP.
    RsdpRequest,
    RsdpResponse,
    0xc5e7_7b6b_397e_7b43,
    0x2763_7845_accd_cf3c
);

request_struct!(
    /// Requests the list of pre-loaded module files.
    ModuleRequest,
    ModuleResponse,
    0x3e7e_2797_02be_32af,
    0xca1c_4f3b_d128_0cee
);

request_struct!(
    /// Requests the list of linear framebuffers.
    FramebufferRequest,
    FramebufferResponse,
    0x9d58_27dc_d881_dd75,
    0xa314_8604_f6fa_b11b
);
