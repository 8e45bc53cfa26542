//! Limine protocol requests.
//!
//! All requests live in one `#[repr(C)]` struct inside the `.requests`
//! section, bracketed by the start/end markers so the bootloader can
//! find them quickly.

use limine::{
    BaseRevision, FramebufferRequest, HhdmRequest, MemMapRequest, ModuleRequest,
    RequestsEndMarker, RequestsStartMarker, RsdpRequest,
};

/// The kernel's request block.
#[repr(C, align(8))]
pub struct LimineRequests {
    _start_marker: RequestsStartMarker,
    /// Protocol base revision handshake.
    pub base_revision: BaseRevision,
    /// Higher-half direct map offset.
    pub hhdm: HhdmRequest,
    /// Physical memory map.
    pub memmap: MemMapRequest,
    /// ACPI RSDP address.
    pub rsdp: RsdpRequest,
    /// Pre-loaded modules.
    pub modules: ModuleRequest,
    /// Linear framebuffers.
    pub framebuffer: FramebufferRequest,
    _end_marker: RequestsEndMarker,
}

impl LimineRequests {
    const fn new() -> Self {
        Self {
            _start_marker: RequestsStartMarker::new(),
            base_revision: BaseRevision::new(),
            hhdm: HhdmRequest::new(),
            memmap: MemMapRequest::new(),
            rsdp: RsdpRequest::new(),
            modules: ModuleRequest::new(),
            framebuffer: FramebufferRequest::new(),
            _end_marker: RequestsEndMarker::new(),
        }
    }
}

/// The request block, read by the bootloader before the kernel runs.
#[used]
#[unsafe(link_section = ".requests")]
pub static REQUESTS: LimineRequests = LimineRequests::new();
