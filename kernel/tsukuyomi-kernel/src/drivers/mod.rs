//! Device drivers: serial, PS/2 keyboard, interrupt controllers, ATA PIO,
//! and the framebuffer console.

pub mod ata;
pub mod fbcon;
pub mod i8042;
pub mod ioapic;
pub mod lapic;
pub mod uart16550;
