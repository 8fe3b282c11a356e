//! Per-CPU SMI control surface.
//!
//! Exposes one addressable endpoint per online CPU through which a
//! privileged caller can trigger a System Management Interrupt on that
//! CPU, or on the CPU the caller is presently executing on. Endpoint
//! lifetime tracks CPU hotplug exactly.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch;
pub mod control;
pub mod cpu;
pub mod dev;
pub mod error;
pub mod hotplug;

pub use control::SmiControl;
pub use error::{SmiError, SmiResult};

#[cfg(not(test))]
use core::panic::PanicInfo;

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    loop {}
}
