/// Local-APIC IPI backend.
///
/// Programs the interrupt command register pair of the xAPIC in MMIO
/// mode: destination in the high dword, command in the low dword. The
/// low-dword write is what triggers delivery. The surface runs with
/// logical CPU ids mapping directly onto physical APIC ids.

use core::ptr;

use bitflags::bitflags;
use spin::Once;
use x86_64::registers::model_specific::Msr;

use super::ipi::{DeliveryMode, IpiSender};
use crate::cpu::CpuId;

const IA32_APIC_BASE: u32 = 0x1B;
const APIC_BASE_ADDR_MASK: u64 = 0xFFFF_F000;

const ICR_LOW: usize = 0x300;
const ICR_HIGH: usize = 0x310;
const ICR_DEST_SHIFT: u32 = 24;

bitflags! {
    /// Low-dword fields of the interrupt command register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IcrFlags: u32 {
        const DELIVERY_SMI = 0b010 << 8;
        const DELIVERY_NMI = 0b100 << 8;
        const LEVEL_ASSERT = 1 << 14;
    }
}

/// Command word for one delivery mode. Fixed mode carries its vector in
/// the low byte; SMI and NMI leave it zero.
fn icr_command(mode: DeliveryMode) -> u32 {
    match mode {
        DeliveryMode::Fixed(vector) => IcrFlags::LEVEL_ASSERT.bits() | vector as u32,
        DeliveryMode::Smi => (IcrFlags::DELIVERY_SMI | IcrFlags::LEVEL_ASSERT).bits(),
        DeliveryMode::Nmi => (IcrFlags::DELIVERY_NMI | IcrFlags::LEVEL_ASSERT).bits(),
    }
}

/// IPI sender backed by the boot CPU's memory-mapped local APIC.
pub struct ApicIpi {
    base: Once<u64>,
}

impl ApicIpi {
    pub const fn new() -> Self {
        ApicIpi { base: Once::new() }
    }

    fn lapic_base(&self) -> u64 {
        *self
            .base
            .call_once(|| unsafe { Msr::new(IA32_APIC_BASE).read() } & APIC_BASE_ADDR_MASK)
    }

    unsafe fn write_reg(&self, offset: usize, value: u32) {
        let reg = (self.lapic_base() as usize + offset) as *mut u32;
        ptr::write_volatile(reg, value);
    }
}

impl Default for ApicIpi {
    fn default() -> Self {
        Self::new()
    }
}

impl IpiSender for ApicIpi {
    fn send(&self, cpu: CpuId, mode: DeliveryMode) {
        // Destination must be programmed before the low-dword write that
        // dispatches the command.
        unsafe {
            self.write_reg(ICR_HIGH, cpu << ICR_DEST_SHIFT);
            self.write_reg(ICR_LOW, icr_command(mode));
        }
    }
}
