//! Chained 8259 interrupt controllers.
//!
//! Remapped above the CPU exception range and masked so that only the
//! keyboard line reaches the processor.

use pic8259::ChainedPics;

use crate::constants::interrupts::{KEYBOARD_IRQ, PIC_1_OFFSET, PIC_2_OFFSET};

/// Vector offsets and line masks for the master/slave pair.
///
/// A set mask bit disables the corresponding line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub master_offset: u8,
    pub slave_offset: u8,
    pub master_mask: u8,
    pub slave_mask: u8,
}

impl ControllerConfig {
    /// Master lines 0..8 at vectors 32..40, slave lines at 40..48, every line
    /// masked except the keyboard.
    pub const fn keyboard_only() -> Self {
        ControllerConfig {
            master_offset: PIC_1_OFFSET,
            slave_offset: PIC_2_OFFSET,
            master_mask: !(1 << KEYBOARD_IRQ),
            slave_mask: 0xFF,
        }
    }

    /// Vector raised by controller line `irq` (0..16).
    pub const fn vector_for(&self, irq: u8) -> u8 {
        if irq < 8 {
            self.master_offset + irq
        } else {
            self.slave_offset + (irq - 8)
        }
    }

    pub const fn is_unmasked(&self, irq: u8) -> bool {
        if irq < 8 {
            self.master_mask & (1 << irq) == 0
        } else {
            self.slave_mask & (1 << (irq - 8)) == 0
        }
    }

    /// Controller line behind `vector`, if either chip raises it.
    pub const fn line_for(&self, vector: u8) -> Option<u8> {
        if vector >= self.master_offset && vector < self.master_offset + 8 {
            Some(vector - self.master_offset)
        } else if vector >= self.slave_offset && vector < self.slave_offset + 8 {
            Some(vector - self.slave_offset + 8)
        } else {
            None
        }
    }

    /// Whether `vector` belongs to one of the two controllers.
    pub const fn handles(&self, vector: u8) -> bool {
        self.line_for(vector).is_some()
    }
}

/// Programming and acknowledgment of the interrupt controller.
pub trait InterruptController {
    fn config(&self) -> &ControllerConfig;

    /// Initialization words, cascade wiring, 8086 mode, then the line masks.
    /// Runs once, after the gate table is loaded.
    fn program(&mut self);

    /// Acknowledge the interrupt at `vector`. Until this is sent the line
    /// will not fire again.
    fn end_of_interrupt(&mut self, vector: u8);
}

/// The PC's cascaded 8259 pair.
pub struct Pics {
    chain: ChainedPics,
    config: ControllerConfig,
}

impl Pics {
    /// # Safety
    ///
    /// There must be exactly one `Pics` driving the hardware controllers.
    pub const unsafe fn new(config: ControllerConfig) -> Self {
        Pics {
            chain: ChainedPics::new(config.master_offset, config.slave_offset),
            config,
        }
    }
}

impl InterruptController for Pics {
    fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn program(&mut self) {
        unsafe {
            self.chain.initialize();
            self.chain
                .write_masks(self.config.master_mask, self.config.slave_mask);
        }
        log::info!(
            "interrupt controller remapped to {}/{}, masks {:#04x}/{:#04x}",
            self.config.master_offset,
            self.config.slave_offset,
            self.config.master_mask,
            self.config.slave_mask
        );
    }

    fn end_of_interrupt(&mut self, vector: u8) {
        unsafe { self.chain.notify_end_of_interrupt(vector) };
    }
}
