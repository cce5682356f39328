//! The 256-entry interrupt gate table.
//!
//! Built once at boot from a [`HandlerSet`], then loaded and never touched
//! again. Every vector gets a gate; vectors without a dedicated handler point
//! at a catch-all stub instead of being left non-present.

use x86_64::instructions::tables::lidt;
use x86_64::structures::DescriptorTablePointer;
use x86_64::VirtAddr;

use crate::constants::interrupts::{
    CONTROLLER_LINES, EXCEPTION_VECTORS, GATE_COUNT, INTERRUPT_GATE, KEYBOARD_IRQ,
};
use crate::pic::ControllerConfig;

const PRESENT: u8 = 0x80;

/// One 16-byte long-mode gate descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    ist: u8,
    flags: u8,
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

impl GateDescriptor {
    pub const fn missing() -> Self {
        GateDescriptor {
            offset_low: 0,
            selector: 0,
            ist: 0,
            flags: 0,
            offset_mid: 0,
            offset_high: 0,
            reserved: 0,
        }
    }

    pub const fn new(handler: u64, selector: u16, flags: u8) -> Self {
        GateDescriptor {
            offset_low: handler as u16,
            selector,
            ist: 0,
            flags,
            offset_mid: (handler >> 16) as u16,
            offset_high: (handler >> 32) as u32,
            reserved: 0,
        }
    }

    pub fn handler_address(&self) -> u64 {
        u64::from(self.offset_low)
            | (u64::from(self.offset_mid) << 16)
            | (u64::from(self.offset_high) << 32)
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Interrupt stack table slot, 0 meaning "stay on the current stack".
    pub fn stack_index(&self) -> u8 {
        self.ist & 0b111
    }

    pub fn is_present(&self) -> bool {
        self.flags & PRESENT != 0 && self.handler_address() != 0
    }
}

/// The interrupt descriptor table.
#[derive(Debug, Clone)]
#[repr(C, align(16))]
pub struct GateTable {
    entries: [GateDescriptor; GATE_COUNT],
    code_selector: u16,
}

impl GateTable {
    /// An empty table whose gates will use `code_selector`.
    pub const fn new(code_selector: u16) -> Self {
        GateTable {
            entries: [GateDescriptor::missing(); GATE_COUNT],
            code_selector,
        }
    }

    /// Point `vector` at `handler`. The address is trusted.
    pub fn install(&mut self, vector: u8, handler: u64, flags: u8) -> &mut GateDescriptor {
        let entry = &mut self.entries[usize::from(vector)];
        *entry = GateDescriptor::new(handler, self.code_selector, flags);
        entry
    }

    /// Run the gate at `vector` on interrupt stack `index` (IST is 1-based in
    /// hardware, the TSS slot is `index`).
    pub fn set_stack_index(&mut self, vector: u8, index: u16) {
        self.entries[usize::from(vector)].ist = (index as u8 + 1) & 0b111;
    }

    pub fn entry(&self, vector: u8) -> &GateDescriptor {
        &self.entries[usize::from(vector)]
    }

    pub fn is_fully_populated(&self) -> bool {
        self.entries.iter().all(GateDescriptor::is_present)
    }

    /// Commit the table to the processor.
    ///
    /// Must be called once, after every vector is installed and before
    /// interrupts are unmasked.
    pub fn load(&'static self) {
        let pointer = DescriptorTablePointer {
            limit: (core::mem::size_of::<[GateDescriptor; GATE_COUNT]>() - 1) as u16,
            base: VirtAddr::new(self.entries.as_ptr() as u64),
        };
        unsafe { lidt(&pointer) };
    }
}

/// Entry addresses for every class of vector.
#[derive(Debug, Clone)]
pub struct HandlerSet {
    /// One stub per CPU exception vector.
    pub exceptions: [u64; EXCEPTION_VECTORS],
    /// Keyboard line on the master controller.
    pub keyboard: u64,
    /// One stub per controller line, indexed by line. The keyboard's slot is
    /// overridden by `keyboard`.
    pub controller_lines: [u64; CONTROLLER_LINES],
    /// Vectors no exception or controller line raises.
    pub unassigned: u64,
    /// TSS slot for the double-fault stack.
    pub double_fault_stack: u16,
}

const DOUBLE_FAULT_VECTOR: u8 = 8;

/// Fill all 256 gates from `handlers`, placing controller lines where
/// `lines` remaps them.
pub fn build(code_selector: u16, lines: &ControllerConfig, handlers: &HandlerSet) -> GateTable {
    let mut table = GateTable::new(code_selector);

    for (vector, &handler) in handlers.exceptions.iter().enumerate() {
        table.install(vector as u8, handler, INTERRUPT_GATE);
    }
    table.set_stack_index(DOUBLE_FAULT_VECTOR, handlers.double_fault_stack);

    for (irq, &handler) in handlers.controller_lines.iter().enumerate() {
        table.install(lines.vector_for(irq as u8), handler, INTERRUPT_GATE);
    }
    table.install(lines.vector_for(KEYBOARD_IRQ), handlers.keyboard, INTERRUPT_GATE);

    for vector in EXCEPTION_VECTORS as u8..=u8::MAX {
        if !lines.handles(vector) {
            table.install(vector, handlers.unassigned, INTERRUPT_GATE);
        }
    }

    table
}
