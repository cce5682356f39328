use crate::constants::interrupts::{CASCADE_IRQ, EXCEPTION_VECTORS, KEYBOARD_IRQ};
use crate::cpu::Cpu;
use crate::idt::GateTable;
use crate::keyboard::{Key, ScaleAdjust};
use crate::mode::{InputState, Mode};
use crate::pic::InterruptController;
use crate::port::PortIo;
use crate::ps2;

/// Exception names indexed by vector.
pub const EXCEPTION_NAMES: [&str; EXCEPTION_VECTORS] = [
    "DIVIDE ERROR",
    "DEBUG",
    "NON-MASKABLE INTERRUPT",
    "BREAKPOINT",
    "OVERFLOW",
    "BOUND RANGE EXCEEDED",
    "INVALID OPCODE",
    "DEVICE NOT AVAILABLE",
    "DOUBLE FAULT",
    "COPROCESSOR SEGMENT OVERRUN",
    "INVALID TSS",
    "SEGMENT NOT PRESENT",
    "STACK SEGMENT FAULT",
    "GENERAL PROTECTION FAULT",
    "PAGE FAULT",
    "RESERVED",
    "x87 FLOATING POINT",
    "ALIGNMENT CHECK",
    "MACHINE CHECK",
    "SIMD FLOATING POINT",
    "VIRTUALIZATION",
    "CONTROL PROTECTION",
    "RESERVED",
    "RESERVED",
    "RESERVED",
    "RESERVED",
    "RESERVED",
    "RESERVED",
    "HYPERVISOR INJECTION",
    "VMM COMMUNICATION",
    "SECURITY",
    "RESERVED",
];

/// Vectors for which the CPU pushes an error code.
pub const fn has_error_code(vector: u8) -> bool {
    matches!(vector, 8 | 10 | 11 | 12 | 13 | 14 | 17 | 21 | 29 | 30)
}

/// Exceptions after which execution does not resume.
pub const fn is_fatal(vector: u8) -> bool {
    matches!(vector, 8 | 13 | 14 | 18)
}

/// Processor state captured on handler entry. Read-only, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptSnapshot {
    pub vector: u8,
    pub error_code: Option<u64>,
    pub instruction_pointer: u64,
    pub stack_pointer: u64,
    pub cpu_flags: u64,
}

impl InterruptSnapshot {
    pub fn name(&self) -> &'static str {
        EXCEPTION_NAMES
            .get(usize::from(self.vector))
            .copied()
            .unwrap_or("UNKNOWN")
    }
}

/// What the exception stub does after the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionOutcome {
    Resume,
    Halt,
}

/// Renders exception reports.
pub trait Diagnostics {
    fn report(&mut self, snapshot: &InterruptSnapshot, fatal: bool);
}

/// Receives what the keyboard handler decodes while the shell is active.
pub trait KeySink {
    fn deliver_character(&mut self, c: char);
    fn adjust_scale(&mut self, adjust: ScaleAdjust);
}

/// Exception path (vectors 0..32).
pub fn exception<D: Diagnostics>(snapshot: &InterruptSnapshot, display: &mut D) -> ExceptionOutcome {
    let fatal = is_fatal(snapshot.vector);
    log::error!(
        "EXCEPTION: {} (vector {}) at {:#x}, error code {:?}",
        snapshot.name(),
        snapshot.vector,
        snapshot.instruction_pointer,
        snapshot.error_code
    );
    display.report(snapshot, fatal);
    if fatal {
        ExceptionOutcome::Halt
    } else {
        ExceptionOutcome::Resume
    }
}

/// Keyboard line of the hardware interrupt path.
///
/// Reads exactly one byte, decodes it only when the shell is the current
/// mode, then acknowledges. The acknowledgment is sent on every path, after
/// the read.
pub fn keyboard_irq<P, C, S>(ports: &mut P, controller: &mut C, input: &mut InputState, sink: &mut S)
where
    P: PortIo,
    C: InterruptController,
    S: KeySink,
{
    let scancode = ps2::read_data(ports);

    if input.mode() == Mode::Shell {
        match input.decoder_mut().feed(scancode) {
            Some(Key::Char(c)) => sink.deliver_character(c),
            Some(Key::Scale(adjust)) => sink.adjust_scale(adjust),
            None => {}
        }
    }

    let vector = controller.config().vector_for(KEYBOARD_IRQ);
    controller.end_of_interrupt(vector);
}

/// Any controller line other than the keyboard, raised at `vector`.
///
/// An unmasked line is acknowledged on the chips it came through. A masked
/// line only fires spuriously: a spurious master line gets no acknowledgment,
/// a spurious slave line is acknowledged on the master alone, which did see
/// the cascade.
pub fn controller_line<C: InterruptController>(controller: &mut C, vector: u8) {
    let lines = *controller.config();
    let Some(irq) = lines.line_for(vector) else {
        log::warn!("vector {} is not a controller line", vector);
        return;
    };

    if lines.is_unmasked(irq) {
        controller.end_of_interrupt(vector);
    } else if irq >= 8 {
        controller.end_of_interrupt(lines.vector_for(CASCADE_IRQ));
    }
}

/// One-time interrupt setup: gate table first, then the controller.
/// Interrupts stay masked; the mode controller unmasks them for the shell.
pub fn init<C: Cpu, I: InterruptController>(cpu: &mut C, gates: &'static GateTable, controller: &mut I) {
    cpu.disable_interrupts();
    cpu.load_gate_table(gates);
    log::info!("gate table loaded");
    controller.program();
}
