//! Processor entry points and the state they share with the mode controller.
//!
//! Bare metal only: the stubs use the `x86-interrupt` calling convention and
//! the statics drive real hardware.

use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::structures::idt::InterruptStackFrame;

use crate::constants::interrupts::{CONTROLLER_LINES, EXCEPTION_VECTORS};
use crate::cpu::halt_loop;
use crate::gdt;
use crate::idt::{self, GateTable, HandlerSet};
use crate::interrupts::{self, ExceptionOutcome, InterruptSnapshot};
use crate::mode::{ExitSignal, InputState};
use crate::pic::{ControllerConfig, Pics};
use crate::port::HwPorts;
use crate::shell::{Shell, ShellSink};
use crate::vga_buffer::{DiagnosticScreen, Screen};

const LINES: ControllerConfig = ControllerConfig::keyboard_only();

pub static PICS: Mutex<Pics> = Mutex::new(unsafe { Pics::new(LINES) });

/// Current mode and modifier latches.
pub static INPUT: Mutex<InputState> = Mutex::new(InputState::new());

pub static SHELL_EXIT: ExitSignal = ExitSignal::new();

lazy_static! {
    pub static ref SHELL: Mutex<Shell<'static, HwPorts>> =
        Mutex::new(Shell::new(unsafe { HwPorts::new() }, &SHELL_EXIT));

    pub static ref GATES: GateTable = idt::build(gdt::code_selector(), &LINES, &handler_set());
}

fn snapshot(vector: u8, error_code: Option<u64>, frame: &InterruptStackFrame) -> InterruptSnapshot {
    InterruptSnapshot {
        vector,
        error_code,
        instruction_pointer: frame.instruction_pointer.as_u64(),
        stack_pointer: frame.stack_pointer.as_u64(),
        cpu_flags: frame.cpu_flags.bits(),
    }
}

fn exception(snapshot: InterruptSnapshot) {
    let mut display = unsafe { DiagnosticScreen::new() };
    if interrupts::exception(&snapshot, &mut display) == ExceptionOutcome::Halt {
        halt_loop();
    }
}

macro_rules! exception_stubs {
    ($($vector:literal => $name:ident $(($code:ident))?),* $(,)?) => {
        $(exception_stubs!(@stub $vector, $name $(, $code)?);)*

        const STUB_COUNT: usize = [$($vector),*].len();

        fn exception_entries() -> [u64; EXCEPTION_VECTORS] {
            [$($name as u64),*]
        }
    };
    (@stub $vector:literal, $name:ident) => {
        extern "x86-interrupt" fn $name(frame: InterruptStackFrame) {
            exception(snapshot($vector, None, &frame));
        }
    };
    (@stub $vector:literal, $name:ident, $code:ident) => {
        extern "x86-interrupt" fn $name(frame: InterruptStackFrame, $code: u64) {
            exception(snapshot($vector, Some($code), &frame));
        }
    };
}

exception_stubs! {
    0 => divide_error,
    1 => debug,
    2 => non_maskable,
    3 => breakpoint,
    4 => overflow,
    5 => bound_range,
    6 => invalid_opcode,
    7 => device_not_available,
    8 => double_fault(error_code),
    9 => coprocessor_overrun,
    10 => invalid_tss(error_code),
    11 => segment_not_present(error_code),
    12 => stack_segment_fault(error_code),
    13 => general_protection(error_code),
    14 => page_fault(error_code),
    15 => reserved_15,
    16 => x87_floating_point,
    17 => alignment_check(error_code),
    18 => machine_check,
    19 => simd_floating_point,
    20 => virtualization,
    21 => control_protection(error_code),
    22 => reserved_22,
    23 => reserved_23,
    24 => reserved_24,
    25 => reserved_25,
    26 => reserved_26,
    27 => reserved_27,
    28 => hypervisor_injection,
    29 => vmm_communication(error_code),
    30 => security(error_code),
    31 => reserved_31,
}

const _: () = assert!(STUB_COUNT == EXCEPTION_VECTORS);

extern "x86-interrupt" fn keyboard(_frame: InterruptStackFrame) {
    let mut ports = unsafe { HwPorts::new() };
    let mut input = INPUT.lock();
    let mut shell = SHELL.lock();
    let mut console = Screen;
    let mut sink = ShellSink {
        shell: &mut *shell,
        console: &mut console,
    };
    interrupts::keyboard_irq(&mut ports, &mut *PICS.lock(), &mut *input, &mut sink);
}

macro_rules! controller_stubs {
    ($($irq:literal => $name:ident),* $(,)?) => {
        $(
            extern "x86-interrupt" fn $name(_frame: InterruptStackFrame) {
                interrupts::controller_line(&mut *PICS.lock(), LINES.vector_for($irq));
            }
        )*

        fn controller_entries() -> [u64; CONTROLLER_LINES] {
            [$($name as u64),*]
        }
    };
}

controller_stubs! {
    0 => line_0,
    1 => line_1,
    2 => line_2,
    3 => line_3,
    4 => line_4,
    5 => line_5,
    6 => line_6,
    7 => line_7,
    8 => line_8,
    9 => line_9,
    10 => line_10,
    11 => line_11,
    12 => line_12,
    13 => line_13,
    14 => line_14,
    15 => line_15,
}

extern "x86-interrupt" fn unassigned(frame: InterruptStackFrame) {
    log::warn!(
        "unexpected interrupt at {:#x}",
        frame.instruction_pointer.as_u64()
    );
}

fn handler_set() -> HandlerSet {
    HandlerSet {
        exceptions: exception_entries(),
        keyboard: keyboard as u64,
        controller_lines: controller_entries(),
        unassigned: unassigned as u64,
        double_fault_stack: gdt::DOUBLE_FAULT_IST_INDEX,
    }
}
