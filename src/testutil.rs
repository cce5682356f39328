//! Simulated hardware for host tests.
//!
//! Every simulated device appends to one shared [`Trace`], so a test can
//! check the order in which the processor, the keyboard controller and the
//! interrupt controller were touched.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::constants::interrupts::EXCEPTION_VECTORS;
use crate::constants::keyboard::{
    CMD_RESET_CPU, DATA_PORT, STATUS_COMMAND_PORT, STATUS_OUTPUT_BUFFER_FULL,
};
use crate::constants::rtc;
use crate::constants::vga::{BUFFER_HEIGHT, BUFFER_WIDTH, DEFAULT_TEXT_SCALE};
use crate::cpu::Cpu;
use crate::idt::{self, GateTable, HandlerSet};
use crate::interrupts::{Diagnostics, InterruptSnapshot, KeySink};
use crate::keyboard::ScaleAdjust;
use crate::pic::{ControllerConfig, InterruptController};
use crate::port::PortIo;
use crate::shell::Console;
use crate::vga_buffer::{Canvas, ColorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    DisableInterrupts,
    EnableInterrupts,
    LoadGateTable,
    Halt,
    ProgramController,
    EndOfInterrupt(u8),
    /// Status register read, with the value returned.
    StatusRead(u8),
    DataRead(u8),
    PortWrite(u16, u8),
}

#[derive(Debug, Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<Event>>>);

impl Trace {
    pub fn record(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct SimCpu<'a> {
    trace: Trace,
    enabled: bool,
    loaded: Option<&'static GateTable>,
    on_halt: Option<Box<dyn FnMut() + 'a>>,
}

impl<'a> SimCpu<'a> {
    pub fn new(trace: &Trace) -> Self {
        SimCpu {
            trace: trace.clone(),
            enabled: false,
            loaded: None,
            on_halt: None,
        }
    }

    /// Run `hook` on every `sti; hlt`, standing in for the interrupt that
    /// wakes the processor.
    pub fn on_halt(mut self, hook: impl FnMut() + 'a) -> Self {
        self.on_halt = Some(Box::new(hook));
        self
    }

    pub fn loaded_table(&self) -> Option<&'static GateTable> {
        self.loaded
    }
}

impl Cpu for SimCpu<'_> {
    fn load_gate_table(&mut self, table: &'static GateTable) {
        self.loaded = Some(table);
        self.trace.record(Event::LoadGateTable);
    }

    fn enable_interrupts(&mut self) {
        self.enabled = true;
        self.trace.record(Event::EnableInterrupts);
    }

    fn disable_interrupts(&mut self) {
        self.enabled = false;
        self.trace.record(Event::DisableInterrupts);
    }

    fn interrupts_enabled(&self) -> bool {
        self.enabled
    }

    fn enable_and_halt(&mut self) {
        self.enabled = true;
        self.trace.record(Event::EnableInterrupts);
        self.trace.record(Event::Halt);
        if let Some(hook) = self.on_halt.as_mut() {
            hook();
        }
    }
}

/// PS/2 controller, CMOS clock and reset line behind port I/O.
pub struct SimPorts {
    trace: Trace,
    output: VecDeque<u8>,
    later: Vec<u8>,
    idle_polls_left: usize,
    last_data: u8,
    cmos: [u8; 128],
    cmos_index: u8,
    reset_pulses: usize,
}

impl SimPorts {
    pub fn new(trace: &Trace) -> Self {
        SimPorts {
            trace: trace.clone(),
            output: VecDeque::new(),
            later: Vec::new(),
            idle_polls_left: 0,
            last_data: 0,
            cmos: [0; 128],
            cmos_index: 0,
            reset_pulses: 0,
        }
    }

    /// Queue bytes in the controller's output buffer.
    pub fn push_scancodes(&mut self, scancodes: &[u8]) {
        self.output.extend(scancodes.iter().copied());
    }

    /// Queue bytes that only arrive after `idle_polls` status reads have
    /// found the controller empty.
    pub fn push_scancodes_after(&mut self, idle_polls: usize, scancodes: &[u8]) {
        self.idle_polls_left = idle_polls;
        self.later.extend_from_slice(scancodes);
    }

    /// Bytes in the output buffer plus any not yet arrived.
    pub fn pending(&self) -> usize {
        self.output.len() + self.later.len()
    }

    pub fn set_cmos(&mut self, register: u8, value: u8) {
        self.cmos[usize::from(register & 0x7F)] = value;
    }

    pub fn reset_pulses(&self) -> usize {
        self.reset_pulses
    }
}

impl PortIo for SimPorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        match port {
            STATUS_COMMAND_PORT => {
                if self.output.is_empty() && !self.later.is_empty() {
                    if self.idle_polls_left == 0 {
                        self.output.extend(self.later.drain(..));
                    } else {
                        self.idle_polls_left -= 1;
                    }
                }
                let status = if self.output.is_empty() {
                    0
                } else {
                    STATUS_OUTPUT_BUFFER_FULL
                };
                self.trace.record(Event::StatusRead(status));
                status
            }
            DATA_PORT => {
                // An empty controller returns whatever it last latched.
                if let Some(byte) = self.output.pop_front() {
                    self.last_data = byte;
                }
                self.trace.record(Event::DataRead(self.last_data));
                self.last_data
            }
            rtc::DATA_PORT => self.cmos[usize::from(self.cmos_index & 0x7F)],
            _ => 0xFF,
        }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        match (port, value) {
            (STATUS_COMMAND_PORT, CMD_RESET_CPU) => self.reset_pulses += 1,
            (rtc::INDEX_PORT, register) => self.cmos_index = register,
            _ => {}
        }
        self.trace.record(Event::PortWrite(port, value));
    }
}

pub struct SimPic {
    trace: Trace,
    config: ControllerConfig,
    acknowledged: Vec<u8>,
}

impl SimPic {
    pub fn new(trace: &Trace) -> Self {
        Self::with_config(trace, ControllerConfig::keyboard_only())
    }

    pub fn with_config(trace: &Trace, config: ControllerConfig) -> Self {
        SimPic {
            trace: trace.clone(),
            config,
            acknowledged: Vec::new(),
        }
    }

    pub fn acknowledged(&self) -> &[u8] {
        &self.acknowledged
    }
}

impl InterruptController for SimPic {
    fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn program(&mut self) {
        self.trace.record(Event::ProgramController);
    }

    fn end_of_interrupt(&mut self, vector: u8) {
        self.acknowledged.push(vector);
        self.trace.record(Event::EndOfInterrupt(vector));
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub chars: String,
    pub scales: Vec<ScaleAdjust>,
}

impl KeySink for RecordingSink {
    fn deliver_character(&mut self, c: char) {
        self.chars.push(c);
    }

    fn adjust_scale(&mut self, adjust: ScaleAdjust) {
        self.scales.push(adjust);
    }
}

#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    pub reports: Vec<(u8, bool)>,
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&mut self, snapshot: &InterruptSnapshot, fatal: bool) {
        self.reports.push((snapshot.vector, fatal));
    }
}

/// Console that keeps its output in a string.
#[derive(Debug)]
pub struct BufferConsole {
    pub output: String,
    pub clears: usize,
    pub scale: u8,
}

impl Default for BufferConsole {
    fn default() -> Self {
        BufferConsole {
            output: String::new(),
            clears: 0,
            scale: DEFAULT_TEXT_SCALE,
        }
    }
}

impl Console for BufferConsole {
    fn print(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn backspace(&mut self) {
        self.output.pop();
    }

    fn clear(&mut self) {
        self.output.clear();
        self.clears += 1;
    }

    fn text_scale(&self) -> u8 {
        self.scale
    }

    fn adjust_scale(&mut self, adjust: ScaleAdjust) -> u8 {
        self.scale = adjust.apply(self.scale);
        self.scale
    }
}

/// Text-mode screen as a grid of bytes.
pub struct GridCanvas {
    cells: Vec<[u8; BUFFER_WIDTH]>,
}

impl Default for GridCanvas {
    fn default() -> Self {
        GridCanvas {
            cells: vec![[b' '; BUFFER_WIDTH]; BUFFER_HEIGHT],
        }
    }
}

impl GridCanvas {
    pub fn row(&self, row: usize) -> String {
        String::from_utf8_lossy(&self.cells[row]).into_owned()
    }

    pub fn cell(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    pub fn contains(&self, needle: &str) -> bool {
        (0..BUFFER_HEIGHT).any(|row| self.row(row).contains(needle))
    }
}

impl Canvas for GridCanvas {
    fn put(&mut self, row: usize, col: usize, byte: u8, _color: ColorCode) {
        if row < BUFFER_HEIGHT && col < BUFFER_WIDTH {
            self.cells[row][col] = byte;
        }
    }

    fn clear(&mut self) {
        for row in self.cells.iter_mut() {
            *row = [b' '; BUFFER_WIDTH];
        }
    }
}

/// A complete gate table with made-up handler addresses.
pub fn full_gate_table() -> GateTable {
    let mut exceptions = [0; EXCEPTION_VECTORS];
    for (vector, slot) in exceptions.iter_mut().enumerate() {
        *slot = 0x0010_0000 + vector as u64 * 0x20;
    }
    let handlers = HandlerSet {
        exceptions,
        keyboard: 0x0010_1000,
        controller_lines: core::array::from_fn(|irq| 0x0010_1100 + irq as u64 * 0x10),
        unassigned: 0x0010_1200,
        double_fault_stack: 0,
    };
    idt::build(0x08, &ControllerConfig::keyboard_only(), &handlers)
}
