//! PS/2 keyboard controller access: status checks, drain, polling.

use core::marker::PhantomData;

use pc_keyboard::{KeyCode, KeyState, ScancodeSet, ScancodeSet1};

use crate::constants::keyboard::{
    BREAK_BIT, CMD_RESET_CPU, DATA_PORT, STATUS_COMMAND_PORT, STATUS_OUTPUT_BUFFER_FULL,
};
use crate::cpu::{Cpu, MaskedInterrupts};
use crate::port::PortIo;

/// True when the controller holds a byte that has not been read yet.
pub fn output_full<P: PortIo>(ports: &mut P) -> bool {
    ports.read_u8(STATUS_COMMAND_PORT) & STATUS_OUTPUT_BUFFER_FULL != 0
}

/// Read one byte from the data port. Clears the controller's data-ready bit.
pub fn read_data<P: PortIo>(ports: &mut P) -> u8 {
    ports.read_u8(DATA_PORT)
}

/// Discard everything the controller has buffered.
///
/// Takes the masked-interrupts proof so the keyboard handler cannot consume
/// bytes in the middle of the drain. Returns the number of bytes discarded.
pub fn drain<P: PortIo, C: Cpu>(ports: &mut P, _masked: &MaskedInterrupts<'_, C>) -> usize {
    discard_buffered(ports)
}

fn discard_buffered<P: PortIo>(ports: &mut P) -> usize {
    let mut discarded = 0;
    while output_full(ports) {
        read_data(ports);
        discarded += 1;
    }
    discarded
}

/// Make codes have the break bit clear; 0x00 is a controller error byte.
pub fn is_make_code(scancode: u8) -> bool {
    scancode != 0 && scancode & BREAK_BIT == 0
}

/// Identify a make code as a set-1 key.
pub fn key_code(make: u8) -> Option<KeyCode> {
    let mut set = ScancodeSet1::new();
    match set.advance_state(make) {
        Ok(Some(event)) if event.state == KeyState::Down => Some(event.code),
        _ => None,
    }
}

/// Pulse the CPU reset line through the controller's command port.
///
/// On real hardware this does not return in practice.
pub fn pulse_reset<P: PortIo>(ports: &mut P) {
    ports.write_u8(STATUS_COMMAND_PORT, CMD_RESET_CPU);
}

/// Direct keyboard input for the polling modes.
///
/// Only constructible while interrupts are masked, and borrows that proof for
/// its whole lifetime, so the keyboard handler and a poller never compete for
/// the same bytes.
pub struct Poller<'p, P: PortIo> {
    ports: &'p mut P,
    _masked: PhantomData<&'p ()>,
}

impl<'p, P: PortIo> Poller<'p, P> {
    pub fn new<C: Cpu>(ports: &'p mut P, _masked: &'p MaskedInterrupts<'_, C>) -> Self {
        Poller {
            ports,
            _masked: PhantomData,
        }
    }

    /// Whether the controller has an unread byte.
    pub fn pending(&mut self) -> bool {
        output_full(self.ports)
    }

    /// One input check: returns a make code if one was waiting.
    /// Break codes and prefix bytes are consumed and dropped.
    pub fn poll(&mut self) -> Option<u8> {
        if !output_full(self.ports) {
            return None;
        }
        let scancode = read_data(self.ports);
        is_make_code(scancode).then_some(scancode)
    }

    /// Busy-wait for the next make code.
    pub fn wait(&mut self) -> u8 {
        loop {
            if let Some(make) = self.poll() {
                return make;
            }
            core::hint::spin_loop();
        }
    }

    pub fn poll_key(&mut self) -> Option<KeyCode> {
        self.poll().and_then(key_code)
    }

    /// Busy-wait for the next key press that maps to a key code.
    pub fn wait_key(&mut self) -> KeyCode {
        loop {
            if let Some(code) = key_code(self.wait()) {
                return code;
            }
        }
    }

    /// Drop anything typed ahead of the current screen.
    pub fn discard_pending(&mut self) -> usize {
        discard_buffered(self.ports)
    }
}
