//! Mode controller: one activity at a time, and the interrupt-mask/drain
//! protocol at every switch.
//!
//! Menu and Game poll the keyboard controller with interrupts masked. Shell
//! receives input only through the keyboard interrupt. Every transition
//! masks interrupts, drains the controller, records the new mode, and only
//! then (for the shell) unmasks again. A byte typed during one mode therefore
//! never shows up as a key press in the next.

use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::cpu::{Cpu, MaskedInterrupts};
use crate::keyboard::Decoder;
use crate::port::PortIo;
use crate::ps2::{self, Poller};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Menu,
    Shell,
    Game,
}

/// How a mode receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// Interrupts masked, controller read directly.
    Polling,
    /// Interrupts unmasked, bytes arrive through the keyboard handler.
    EventDriven,
}

impl Mode {
    pub fn discipline(self) -> Discipline {
        match self {
            Mode::Menu | Mode::Game => Discipline::Polling,
            Mode::Shell => Discipline::EventDriven,
        }
    }
}

/// State shared between the mode controller and the keyboard handler.
///
/// The controller writes it only while interrupts are masked, the handler
/// only runs while they are not, so there is a single writer at any time.
#[derive(Debug, Clone)]
pub struct InputState {
    mode: Mode,
    decoder: Decoder,
}

impl InputState {
    pub const fn new() -> Self {
        InputState {
            mode: Mode::Menu,
            decoder: Decoder::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn decoder_mut(&mut self) -> &mut Decoder {
        &mut self.decoder
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// Sticky "leave the shell" flag, raised by the shell's exit command.
#[derive(Debug, Default)]
pub struct ExitSignal(AtomicBool);

impl ExitSignal {
    pub const fn new() -> Self {
        ExitSignal(AtomicBool::new(false))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The activity behind each mode.
pub trait Activities<P: PortIo> {
    /// Run the menu until a selection is made.
    fn menu(&mut self, input: &mut Poller<'_, P>) -> Mode;

    /// Run the game until the player quits.
    fn game(&mut self, input: &mut Poller<'_, P>);

    /// Prepare the shell screen. Called with interrupts still masked.
    fn shell_started(&mut self);

    /// Tear down after the shell exits. Called with interrupts masked again.
    fn shell_stopped(&mut self);
}

pub struct ModeController<'a, P: PortIo, C: Cpu> {
    ports: P,
    cpu: C,
    input: &'a Mutex<InputState>,
    shell_exit: &'a ExitSignal,
}

impl<'a, P: PortIo, C: Cpu> ModeController<'a, P, C> {
    pub fn new(ports: P, cpu: C, input: &'a Mutex<InputState>, shell_exit: &'a ExitSignal) -> Self {
        ModeController {
            ports,
            cpu,
            input,
            shell_exit,
        }
    }

    pub fn current_mode(&self) -> Mode {
        self.input.lock().mode()
    }

    /// Run modes forever, starting from the menu.
    pub fn run<A: Activities<P>>(&mut self, activities: &mut A) -> ! {
        let mut next = Mode::Menu;
        loop {
            next = self.step(next, activities);
        }
    }

    /// Enter `mode`, run its activity to completion and return the mode to
    /// enter next.
    pub fn step<A: Activities<P>>(&mut self, mode: Mode, activities: &mut A) -> Mode {
        let previous = self.current_mode();
        let mut masked = MaskedInterrupts::acquire(&mut self.cpu);
        let drained = ps2::drain(&mut self.ports, &masked);
        {
            let mut input = self.input.lock();
            input.set_mode(mode);
            // a release seen outside the shell never reached the latches
            if mode == Mode::Shell {
                input.decoder_mut().reset();
            }
        }
        log::debug!(
            "mode {:?} -> {:?}, {} stale byte(s) drained",
            previous,
            mode,
            drained
        );

        match mode.discipline() {
            Discipline::Polling => {
                let mut input = Poller::new(&mut self.ports, &masked);
                match mode {
                    Mode::Game => {
                        activities.game(&mut input);
                        Mode::Menu
                    }
                    _ => activities.menu(&mut input),
                }
            }
            Discipline::EventDriven => {
                self.shell_exit.reset();
                activities.shell_started();

                let exit = self.shell_exit;
                masked.sleep_until(|| exit.is_raised());

                self.shell_exit.reset();
                activities.shell_stopped();
                Mode::Menu
            }
        }
    }
}
