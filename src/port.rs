//! Byte-wide port I/O capability.
//!
//! Everything that talks to the keyboard controller or the CMOS clock goes
//! through [`PortIo`], so the same logic runs against real ports on bare
//! metal and against a simulated controller in unit tests.

use x86_64::instructions::port::Port;

/// Read or write one byte at an I/O port.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn write_u8(&mut self, port: u16, value: u8);
}

/// Real x86 I/O ports (`in`/`out`).
#[derive(Debug)]
pub struct HwPorts {
    _private: (),
}

impl HwPorts {
    /// # Safety
    ///
    /// The caller must be running at an I/O privilege level that allows port
    /// access, and must not race other code driving the same devices outside
    /// the interrupt-mask discipline.
    pub const unsafe fn new() -> Self {
        HwPorts { _private: () }
    }
}

impl PortIo for HwPorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        let mut port = Port::<u8>::new(port);
        unsafe { port.read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        let mut port = Port::<u8>::new(port);
        unsafe { port.write(value) }
    }
}

impl<P: PortIo + ?Sized> PortIo for &mut P {
    fn read_u8(&mut self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }
}
