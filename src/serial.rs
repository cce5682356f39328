//! COM1 serial output, the transport behind the kernel log.

use core::fmt::{self, Write};

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

use crate::constants::logging::SERIAL_PORT;

lazy_static! {
    pub static ref SERIAL1: Mutex<SerialPort> = {
        let mut serial_port = unsafe { SerialPort::new(SERIAL_PORT) };
        serial_port.init();
        Mutex::new(serial_port)
    };
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => ($crate::serial::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    // The keyboard handler may log; never let it spin on a lock we hold.
    x86_64::instructions::interrupts::without_interrupts(|| {
        let _ = SERIAL1.lock().write_fmt(args);
    });
}
