//! CMOS real-time clock.

use core::fmt;

use crate::constants::rtc::{
    BINARY_MODE, CENTURY, DATA_PORT, HOUR_24, HOUR_PM, INDEX_PORT, REG_DAY, REG_HOURS,
    REG_MINUTES, REG_MONTH, REG_SECONDS, REG_STATUS_A, REG_STATUS_B, REG_YEAR,
    UPDATE_IN_PROGRESS,
};
use crate::port::PortIo;

/// Wall-clock time as stored by the CMOS, no timezone applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02} {:02}/{:02}/{:04}",
            self.hour, self.minute, self.second, self.day, self.month, self.year
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawTime {
    second: u8,
    minute: u8,
    hour: u8,
    day: u8,
    month: u8,
    year: u8,
}

fn read_register<P: PortIo>(ports: &mut P, register: u8) -> u8 {
    ports.write_u8(INDEX_PORT, register);
    ports.read_u8(DATA_PORT)
}

fn update_in_progress<P: PortIo>(ports: &mut P) -> bool {
    read_register(ports, REG_STATUS_A) & UPDATE_IN_PROGRESS != 0
}

fn read_raw<P: PortIo>(ports: &mut P) -> RawTime {
    while update_in_progress(ports) {
        core::hint::spin_loop();
    }
    RawTime {
        second: read_register(ports, REG_SECONDS),
        minute: read_register(ports, REG_MINUTES),
        hour: read_register(ports, REG_HOURS),
        day: read_register(ports, REG_DAY),
        month: read_register(ports, REG_MONTH),
        year: read_register(ports, REG_YEAR),
    }
}

const fn from_bcd(value: u8) -> u8 {
    (value & 0x0F) + (value >> 4) * 10
}

/// Read the clock. Re-reads until two consecutive samples agree so a
/// rollover between registers cannot produce a torn value.
pub fn read_time<P: PortIo>(ports: &mut P) -> DateTime {
    let mut raw = read_raw(ports);
    loop {
        let again = read_raw(ports);
        if again == raw {
            break;
        }
        raw = again;
    }

    let status_b = read_register(ports, REG_STATUS_B);
    let decode = |value: u8| {
        if status_b & BINARY_MODE != 0 {
            value
        } else {
            from_bcd(value)
        }
    };

    let pm = raw.hour & HOUR_PM != 0;
    let mut hour = decode(raw.hour & !HOUR_PM);
    if status_b & HOUR_24 == 0 {
        hour %= 12;
        if pm {
            hour += 12;
        }
    }

    DateTime {
        second: decode(raw.second),
        minute: decode(raw.minute),
        hour,
        day: decode(raw.day),
        month: decode(raw.month),
        year: CENTURY + u16::from(decode(raw.year)),
    }
}
