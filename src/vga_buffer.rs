use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use volatile::Volatile;
use spin::Mutex;
use lazy_static::lazy_static;
use crate::constants::vga::{BUFFER_HEIGHT, BUFFER_WIDTH, BUFFER_ADDR, DEFAULT_TEXT_SCALE, DIAGNOSTIC_ROW};
use crate::interrupts::{Diagnostics, InterruptSnapshot};
use crate::keyboard::ScaleAdjust;
use crate::shell::Console;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorCode(u8);

impl ColorCode {
    pub const fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode((background as u8) << 4 | (foreground as u8))
    }
}

pub const TEXT: ColorCode = ColorCode::new(Color::White, Color::Black);
pub const HIGHLIGHT: ColorCode = ColorCode::new(Color::Yellow, Color::Black);
pub const ALERT: ColorCode = ColorCode::new(Color::White, Color::Red);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
struct ScreenChar {
    ascii_character: u8,
    color_code: ColorCode,
}

#[repr(transparent)]
struct Buffer {
    chars: [[Volatile<ScreenChar>; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

pub struct Writer {
    column_position: usize,
    row_position: usize,
    color_code: ColorCode,
    buffer: &'static mut Buffer,
}

impl Writer {
    /// # Safety
    ///
    /// Creates a second handle on the VGA buffer. Only for output paths that
    /// must not wait on [`WRITER`].
    unsafe fn unlocked(row: usize, color_code: ColorCode) -> Writer {
        Writer {
            column_position: 0,
            row_position: row,
            color_code,
            buffer: &mut *(BUFFER_ADDR as *mut Buffer),
        }
    }

    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            b'\r' => {}
            _ => {
                if self.column_position >= BUFFER_WIDTH {
                    self.new_line();
                }
                let row = self.row_position;
                let col = self.column_position;
                self.buffer.chars[row][col].write(ScreenChar {
                    ascii_character: byte,
                    color_code: self.color_code,
                });
                self.column_position += 1;
            }
        }
    }

    fn new_line(&mut self) {
        if self.row_position < BUFFER_HEIGHT - 1 {
            self.row_position += 1;
        } else {
            for row in 1..BUFFER_HEIGHT {
                for col in 0..BUFFER_WIDTH {
                    let character = self.buffer.chars[row][col].read();
                    self.buffer.chars[row - 1][col].write(character);
                }
            }
            self.clear_row(BUFFER_HEIGHT - 1);
        }
        self.column_position = 0;
    }

    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color_code,
        };
        for col in 0..BUFFER_WIDTH {
            self.buffer.chars[row][col].write(blank);
        }
    }

    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e | b'\n' => self.write_byte(byte),
                _ => self.write_byte(0xfe),
            }
        }
    }

    /// Remove the last printed character on the current row.
    pub fn backspace(&mut self) {
        if self.column_position > 0 {
            self.column_position -= 1;
            let row = self.row_position;
            let col = self.column_position;
            self.buffer.chars[row][col].write(ScreenChar {
                ascii_character: b' ',
                color_code: self.color_code,
            });
        }
    }

    pub fn clear_screen(&mut self) {
        self.color_code = TEXT;
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
        self.column_position = 0;
        self.row_position = 0;
    }
}

lazy_static! {
    pub static ref WRITER: Mutex<Writer> = Mutex::new(Writer {
        column_position: 0,
        row_position: 0,
        color_code: TEXT,
        buffer: unsafe { &mut *(BUFFER_ADDR as *mut Buffer) },
    });
}

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::vga_buffer::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    x86_64::instructions::interrupts::without_interrupts(|| {
        let _ = WRITER.lock().write_fmt(args);
    });
}

/// Cell-addressed drawing, used by the full-screen polling activities.
pub trait Canvas {
    /// Draw one character cell. Out-of-range cells are ignored.
    fn put(&mut self, row: usize, col: usize, byte: u8, color: ColorCode);
    fn clear(&mut self);

    fn text(&mut self, row: usize, col: usize, s: &str, color: ColorCode) {
        for (i, byte) in s.bytes().enumerate() {
            self.put(row, col + i, byte, color);
        }
    }

    fn centered(&mut self, row: usize, s: &str, color: ColorCode) {
        let col = BUFFER_WIDTH.saturating_sub(s.len()) / 2;
        self.text(row, col, s, color);
    }
}

impl Canvas for Writer {
    fn put(&mut self, row: usize, col: usize, byte: u8, color: ColorCode) {
        if row < BUFFER_HEIGHT && col < BUFFER_WIDTH {
            self.buffer.chars[row][col].write(ScreenChar {
                ascii_character: byte,
                color_code: color,
            });
        }
    }

    fn clear(&mut self) {
        self.clear_screen();
    }
}

static TEXT_SCALE: AtomicU8 = AtomicU8::new(DEFAULT_TEXT_SCALE);

/// Current text scale. The text-mode cell size is fixed, so the value is
/// only recorded.
pub fn text_scale() -> u8 {
    TEXT_SCALE.load(Ordering::Relaxed)
}

pub fn adjust_text_scale(adjust: ScaleAdjust) -> u8 {
    let scale = adjust.apply(text_scale());
    TEXT_SCALE.store(scale, Ordering::Relaxed);
    scale
}

/// The screen behind [`WRITER`], locked per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct Screen;

impl Canvas for Screen {
    fn put(&mut self, row: usize, col: usize, byte: u8, color: ColorCode) {
        WRITER.lock().put(row, col, byte, color);
    }

    fn clear(&mut self) {
        WRITER.lock().clear_screen();
    }

    fn text(&mut self, row: usize, col: usize, s: &str, color: ColorCode) {
        let mut writer = WRITER.lock();
        for (i, byte) in s.bytes().enumerate() {
            writer.put(row, col + i, byte, color);
        }
    }
}

impl Console for Screen {
    fn print(&mut self, s: &str) {
        WRITER.lock().write_string(s);
    }

    fn backspace(&mut self) {
        WRITER.lock().backspace();
    }

    fn clear(&mut self) {
        WRITER.lock().clear_screen();
    }

    fn text_scale(&self) -> u8 {
        text_scale()
    }

    fn adjust_scale(&mut self, adjust: ScaleAdjust) -> u8 {
        adjust_text_scale(adjust)
    }
}

/// Lay out an exception report.
pub fn write_report<W: fmt::Write>(out: &mut W, snapshot: &InterruptSnapshot, fatal: bool) -> fmt::Result {
    write!(out, "EXCEPTION {}: {}", snapshot.vector, snapshot.name())?;
    if let Some(code) = snapshot.error_code {
        write!(out, " (error {:#x})", code)?;
    }
    write!(
        out,
        "\nRIP {:#018x}  RSP {:#018x}  RFLAGS {:#x}\n",
        snapshot.instruction_pointer, snapshot.stack_pointer, snapshot.cpu_flags
    )?;
    if fatal {
        write!(out, "System halted.")
    } else {
        write!(out, "Continuing.")
    }
}

/// Exception output that bypasses [`WRITER`]: the fault may have hit while
/// the lock was held.
pub struct DiagnosticScreen {
    writer: Writer,
}

impl DiagnosticScreen {
    /// # Safety
    ///
    /// Writes the VGA buffer without taking [`WRITER`]. Only exception
    /// handlers may use it.
    pub unsafe fn new() -> Self {
        DiagnosticScreen {
            writer: Writer::unlocked(DIAGNOSTIC_ROW, ALERT),
        }
    }
}

impl Diagnostics for DiagnosticScreen {
    fn report(&mut self, snapshot: &InterruptSnapshot, fatal: bool) {
        for row in DIAGNOSTIC_ROW..BUFFER_HEIGHT {
            self.writer.clear_row(row);
        }
        let _ = write_report(&mut self.writer, snapshot, fatal);
    }
}
