/// System-wide constants to avoid magic numbers

/// VGA text mode constants
pub mod vga {
    /// VGA text buffer physical address
    pub const BUFFER_ADDR: usize = 0xb8000;

    /// VGA text mode dimensions
    pub const BUFFER_HEIGHT: usize = 25;
    pub const BUFFER_WIDTH: usize = 80;

    /// Rows reserved at the bottom of the screen for exception diagnostics
    pub const DIAGNOSTIC_ROW: usize = BUFFER_HEIGHT - 4;

    /// Text scale bounds (Ctrl+1..4, Ctrl+/-)
    pub const MIN_TEXT_SCALE: u8 = 1;
    pub const MAX_TEXT_SCALE: u8 = 4;
    pub const DEFAULT_TEXT_SCALE: u8 = 2;
}

/// PS/2 Keyboard controller constants
pub mod keyboard {
    /// PS/2 keyboard data port
    pub const DATA_PORT: u16 = 0x60;

    /// PS/2 keyboard status/command port
    pub const STATUS_COMMAND_PORT: u16 = 0x64;

    /// Status register bit flags
    pub const STATUS_OUTPUT_BUFFER_FULL: u8 = 0x01;

    /// Command to reset CPU via keyboard controller
    pub const CMD_RESET_CPU: u8 = 0xFE;

    /// High bit set on a scan code marks a key release
    pub const BREAK_BIT: u8 = 0x80;

    /// Modifier make codes (set 1); the break code is `make | BREAK_BIT`
    pub const LEFT_SHIFT: u8 = 0x2A;
    pub const RIGHT_SHIFT: u8 = 0x36;
    pub const LEFT_CTRL: u8 = 0x1D;
}

/// Interrupt constants
pub mod interrupts {
    /// PIC (Programmable Interrupt Controller) offset
    /// We remap PIC interrupts to start at 32 to avoid conflicts with CPU exceptions
    pub const PIC_1_OFFSET: u8 = 32;
    pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

    /// Number of CPU exception vectors (0..32)
    pub const EXCEPTION_VECTORS: usize = 32;

    /// Number of gates in the interrupt descriptor table
    pub const GATE_COUNT: usize = 256;

    /// Lines across the master/slave pair
    pub const CONTROLLER_LINES: usize = 16;

    /// Master controller line wired to the keyboard
    pub const KEYBOARD_IRQ: u8 = 1;

    /// Master controller line the slave is cascaded on
    pub const CASCADE_IRQ: u8 = 2;

    /// Present, ring 0, 64-bit interrupt gate
    pub const INTERRUPT_GATE: u8 = 0x8E;
}

/// CMOS real-time clock
pub mod rtc {
    pub const INDEX_PORT: u16 = 0x70;
    pub const DATA_PORT: u16 = 0x71;

    pub const REG_SECONDS: u8 = 0x00;
    pub const REG_MINUTES: u8 = 0x02;
    pub const REG_HOURS: u8 = 0x04;
    pub const REG_DAY: u8 = 0x07;
    pub const REG_MONTH: u8 = 0x08;
    pub const REG_YEAR: u8 = 0x09;
    pub const REG_STATUS_A: u8 = 0x0A;
    pub const REG_STATUS_B: u8 = 0x0B;

    /// Status A: update in progress
    pub const UPDATE_IN_PROGRESS: u8 = 0x80;
    /// Status B: values are binary rather than BCD
    pub const BINARY_MODE: u8 = 0x04;
    /// Status B: 24-hour clock
    pub const HOUR_24: u8 = 0x02;
    /// PM flag on the hours register in 12-hour mode
    pub const HOUR_PM: u8 = 0x80;

    pub const CENTURY: u16 = 2000;
}

/// Shell identity and limits
pub mod shell {
    pub const USERNAME: &str = "mini";
    pub const HOSTNAME: &str = "miniOS";
    pub const HOME: &str = "~";
    pub const SYSTEM_NAME: &str = "miniOS";
    pub const SYSTEM_RELEASE: &str = "miniOS 1.0 x86_64";

    pub const LINE_BUF_LEN: usize = 256;
    pub const PATH_LEN: usize = 64;
    pub const HISTORY_SIZE: usize = 10;
}

/// Toy file table limits
pub mod fs {
    pub const MAX_FILES: usize = 32;
    pub const MAX_FILENAME: usize = 32;
    pub const FILE_CONTENT_SIZE: usize = 1024;
}

/// Snake game geometry and pacing
pub mod game {
    /// Playable cells, border excluded
    pub const BOARD_WIDTH: i16 = 40;
    pub const BOARD_HEIGHT: i16 = 20;

    /// Screen cell of the board's top-left border corner
    pub const ORIGIN_ROW: usize = 2;
    pub const ORIGIN_COL: usize = 19;

    pub const START_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 128;
    pub const FOOD_POINTS: u32 = 10;

    /// Frames between snake steps, and the floor it shrinks towards
    pub const FRAMES_PER_STEP: u32 = 8;
    pub const MIN_FRAMES_PER_STEP: u32 = 3;
    /// Points needed before the step interval shrinks by one frame
    pub const SPEEDUP_EVERY: u32 = 100;

    /// Busy-wait iterations per frame
    pub const FRAME_SPIN: u32 = 400_000;
}

/// Logging
pub mod logging {
    use log::LevelFilter;

    pub const MAX_LEVEL: LevelFilter = LevelFilter::Info;

    /// COM1
    pub const SERIAL_PORT: u16 = 0x3F8;
}
