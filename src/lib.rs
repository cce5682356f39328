//! miniOS kernel core: interrupt gates, the 8259 pair, keyboard decoding and
//! the mode controller that moves input between polling and interrupts.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_os = "none", feature(abi_x86_interrupt))]

pub mod constants;
pub mod cpu;
pub mod fs;
pub mod game;
pub mod gdt;
#[cfg(target_os = "none")]
pub mod handlers;
pub mod idt;
pub mod interrupts;
pub mod keyboard;
pub mod logger;
pub mod menu;
pub mod mode;
pub mod pic;
pub mod port;
pub mod ps2;
pub mod rtc;
pub mod serial;
pub mod shell;
pub mod vga_buffer;

#[cfg(test)]
mod testutil;
