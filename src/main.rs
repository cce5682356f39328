#![no_std]
#![no_main]

use core::panic::PanicInfo;

use minios::cpu::{halt_loop, HwCpu};
use minios::handlers::{GATES, INPUT, PICS, SHELL, SHELL_EXIT};
use minios::mode::{Activities, Mode, ModeController};
use minios::port::{HwPorts, PortIo};
use minios::ps2::Poller;
use minios::vga_buffer::{Canvas, Screen};
use minios::{game, gdt, interrupts, logger, menu, println};

/// What each mode runs on the real screen.
struct Kernel;

impl<P: PortIo> Activities<P> for Kernel {
    fn menu(&mut self, input: &mut Poller<'_, P>) -> Mode {
        menu::run(input, &mut Screen)
    }

    fn game(&mut self, input: &mut Poller<'_, P>) {
        game::run(input, &mut Screen)
    }

    fn shell_started(&mut self) {
        Canvas::clear(&mut Screen);
        SHELL.lock().start(&mut Screen);
    }

    fn shell_stopped(&mut self) {
        Canvas::clear(&mut Screen);
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("{}", info);
    halt_loop()
}

#[no_mangle]
pub extern "C" fn _start() -> ! {
    // without a logger the kernel still runs, just silently
    let _ = logger::init();
    log::info!("miniOS booting");

    gdt::init();
    interrupts::init(&mut HwCpu, &*GATES, &mut *PICS.lock());
    INPUT.lock().decoder_mut().reset();

    let ports = unsafe { HwPorts::new() };
    let mut controller = ModeController::new(ports, HwCpu, &INPUT, &SHELL_EXIT);
    controller.run(&mut Kernel)
}
