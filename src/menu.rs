//! Boot menu: pick the shell or the game.

use pc_keyboard::KeyCode;

use crate::mode::Mode;
use crate::port::PortIo;
use crate::ps2::Poller;
use crate::vga_buffer::{Canvas, HIGHLIGHT, TEXT};

const SHELL_ROW: usize = 9;
const GAME_ROW: usize = 11;

fn draw_options<C: Canvas>(canvas: &mut C, selected: Mode) {
    let (shell, game) = match selected {
        Mode::Game => (TEXT, HIGHLIGHT),
        _ => (HIGHLIGHT, TEXT),
    };
    let marker = |on: bool| if on { "> " } else { "  " };
    canvas.text(SHELL_ROW, 30, marker(selected != Mode::Game), shell);
    canvas.text(SHELL_ROW, 32, "COMMAND SHELL", shell);
    canvas.text(GAME_ROW, 30, marker(selected == Mode::Game), game);
    canvas.text(GAME_ROW, 32, "SNAKE GAME", game);
}

fn draw_menu<C: Canvas>(canvas: &mut C, selected: Mode) {
    canvas.clear();
    canvas.centered(3, "MINIOS BOOT MENU", HIGHLIGHT);
    canvas.centered(4, "Version 1.0", TEXT);
    draw_options(canvas, selected);
    canvas.centered(16, "Use S for Shell, G for Game", TEXT);
    canvas.centered(17, "Press ENTER to confirm selection", TEXT);
}

/// The menu activity. Returns the mode to enter next.
pub fn run<P: PortIo, C: Canvas>(input: &mut Poller<'_, P>, canvas: &mut C) -> Mode {
    let mut selected = Mode::Shell;
    draw_menu(canvas, selected);

    loop {
        match input.wait_key() {
            KeyCode::S if selected != Mode::Shell => {
                selected = Mode::Shell;
                draw_options(canvas, selected);
            }
            KeyCode::G if selected != Mode::Game => {
                selected = Mode::Game;
                draw_options(canvas, selected);
            }
            KeyCode::Return => return selected,
            KeyCode::Escape => return Mode::Shell,
            _ => {}
        }
    }
}
