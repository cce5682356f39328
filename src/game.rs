//! Snake, played in text mode with the keyboard polled.

use heapless::Deque;
use pc_keyboard::KeyCode;

use crate::constants::game::{
    BOARD_HEIGHT, BOARD_WIDTH, FOOD_POINTS, FRAMES_PER_STEP, FRAME_SPIN, MAX_LENGTH,
    MIN_FRAMES_PER_STEP, ORIGIN_COL, ORIGIN_ROW, SPEEDUP_EVERY, START_LENGTH,
};
use crate::port::PortIo;
use crate::ps2::Poller;
use crate::vga_buffer::{Canvas, Color, ColorCode, HIGHLIGHT, TEXT};

const SNAKE: ColorCode = ColorCode::new(Color::LightGreen, Color::Black);
const FOOD: ColorCode = ColorCode::new(Color::LightRed, Color::Black);
const WALL: ColorCode = ColorCode::new(Color::DarkGray, Color::Black);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self {
        Point { x, y }
    }

    fn inside_board(self) -> bool {
        (0..BOARD_WIDTH).contains(&self.x) && (0..BOARD_HEIGHT).contains(&self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    fn offset(self, from: Point) -> Point {
        match self {
            Direction::Up => Point::new(from.x, from.y - 1),
            Direction::Down => Point::new(from.x, from.y + 1),
            Direction::Left => Point::new(from.x - 1, from.y),
            Direction::Right => Point::new(from.x + 1, from.y),
        }
    }

    /// Arrow keys arrive as an 0xE0 prefix (dropped by the poller) followed
    /// by the numpad scan code, so both map here.
    pub fn from_key(code: KeyCode) -> Option<Direction> {
        match code {
            KeyCode::ArrowUp | KeyCode::Numpad8 => Some(Direction::Up),
            KeyCode::ArrowDown | KeyCode::Numpad2 => Some(Direction::Down),
            KeyCode::ArrowLeft | KeyCode::Numpad4 => Some(Direction::Left),
            KeyCode::ArrowRight | KeyCode::Numpad6 => Some(Direction::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved one cell; `vacated` is the cell the tail left.
    Moved { vacated: Point },
    Ate,
    Crashed,
}

/// Snake rules: movement, growth, scoring and food placement.
#[derive(Debug, Clone)]
pub struct Snake {
    /// Head at the front.
    body: Deque<Point, MAX_LENGTH>,
    heading: Direction,
    next_heading: Direction,
    food: Point,
    score: u32,
    food_counter: u32,
    alive: bool,
}

impl Default for Snake {
    fn default() -> Self {
        Self::new()
    }
}

impl Snake {
    pub fn new() -> Self {
        let centre = Point::new(BOARD_WIDTH / 2, BOARD_HEIGHT / 2);
        let mut body = Deque::new();
        for i in 0..START_LENGTH as i16 {
            let _ = body.push_back(Point::new(centre.x - i, centre.y));
        }
        let mut snake = Snake {
            body,
            heading: Direction::Right,
            next_heading: Direction::Right,
            food: centre,
            score: 0,
            food_counter: 0,
            alive: true,
        };
        snake.place_food();
        snake
    }

    pub fn head(&self) -> Point {
        self.body.front().copied().unwrap_or(Point::new(0, 0))
    }

    pub fn body(&self) -> impl Iterator<Item = &Point> {
        self.body.iter()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn food(&self) -> Point {
        self.food
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    /// Frames between steps. Shrinks by one every `SPEEDUP_EVERY` points.
    pub fn frames_per_step(&self) -> u32 {
        FRAMES_PER_STEP
            .saturating_sub(self.score / SPEEDUP_EVERY)
            .max(MIN_FRAMES_PER_STEP)
    }

    /// Queue a turn for the next step. Reversing onto the body is ignored.
    pub fn steer(&mut self, direction: Direction) {
        if direction != self.heading.opposite() {
            self.next_heading = direction;
        }
    }

    fn occupies(&self, point: Point, skip_tail: bool) -> bool {
        let len = self.body.len() - usize::from(skip_tail);
        self.body.iter().take(len).any(|&part| part == point)
    }

    /// Deterministic food placement: a counter picks a start cell, then scan
    /// forward to the first free one.
    fn place_food(&mut self) {
        let cells = (BOARD_WIDTH * BOARD_HEIGHT) as u32;
        self.food_counter = self.food_counter.wrapping_add(1);
        let start = self.food_counter.wrapping_mul(7919).wrapping_add(13) % cells;
        for offset in 0..cells {
            let index = (start + offset) % cells;
            let candidate = Point::new(
                (index % BOARD_WIDTH as u32) as i16,
                (index / BOARD_WIDTH as u32) as i16,
            );
            if !self.occupies(candidate, false) {
                self.food = candidate;
                return;
            }
        }
    }

    /// Advance one cell.
    pub fn step(&mut self) -> StepOutcome {
        if !self.alive {
            return StepOutcome::Crashed;
        }
        self.heading = self.next_heading;
        let next = self.heading.offset(self.head());
        let eating = next == self.food;

        if !next.inside_board() || self.occupies(next, !eating) {
            self.alive = false;
            return StepOutcome::Crashed;
        }

        if eating {
            if self.body.is_full() {
                self.body.pop_back();
            }
            let _ = self.body.push_front(next);
            self.score += FOOD_POINTS;
            self.place_food();
            StepOutcome::Ate
        } else {
            let vacated = self.body.pop_back().unwrap_or(next);
            let _ = self.body.push_front(next);
            StepOutcome::Moved { vacated }
        }
    }
}

fn screen_cell(point: Point) -> (usize, usize) {
    (
        ORIGIN_ROW + 1 + point.y as usize,
        ORIGIN_COL + 1 + point.x as usize,
    )
}

fn draw_cell<C: Canvas>(canvas: &mut C, point: Point, glyph: u8, color: ColorCode) {
    let (row, col) = screen_cell(point);
    canvas.put(row, col, glyph, color);
}

fn draw_score<C: Canvas>(canvas: &mut C, snake: &Snake) {
    let mut line = heapless::String::<32>::new();
    let _ = core::fmt::write(&mut line, format_args!("SCORE: {:03}", snake.score()));
    canvas.text(0, ORIGIN_COL, &line, HIGHLIGHT);
}

fn draw_board<C: Canvas>(canvas: &mut C, snake: &Snake) {
    canvas.clear();
    let width = BOARD_WIDTH as usize + 2;
    let height = BOARD_HEIGHT as usize + 2;
    for col in 0..width {
        canvas.put(ORIGIN_ROW, ORIGIN_COL + col, b'#', WALL);
        canvas.put(ORIGIN_ROW + height - 1, ORIGIN_COL + col, b'#', WALL);
    }
    for row in 0..height {
        canvas.put(ORIGIN_ROW + row, ORIGIN_COL, b'#', WALL);
        canvas.put(ORIGIN_ROW + row, ORIGIN_COL + width - 1, b'#', WALL);
    }
    for &part in snake.body() {
        draw_cell(canvas, part, b'o', SNAKE);
    }
    draw_cell(canvas, snake.head(), b'@', SNAKE);
    draw_cell(canvas, snake.food(), b'*', FOOD);
    draw_score(canvas, snake);
}

fn draw_start_screen<C: Canvas>(canvas: &mut C) {
    canvas.clear();
    canvas.centered(6, "SNAKE GAME", HIGHLIGHT);
    canvas.centered(9, "P - PLAY GAME", TEXT);
    canvas.centered(10, "Q - QUIT TO MAIN MENU", TEXT);
    canvas.centered(13, "CONTROLS: ARROW KEYS MOVE, Q OR ESC QUITS", TEXT);
}

fn draw_game_over<C: Canvas>(canvas: &mut C, score: u32) {
    let mut line = heapless::String::<32>::new();
    let _ = core::fmt::write(&mut line, format_args!("FINAL SCORE: {:03}", score));
    canvas.centered(10, "  GAME OVER  ", HIGHLIGHT);
    canvas.centered(12, &line, HIGHLIGHT);
    canvas.centered(14, "PRESS ENTER", TEXT);
}

fn frame_delay() {
    for _ in 0..FRAME_SPIN {
        core::hint::spin_loop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundEnd {
    Crashed { score: u32 },
    Quit,
}

fn play<P: PortIo, C: Canvas>(input: &mut Poller<'_, P>, canvas: &mut C) -> RoundEnd {
    let mut snake = Snake::new();
    draw_board(canvas, &snake);
    let mut frames = 0;

    loop {
        while let Some(code) = input.poll_key() {
            match code {
                KeyCode::Q | KeyCode::Escape => return RoundEnd::Quit,
                code => {
                    if let Some(direction) = Direction::from_key(code) {
                        snake.steer(direction);
                    }
                }
            }
        }

        frame_delay();
        frames += 1;
        if frames < snake.frames_per_step() {
            continue;
        }
        frames = 0;

        let previous_head = snake.head();
        match snake.step() {
            StepOutcome::Crashed => {
                return RoundEnd::Crashed {
                    score: snake.score(),
                }
            }
            StepOutcome::Moved { vacated } => draw_cell(canvas, vacated, b' ', TEXT),
            StepOutcome::Ate => {
                draw_cell(canvas, snake.food(), b'*', FOOD);
                draw_score(canvas, &snake);
            }
        }
        draw_cell(canvas, previous_head, b'o', SNAKE);
        draw_cell(canvas, snake.head(), b'@', SNAKE);
    }
}

/// The game activity. Returns to the menu when the player quits, or once a
/// crashed round's game-over screen is dismissed with Enter.
pub fn run<P: PortIo, C: Canvas>(input: &mut Poller<'_, P>, canvas: &mut C) {
    draw_start_screen(canvas);
    loop {
        match input.wait_key() {
            KeyCode::P => break,
            KeyCode::Q | KeyCode::Escape => return,
            _ => {}
        }
    }

    if let RoundEnd::Crashed { score } = play(input, canvas) {
        log::debug!("snake crashed with score {}", score);
        draw_game_over(canvas, score);
        input.discard_pending();
        while input.wait_key() != KeyCode::Return {}
    }
}
