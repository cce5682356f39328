use core::fmt;

use heapless::{Deque, String};

use crate::constants::shell::{
    HISTORY_SIZE, HOME, HOSTNAME, LINE_BUF_LEN, PATH_LEN, SYSTEM_NAME, SYSTEM_RELEASE, USERNAME,
};
use crate::interrupts::KeySink;
use crate::keyboard::ScaleAdjust;
use crate::mode::ExitSignal;
use crate::port::PortIo;
use crate::{fs::FileTable, ps2, rtc};

/// Where the shell writes. Implemented by the VGA screen.
pub trait Console {
    fn print(&mut self, s: &str);
    fn backspace(&mut self);
    fn clear(&mut self);
    fn text_scale(&self) -> u8;
    fn adjust_scale(&mut self, adjust: ScaleAdjust) -> u8;

    fn print_fmt(&mut self, args: fmt::Arguments) {
        let _ = fmt::write(&mut Adapter(self), args);
    }
}

struct Adapter<'c, C: ?Sized>(&'c mut C);

impl<C: Console + ?Sized> fmt::Write for Adapter<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.print(s);
        Ok(())
    }
}

macro_rules! out {
    ($console:expr, $($arg:tt)*) => ($console.print_fmt(format_args!($($arg)*)));
}

type Line = String<LINE_BUF_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Help,
    Clear,
    Echo,
    List,
    ChangeDir,
    PrintDir,
    Create,
    Write,
    Read,
    Delete,
    WhoAmI,
    Hostname,
    Date,
    Uname,
    History,
    Scale,
    Reboot,
    Exit,
}

/// Command registry entry
struct Command {
    name: &'static str,
    aliases: &'static [&'static str],
    usage: &'static str,
    help: &'static str,
    kind: CommandKind,
}

/// Command dispatch table - add new commands here
const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        aliases: &["?"],
        usage: "help",
        help: "Display this help message",
        kind: CommandKind::Help,
    },
    Command {
        name: "clear",
        aliases: &["cls"],
        usage: "clear",
        help: "Clear the screen",
        kind: CommandKind::Clear,
    },
    Command {
        name: "echo",
        aliases: &[],
        usage: "echo <text>",
        help: "Print text (quotes allowed)",
        kind: CommandKind::Echo,
    },
    Command {
        name: "ls",
        aliases: &["dir"],
        usage: "ls",
        help: "List files",
        kind: CommandKind::List,
    },
    Command {
        name: "cd",
        aliases: &[],
        usage: "cd [path]",
        help: "Change directory",
        kind: CommandKind::ChangeDir,
    },
    Command {
        name: "pwd",
        aliases: &[],
        usage: "pwd",
        help: "Print working directory",
        kind: CommandKind::PrintDir,
    },
    Command {
        name: "create",
        aliases: &["touch"],
        usage: "create <file>",
        help: "Create an empty file",
        kind: CommandKind::Create,
    },
    Command {
        name: "write",
        aliases: &[],
        usage: "write <file> <content>",
        help: "Replace a file's content",
        kind: CommandKind::Write,
    },
    Command {
        name: "read",
        aliases: &["cat"],
        usage: "read <file>",
        help: "Show a file's content",
        kind: CommandKind::Read,
    },
    Command {
        name: "delete",
        aliases: &["rm"],
        usage: "delete <file>",
        help: "Delete a file",
        kind: CommandKind::Delete,
    },
    Command {
        name: "whoami",
        aliases: &[],
        usage: "whoami",
        help: "Show the current user",
        kind: CommandKind::WhoAmI,
    },
    Command {
        name: "hostname",
        aliases: &[],
        usage: "hostname",
        help: "Show the host name",
        kind: CommandKind::Hostname,
    },
    Command {
        name: "date",
        aliases: &[],
        usage: "date",
        help: "Show date and time",
        kind: CommandKind::Date,
    },
    Command {
        name: "uname",
        aliases: &[],
        usage: "uname [-a]",
        help: "Show system information",
        kind: CommandKind::Uname,
    },
    Command {
        name: "history",
        aliases: &[],
        usage: "history",
        help: "Show command history",
        kind: CommandKind::History,
    },
    Command {
        name: "scale",
        aliases: &[],
        usage: "scale",
        help: "Show text scale (Ctrl+1..4, Ctrl+/-)",
        kind: CommandKind::Scale,
    },
    Command {
        name: "reboot",
        aliases: &[],
        usage: "reboot",
        help: "Reboot the system",
        kind: CommandKind::Reboot,
    },
    Command {
        name: "exit",
        aliases: &["logout"],
        usage: "exit",
        help: "Return to the boot menu",
        kind: CommandKind::Exit,
    },
];

/// Find command by name or alias
fn find_command(name: &str) -> Option<&'static Command> {
    COMMANDS
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// A command line split into name, first argument and the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Invocation<'l> {
    name: &'l str,
    arg: &'l str,
    rest: &'l str,
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(|c: char| c == ' ' || c == '\t') {
        Some(end) => (&s[..end], s[end..].trim_start()),
        None => (s, ""),
    }
}

fn parse(line: &str) -> Option<Invocation<'_>> {
    let (name, tail) = split_word(line);
    if name.is_empty() {
        return None;
    }

    // echo takes the whole tail, or what sits between the first pair of quotes
    if name == "echo" {
        let arg = match tail.strip_prefix('"') {
            Some(quoted) => quoted.split('"').next().unwrap_or(""),
            None => tail.trim_end(),
        };
        return Some(Invocation { name, arg, rest: "" });
    }

    let (arg, rest) = split_word(tail);
    Some(Invocation {
        name,
        arg,
        rest: rest.trim_end(),
    })
}

/// The interactive shell. Fed one character at a time from the keyboard
/// interrupt.
pub struct Shell<'a, P: PortIo> {
    ports: P,
    exit: &'a ExitSignal,
    line: Line,
    history: Deque<Line, HISTORY_SIZE>,
    cwd: String<PATH_LEN>,
    files: FileTable,
}

impl<'a, P: PortIo> Shell<'a, P> {
    pub fn new(ports: P, exit: &'a ExitSignal) -> Self {
        let mut cwd = String::new();
        let _ = cwd.push_str(HOME);
        Shell {
            ports,
            exit,
            line: String::new(),
            history: Deque::new(),
            cwd,
            files: FileTable::seeded(),
        }
    }

    /// Greet and show the first prompt. Any half-typed line is dropped.
    pub fn start<C: Console>(&mut self, console: &mut C) {
        self.line.clear();
        out!(console, "{} shell. Type 'help' for commands, 'exit' to return.\n", SYSTEM_NAME);
        self.prompt(console);
    }

    fn prompt<C: Console>(&self, console: &mut C) {
        out!(console, "{}@{}:{}$ ", USERNAME, HOSTNAME, self.cwd);
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(|line| line.as_str())
    }

    pub fn files(&self) -> &FileTable {
        &self.files
    }

    /// Character sink for the keyboard path.
    pub fn deliver_character<C: Console>(&mut self, c: char, console: &mut C) {
        match c {
            '\n' => {
                console.print("\n");
                let line = core::mem::take(&mut self.line);
                let command = line.trim();
                if !command.is_empty() {
                    self.remember(command);
                    self.execute(command, console);
                }
                self.prompt(console);
            }
            '\u{8}' => {
                if self.line.pop().is_some() {
                    console.backspace();
                }
            }
            ' '..='~' => {
                if self.line.len() < LINE_BUF_LEN - 1 && self.line.push(c).is_ok() {
                    let mut buf = [0u8; 4];
                    console.print(c.encode_utf8(&mut buf));
                }
            }
            _ => {}
        }
    }

    fn remember(&mut self, command: &str) {
        if self.history.is_full() {
            self.history.pop_front();
        }
        if let Ok(entry) = Line::try_from(command) {
            let _ = self.history.push_back(entry);
        }
    }

    /// Parse and run one command line.
    pub fn execute<C: Console>(&mut self, line: &str, console: &mut C) {
        let Some(invocation) = parse(line) else {
            return;
        };
        let Some(command) = find_command(invocation.name) else {
            log::warn!("unknown command {:?}", invocation.name);
            out!(console, "Command not found: {}\nType 'help' for available commands\n", invocation.name);
            return;
        };
        log::debug!("shell: {}", command.name);
        self.run(command, &invocation, console);
    }

    fn run<C: Console>(&mut self, command: &Command, inv: &Invocation<'_>, console: &mut C) {
        let usage = |console: &mut C| out!(console, "Usage: {}\n", command.usage);

        match command.kind {
            CommandKind::Help => {
                console.print("Available commands:\n");
                for cmd in COMMANDS {
                    out!(console, "  {:<24} {}\n", cmd.usage, cmd.help);
                }
            }
            CommandKind::Clear => console.clear(),
            CommandKind::Echo => out!(console, "{}\n", inv.arg),
            CommandKind::List => {
                console.print("Files:\n");
                for file in self.files.iter() {
                    out!(console, "- {} ({} bytes)\n", file.name(), file.size());
                }
            }
            CommandKind::ChangeDir => match inv.arg {
                "" | "~" | "/" | ".." => {
                    self.cwd.clear();
                    let _ = self.cwd.push_str(HOME);
                    console.print("Changed to home directory\n");
                }
                path => match String::try_from(path) {
                    Ok(path) => {
                        self.cwd = path;
                        console.print("Directory changed\n");
                    }
                    Err(()) => console.print("Path too long\n"),
                },
            },
            CommandKind::PrintDir => out!(console, "{}\n", self.cwd),
            CommandKind::Create if inv.arg.is_empty() => usage(console),
            CommandKind::Create => match self.files.create(inv.arg) {
                Ok(()) => out!(console, "File created: {}\n", inv.arg),
                Err(err) => {
                    log::warn!("create {:?}: {}", inv.arg, err);
                    out!(console, "Error creating file: {}\n", err);
                }
            },
            CommandKind::Write if inv.arg.is_empty() || inv.rest.is_empty() => usage(console),
            CommandKind::Write => match self.files.write(inv.arg, inv.rest) {
                Ok(()) => out!(console, "Content written to: {}\n", inv.arg),
                Err(err) => out!(console, "Error writing to file: {}\n", err),
            },
            CommandKind::Read if inv.arg.is_empty() => usage(console),
            CommandKind::Read => match self.files.read(inv.arg) {
                Ok(content) => out!(console, "File content:\n{}\n", content),
                Err(_) => out!(console, "File not found: {}\n", inv.arg),
            },
            CommandKind::Delete if inv.arg.is_empty() => usage(console),
            CommandKind::Delete => match self.files.delete(inv.arg) {
                Ok(()) => out!(console, "File deleted: {}\n", inv.arg),
                Err(_) => out!(console, "File not found: {}\n", inv.arg),
            },
            CommandKind::WhoAmI => out!(console, "{}\n", USERNAME),
            CommandKind::Hostname => out!(console, "{}\n", HOSTNAME),
            CommandKind::Date => {
                let now = rtc::read_time(&mut self.ports);
                out!(console, "{}\n", now);
            }
            CommandKind::Uname if inv.arg == "-a" => out!(console, "{}\n", SYSTEM_RELEASE),
            CommandKind::Uname => out!(console, "{}\n", SYSTEM_NAME),
            CommandKind::History if self.history.is_empty() => console.print("No command history\n"),
            CommandKind::History => {
                for (i, entry) in self.history.iter().enumerate() {
                    out!(console, "  {} {}\n", i + 1, entry);
                }
            }
            CommandKind::Scale => {
                let scale = console.text_scale();
                out!(console, "Text scale: {}\n", scale);
            }
            CommandKind::Reboot => {
                console.print("Rebooting system...\n");
                ps2::pulse_reset(&mut self.ports);
                console.print("Reboot failed\n");
            }
            CommandKind::Exit => {
                console.print("Returning to boot menu...\n");
                self.exit.raise();
            }
        }
    }
}

/// Routes decoded keys into the shell and scale commands to the console.
pub struct ShellSink<'s, 'a, P: PortIo, C: Console> {
    pub shell: &'s mut Shell<'a, P>,
    pub console: &'s mut C,
}

impl<P: PortIo, C: Console> KeySink for ShellSink<'_, '_, P, C> {
    fn deliver_character(&mut self, c: char) {
        self.shell.deliver_character(c, self.console);
    }

    fn adjust_scale(&mut self, adjust: ScaleAdjust) {
        let scale = self.console.adjust_scale(adjust);
        log::debug!("text scale {}", scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::rtc::{REG_DAY, REG_HOURS, REG_MONTH, REG_STATUS_B, REG_YEAR, BINARY_MODE, HOUR_24};
    use crate::testutil::{BufferConsole, SimPorts, Trace};

    fn shell(exit: &ExitSignal) -> Shell<'_, SimPorts> {
        Shell::new(SimPorts::new(&Trace::default()), exit)
    }

    fn type_line(shell: &mut Shell<'_, SimPorts>, console: &mut BufferConsole, line: &str) {
        for c in line.chars() {
            shell.deliver_character(c, console);
        }
        shell.deliver_character('\n', console);
    }

    fn run(shell: &mut Shell<'_, SimPorts>, line: &str) -> std::string::String {
        let mut console = BufferConsole::default();
        shell.execute(line, &mut console);
        console.output
    }

    #[test]
    fn test_start_prints_prompt() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();
        shell.start(&mut console);
        assert!(console.output.ends_with("mini@miniOS:~$ "));
    }

    #[test]
    fn test_typing_echoes_and_backspace_erases() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();

        for c in "lss".chars() {
            shell.deliver_character(c, &mut console);
        }
        shell.deliver_character('\u{8}', &mut console);

        assert_eq!(shell.line(), "ls");
        assert_eq!(console.output, "ls");
    }

    #[test]
    fn test_backspace_on_empty_line_is_ignored() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();
        console.output.push_str("$ ");

        shell.deliver_character('\u{8}', &mut console);

        assert_eq!(console.output, "$ ");
    }

    #[test]
    fn test_line_is_bounded() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();
        for _ in 0..LINE_BUF_LEN + 10 {
            shell.deliver_character('a', &mut console);
        }
        assert_eq!(shell.line().len(), LINE_BUF_LEN - 1);
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();
        shell.deliver_character('\u{1b}', &mut console);
        shell.deliver_character('\t', &mut console);
        assert_eq!(shell.line(), "");
        assert!(console.output.is_empty());
    }

    #[test]
    fn test_enter_executes_and_prompts_again() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();

        type_line(&mut shell, &mut console, "whoami");

        assert_eq!(console.output, "whoami\nmini\nmini@miniOS:~$ ");
        assert_eq!(shell.line(), "");
    }

    #[test]
    fn test_parse_splits_name_arg_and_rest() {
        assert_eq!(
            parse("  write notes  hello  world "),
            Some(Invocation { name: "write", arg: "notes", rest: "hello  world" })
        );
        assert_eq!(parse("   "), None);
        assert_eq!(parse("ls"), Some(Invocation { name: "ls", arg: "", rest: "" }));
    }

    #[test]
    fn test_echo_quoted_and_plain() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        assert_eq!(run(&mut shell, "echo \"hello   there\" ignored"), "hello   there\n");
        assert_eq!(run(&mut shell, "echo a  b"), "a  b\n");
        assert_eq!(run(&mut shell, "echo"), "\n");
    }

    #[test]
    fn test_unknown_command() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        assert!(run(&mut shell, "frobnicate").starts_with("Command not found: frobnicate\n"));
    }

    #[test]
    fn test_aliases_resolve() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        assert_eq!(run(&mut shell, "?"), run(&mut shell, "help"));
        assert_eq!(run(&mut shell, "dir"), run(&mut shell, "ls"));
        let mut console = BufferConsole::default();
        shell.execute("cls", &mut console);
        assert_eq!(console.clears, 1);
    }

    #[test]
    fn test_help_lists_every_command() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let help = run(&mut shell, "help");
        for cmd in COMMANDS {
            assert!(help.contains(cmd.help), "{} missing", cmd.name);
        }
    }

    #[test]
    fn test_file_commands() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);

        assert_eq!(run(&mut shell, "touch notes"), "File created: notes\n");
        assert_eq!(run(&mut shell, "write notes buy milk"), "Content written to: notes\n");
        assert_eq!(run(&mut shell, "cat notes"), "File content:\nbuy milk\n");
        assert_eq!(
            run(&mut shell, "ls"),
            "Files:\n- readme.txt (44 bytes)\n- notes (8 bytes)\n"
        );
        assert_eq!(run(&mut shell, "rm notes"), "File deleted: notes\n");
        assert_eq!(run(&mut shell, "read notes"), "File not found: notes\n");
        assert_eq!(shell.files().len(), 1);
    }

    #[test]
    fn test_file_command_errors_and_usage() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);

        assert_eq!(run(&mut shell, "create readme.txt"), "Error creating file: file already exists\n");
        assert_eq!(run(&mut shell, "write ghost boo"), "Error writing to file: file not found\n");
        assert_eq!(run(&mut shell, "write notes"), "Usage: write <file> <content>\n");
        assert_eq!(run(&mut shell, "create"), "Usage: create <file>\n");
        assert_eq!(run(&mut shell, "delete"), "Usage: delete <file>\n");
    }

    #[test]
    fn test_cd_and_pwd() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);

        assert_eq!(run(&mut shell, "cd docs"), "Directory changed\n");
        assert_eq!(run(&mut shell, "pwd"), "docs\n");
        let mut console = BufferConsole::default();
        type_line(&mut shell, &mut console, "pwd");
        assert!(console.output.ends_with("mini@miniOS:docs$ "));

        assert_eq!(run(&mut shell, "cd .."), "Changed to home directory\n");
        assert_eq!(shell.cwd(), "~");
    }

    #[test]
    fn test_identity_commands() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        assert_eq!(run(&mut shell, "hostname"), "miniOS\n");
        assert_eq!(run(&mut shell, "uname"), "miniOS\n");
        assert_eq!(run(&mut shell, "uname -a"), "miniOS 1.0 x86_64\n");
    }

    #[test]
    fn test_date_reads_clock() {
        let exit = ExitSignal::new();
        let mut ports = SimPorts::new(&Trace::default());
        ports.set_cmos(REG_STATUS_B, BINARY_MODE | HOUR_24);
        ports.set_cmos(REG_HOURS, 9);
        ports.set_cmos(REG_DAY, 17);
        ports.set_cmos(REG_MONTH, 10);
        ports.set_cmos(REG_YEAR, 26);
        let mut shell = Shell::new(ports, &exit);

        assert_eq!(run(&mut shell, "date"), "09:00:00 17/10/2026\n");
    }

    #[test]
    fn test_history_keeps_last_ten() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();

        assert_eq!(run(&mut shell, "history"), "No command history\n");
        for i in 0..12 {
            type_line(&mut shell, &mut console, &format!("echo {}", i));
        }
        type_line(&mut shell, &mut console, "   ");

        let entries: Vec<&str> = shell.history().collect();
        assert_eq!(entries.len(), HISTORY_SIZE);
        assert_eq!(entries.first(), Some(&"echo 2"));
        assert_eq!(entries.last(), Some(&"echo 11"));
        assert!(run(&mut shell, "history").starts_with("  1 echo 2\n"));
    }

    #[test]
    fn test_reboot_pulses_reset_line() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let output = run(&mut shell, "reboot");
        assert_eq!(shell.ports.reset_pulses(), 1);
        assert_eq!(output, "Rebooting system...\nReboot failed\n");
    }

    #[test]
    fn test_exit_raises_signal() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();

        type_line(&mut shell, &mut console, "logout");

        assert!(exit.is_raised());
        assert!(console.output.contains("Returning to boot menu...\n"));
    }

    #[test]
    fn test_sink_routes_scale_to_console() {
        let exit = ExitSignal::new();
        let mut shell = shell(&exit);
        let mut console = BufferConsole::default();
        {
            let mut sink = ShellSink { shell: &mut shell, console: &mut console };
            sink.adjust_scale(ScaleAdjust::Set(4));
            sink.adjust_scale(ScaleAdjust::Increase);
            sink.deliver_character('x');
        }
        assert_eq!(console.scale, 4);
        assert_eq!(shell.line(), "x");
        assert_eq!(run(&mut shell, "scale"), "Text scale: 2\n");
    }
}
