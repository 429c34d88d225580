use std::io::{self, BufRead, Write};

use tracing::debug;

use super::breakpoints::{parse_break_keyword, BreakMask, BreakpointSet, SetOutcome, StopKind};
use super::commands::{lookup, spec_of, CommandKind, CommandResult, COMMANDS};
use super::frames::{FrameArena, FrameId, StackView};
use super::host::{BuildHost, ControlSignal, HostError};
use super::stepping::{OfferDecision, SteppingState};

/// Best-effort console print: the session UI never fails a command.
macro_rules! say {
    ($dst:expr) => {{
        let _ = writeln!($dst);
    }};
    ($dst:expr, $($arg:tt)*) => {{
        let _ = writeln!($dst, $($arg)*);
    }};
}

/// The debugger session context: breakpoint registry, stepping state,
/// tracing flag, command history and console IO, all owned in one place
/// and handed by reference into the command handlers.
pub struct Debugger {
    breakpoints: BreakpointSet,
    stepping: SteppingState,
    tracing: bool,
    history: Vec<String>,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Debugger {
    /// Debugger reading operator input from stdin and printing to stderr,
    /// keeping recipe stdout clean.
    pub fn stdio() -> Self {
        Self::with_io(
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stderr()),
        )
    }

    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            breakpoints: BreakpointSet::new(),
            stepping: SteppingState::Free,
            tracing: false,
            history: Vec::new(),
            input,
            output,
        }
    }

    /// Recipe-echo tracing flag, toggled by the `trace` command and read
    /// by the engine before it runs recipe lines.
    pub fn trace_enabled(&self) -> bool {
        self.tracing
    }

    pub fn set_trace(&mut self, on: bool) {
        self.tracing = on;
    }

    pub fn breakpoints(&self) -> &BreakpointSet {
        &self.breakpoints
    }

    /// Pre-arm a breakpoint before the build starts (`--break` flag).
    pub fn arm_breakpoint(&mut self, target: &str, mask: BreakMask) {
        self.breakpoints.set(target, mask);
    }

    /// Force a halt at the first stop point the engine offers.
    pub fn stop_at_first_offer(&mut self) {
        self.stepping.step(1);
    }

    /// Engine entry point: offer a potential stop. Decides, from the
    /// stepping state, the breakpoint registry and the error indicator,
    /// whether to pass straight through or to halt and run the read loop.
    pub fn offer_stop(
        &mut self,
        host: &mut dyn BuildHost,
        arena: &FrameArena,
        top: Option<FrameId>,
        target: &str,
        kind: StopKind,
        error: Option<HostError>,
    ) -> ControlSignal {
        let armed = self.breakpoints.is_armed(target, kind);
        if self.stepping.check_offer(armed, error.is_some()) == OfferDecision::PassThrough {
            return ControlSignal::Resume;
        }
        debug!(stop_target = target, ?kind, armed, ?error, "halting at stop point");
        self.run_session(host, arena, top, target, error)
    }

    /// The read-dispatch loop, entered once the halt decision is made.
    fn run_session(
        &mut self,
        host: &mut dyn BuildHost,
        arena: &FrameArena,
        top: Option<FrameId>,
        target: &str,
        error: Option<HostError>,
    ) -> ControlSignal {
        let mut view = StackView::new(arena, top);
        let banner_target = view
            .top_frame()
            .map(|frame| frame.target.clone())
            .unwrap_or_else(|| target.to_string());

        let fatal_code = match error {
            Some(HostError::Recoverable) => {
                say!(
                    self.output,
                    "\n*** Entering debugger because we encountered an error."
                );
                None
            }
            Some(HostError::Fatal(code)) => {
                say!(
                    self.output,
                    "\n*** Entering debugger because we encountered a fatal error."
                );
                say!(
                    self.output,
                    "*** Exiting the debugger will exit the build with exit code {code}."
                );
                Some(code)
            }
            None => None,
        };

        loop {
            match view.current() {
                Some(frame) => {
                    say!(self.output);
                    say!(self.output, "{}: {}", frame.loc, frame.target);
                }
                None => {
                    say!(self.output);
                    say!(self.output, "{banner_target}");
                }
            }

            let _ = write!(self.output, "builddb<{}> ", self.history.len());
            let _ = self.output.flush();

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                // End of input: fall through like a resume so piped and
                // unattended sessions do not wedge.
                Ok(0) | Err(_) => {
                    say!(self.output);
                    return ControlSignal::Resume;
                }
                Ok(_) => {}
            }

            let line = line.trim();
            if line.is_empty() {
                // Implicit single step.
                self.stepping.step(1);
                return ControlSignal::Resume;
            }

            self.history.push(line.to_string());
            match self.dispatch(host, &mut view, fatal_code, line) {
                CommandResult::KeepReading
                | CommandResult::ReEnter
                | CommandResult::CommandError => continue,
                CommandResult::Resume => return ControlSignal::Resume,
                CommandResult::SkipNext => return ControlSignal::SkipNext,
                CommandResult::Restart => return ControlSignal::Restart,
                CommandResult::Terminate(code) => return ControlSignal::Terminate(code),
            }
        }
    }

    fn dispatch(
        &mut self,
        host: &mut dyn BuildHost,
        view: &mut StackView<'_>,
        fatal_code: Option<i32>,
        line: &str,
    ) -> CommandResult {
        let (word, rest) = split_command(line);
        let Some(spec) = lookup(word) else {
            say!(self.output, "No such debugger command: {word}.");
            return CommandResult::KeepReading;
        };
        debug!(command = ?spec.kind, args = rest, "dispatch");
        match spec.kind {
            CommandKind::Break => self.cmd_break(host, view, rest),
            CommandKind::Delete => self.cmd_delete(host, rest),
            CommandKind::Continue => {
                self.stepping.run_free();
                CommandResult::Resume
            }
            CommandKind::Step => self.cmd_step(rest),
            CommandKind::Skip => {
                self.stepping.skip_next();
                CommandResult::SkipNext
            }
            CommandKind::Up => self.cmd_move(view, rest, 1),
            CommandKind::Down => self.cmd_move(view, rest, -1),
            CommandKind::Frame => self.cmd_frame(view, rest),
            CommandKind::Where => self.cmd_where(view),
            CommandKind::Print => self.cmd_print(host, rest),
            CommandKind::Examine => self.cmd_examine(host, rest),
            CommandKind::SetExpand => self.cmd_set(host, rest, true),
            CommandKind::SetLiteral => self.cmd_set(host, rest, false),
            CommandKind::Info => self.cmd_info(view, rest),
            CommandKind::Trace => self.cmd_trace(rest),
            CommandKind::Shell => self.cmd_shell(host, rest),
            CommandKind::Restart => {
                say!(
                    self.output,
                    "Restart requested; the build process will re-launch from its original directory."
                );
                CommandResult::Restart
            }
            CommandKind::Help => self.cmd_help(rest),
            CommandKind::Quit => self.cmd_quit(rest, fatal_code),
        }
    }

    fn cmd_break(
        &mut self,
        host: &mut dyn BuildHost,
        view: &StackView<'_>,
        rest: &str,
    ) -> CommandResult {
        if rest.is_empty() {
            if self.breakpoints.is_empty() {
                say!(self.output, "No breakpoints set.");
            } else {
                say!(self.output, "Breakpoints:");
                let lines: Vec<String> = self
                    .breakpoints
                    .list()
                    .map(|(target, mask)| format!("  {target} [{mask}]"))
                    .collect();
                for line in lines {
                    say!(self.output, "{line}");
                }
            }
            return CommandResult::KeepReading;
        }

        let Some(words) = shlex::split(rest) else {
            say!(self.output, "Can't parse arguments: {rest}");
            return CommandResult::CommandError;
        };
        let Some((first, kind_words)) = words.split_first() else {
            self.usage(CommandKind::Break);
            return CommandResult::CommandError;
        };

        let target = if let Ok(line_no) = first.parse::<u32>() {
            let Some(frame) = view.current() else {
                say!(
                    self.output,
                    "No frame selected; can't resolve line {line_no}."
                );
                return CommandResult::CommandError;
            };
            match host.target_for_line(&frame.loc.file, line_no) {
                Some(target) => target,
                None => {
                    say!(
                        self.output,
                        "Can't find a target on line {line_no}; breakpoint not set."
                    );
                    return CommandResult::CommandError;
                }
            }
        } else {
            match host.resolve_target(first) {
                Some(target) => target,
                None => {
                    say!(
                        self.output,
                        "Can't find target {first}; breakpoint not set."
                    );
                    return CommandResult::CommandError;
                }
            }
        };

        // Parse every keyword before touching the registry.
        let mut mask = BreakMask::NONE;
        for word in kind_words {
            match parse_break_keyword(word) {
                Some(bits) => mask |= bits,
                None => {
                    say!(
                        self.output,
                        "Unknown stopping point '{word}'; expecting all, run, prereq or end."
                    );
                    return CommandResult::CommandError;
                }
            }
        }
        if mask.is_empty() {
            mask = BreakMask::ALL;
        }

        match self.breakpoints.set(&target, mask) {
            SetOutcome::Added => {
                say!(self.output, "Breakpoint on target {target} set [{mask}].");
            }
            SetOutcome::AlreadySet => {
                say!(
                    self.output,
                    "Breakpoint already set at target {target}; nothing done."
                );
            }
        }
        CommandResult::ReEnter
    }

    fn cmd_delete(&mut self, host: &mut dyn BuildHost, rest: &str) -> CommandResult {
        let Some(name) = rest.split_whitespace().next() else {
            self.usage(CommandKind::Delete);
            return CommandResult::CommandError;
        };
        let Some(target) = host.resolve_target(name) else {
            say!(
                self.output,
                "Can't find target {name}; breakpoint not cleared."
            );
            return CommandResult::CommandError;
        };
        if self.breakpoints.clear(&target) {
            say!(self.output, "Breakpoint on target {target} cleared.");
        } else {
            say!(
                self.output,
                "No breakpoint at target {target}; nothing cleared."
            );
        }
        CommandResult::ReEnter
    }

    fn cmd_step(&mut self, rest: &str) -> CommandResult {
        let count = match parse_count(rest) {
            Ok(count) => count,
            Err(word) => {
                say!(self.output, "expecting {word} to be an integer");
                return CommandResult::CommandError;
            }
        };
        self.stepping.step(count);
        CommandResult::Resume
    }

    fn cmd_move(&mut self, view: &mut StackView<'_>, rest: &str, sign: i64) -> CommandResult {
        let count = match parse_count(rest) {
            Ok(count) => count,
            Err(word) => {
                say!(self.output, "expecting {word} to be an integer");
                return CommandResult::CommandError;
            }
        };
        match view.move_relative(sign * i64::from(count)) {
            Ok(()) => {
                self.report_focus(view);
                CommandResult::KeepReading
            }
            Err(err) => {
                say!(self.output, "{err}");
                CommandResult::CommandError
            }
        }
    }

    fn cmd_frame(&mut self, view: &mut StackView<'_>, rest: &str) -> CommandResult {
        let Some(word) = rest.split_whitespace().next() else {
            self.usage(CommandKind::Frame);
            return CommandResult::CommandError;
        };
        let Ok(index) = word.parse::<usize>() else {
            say!(self.output, "expecting {word} to be an integer");
            return CommandResult::CommandError;
        };
        match view.move_absolute(index) {
            Ok(()) => {
                self.report_focus(view);
                CommandResult::KeepReading
            }
            Err(err) => {
                say!(self.output, "{err}");
                CommandResult::CommandError
            }
        }
    }

    fn report_focus(&mut self, view: &StackView<'_>) {
        if let Some(frame) = view.current() {
            let index = view.focus_index();
            say!(self.output, "#{index}  {} at {}", frame.target, frame.loc);
        }
    }

    fn cmd_where(&mut self, view: &StackView<'_>) -> CommandResult {
        let focus = view.focus_index();
        let lines: Vec<String> = view
            .chain()
            .enumerate()
            .map(|(i, frame)| {
                let marker = if i == focus { "=>" } else { "  " };
                format!("{marker} #{i}  {} at {}", frame.target, frame.loc)
            })
            .collect();
        if lines.is_empty() {
            say!(self.output, "No target call stack.");
        } else {
            for line in lines {
                say!(self.output, "{line}");
            }
        }
        CommandResult::KeepReading
    }

    fn cmd_print(&mut self, host: &mut dyn BuildHost, rest: &str) -> CommandResult {
        let Some(name) = rest.split_whitespace().next() else {
            say!(self.output, "need to supply a variable or target name");
            return CommandResult::CommandError;
        };
        if let Some(target) = host.resolve_target(name) {
            if let Some(description) = host.describe_target(&target) {
                say!(self.output, "{description}");
                return CommandResult::KeepReading;
            }
        }
        match host.lookup_variable(name) {
            Some(value) => say!(self.output, "{name} = {value}"),
            None => say!(self.output, "Can't find variable {name}"),
        }
        CommandResult::KeepReading
    }

    fn cmd_examine(&mut self, host: &mut dyn BuildHost, rest: &str) -> CommandResult {
        if rest.is_empty() {
            say!(self.output, "need to supply a string to examine");
            return CommandResult::CommandError;
        }
        let expanded = host.expand(rest);
        say!(self.output, "{expanded}");
        CommandResult::KeepReading
    }

    fn cmd_set(&mut self, host: &mut dyn BuildHost, rest: &str, expand: bool) -> CommandResult {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = match parts.next() {
            Some(name) if !name.is_empty() => name,
            _ => {
                say!(self.output, "need to supply a variable name");
                return CommandResult::CommandError;
            }
        };
        let raw = parts.next().unwrap_or("").trim();
        let value = if expand {
            host.expand(raw)
        } else {
            raw.to_string()
        };
        host.assign_variable(name, &value);
        say!(self.output, "Variable {name} now has value '{value}'");
        CommandResult::KeepReading
    }

    fn cmd_info(&mut self, view: &StackView<'_>, rest: &str) -> CommandResult {
        let Some(word) = rest.split_whitespace().next() else {
            self.info_target(view);
            self.info_trace();
            return CommandResult::KeepReading;
        };
        match resolve_info_subject(word) {
            InfoSubject::Target => self.info_target(view),
            InfoSubject::Trace => self.info_trace(),
            InfoSubject::Ambiguous => {
                say!(
                    self.output,
                    "Ambiguous info subject '{word}': target or trace."
                );
                return CommandResult::CommandError;
            }
            InfoSubject::Unknown => {
                say!(self.output, "Don't know how to show {word}");
                return CommandResult::CommandError;
            }
        }
        CommandResult::KeepReading
    }

    fn info_target(&mut self, view: &StackView<'_>) {
        match view.top_frame() {
            Some(frame) => say!(self.output, "target: {}", frame.target),
            None => say!(self.output, "target unknown"),
        }
    }

    fn info_trace(&mut self) {
        let state = if self.tracing { "on" } else { "off" };
        say!(self.output, "trace: {state}");
    }

    fn cmd_trace(&mut self, rest: &str) -> CommandResult {
        let word = rest.split_whitespace().next().unwrap_or("toggle");
        match word {
            "on" => self.tracing = true,
            "off" => self.tracing = false,
            "toggle" => self.tracing = !self.tracing,
            other => {
                say!(
                    self.output,
                    "expecting \"on\", \"off\", or \"toggle\"; got {other}"
                );
                return CommandResult::CommandError;
            }
        }
        self.info_trace();
        CommandResult::KeepReading
    }

    fn cmd_shell(&mut self, host: &mut dyn BuildHost, rest: &str) -> CommandResult {
        if rest.is_empty() {
            self.usage(CommandKind::Shell);
            return CommandResult::CommandError;
        }
        match host.run_shell(rest) {
            Ok(0) => {}
            Ok(code) => say!(self.output, "shell command exited with status {code}"),
            Err(err) => say!(self.output, "shell command failed: {err}"),
        }
        CommandResult::KeepReading
    }

    fn cmd_help(&mut self, rest: &str) -> CommandResult {
        let Some(word) = rest.split_whitespace().next() else {
            say!(self.output, "Available commands are:");
            for spec in COMMANDS {
                let keys: String = spec
                    .keys
                    .iter()
                    .map(|key| key.to_string())
                    .collect::<Vec<_>>()
                    .join("/");
                say!(self.output, "  {:<44} ({keys})", spec.usage);
                for line in spec.doc.lines() {
                    say!(self.output, "      {}", line.trim_start());
                }
                say!(self.output);
            }
            return CommandResult::KeepReading;
        };
        match lookup(word) {
            Some(spec) => {
                say!(self.output, "  {}:", spec.usage);
                for line in spec.doc.lines() {
                    say!(self.output, "      {}", line.trim_start());
                }
            }
            None => {
                say!(
                    self.output,
                    "Undefined command: \"{word}\". Try \"help\" for a list of commands."
                );
            }
        }
        CommandResult::KeepReading
    }

    fn cmd_quit(&mut self, rest: &str, fatal_code: Option<i32>) -> CommandResult {
        match rest.split_whitespace().next() {
            None => CommandResult::Terminate(fatal_code.unwrap_or(0)),
            Some(word) => match word.parse::<i32>() {
                Ok(code) => CommandResult::Terminate(code),
                Err(_) => {
                    say!(self.output, "expecting {word} to be an integer");
                    CommandResult::CommandError
                }
            },
        }
    }

    fn usage(&mut self, kind: CommandKind) {
        let spec = spec_of(kind);
        say!(self.output, "usage: {}", spec.usage);
    }
}

/// Split a line into the command word and the untouched argument tail.
fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(at) => (&line[..at], line[at..].trim_start()),
        None => (line, ""),
    }
}

/// Optional count argument: defaults to 1, zero counts as one.
fn parse_count(rest: &str) -> Result<u32, &str> {
    match rest.split_whitespace().next() {
        None => Ok(1),
        Some(word) => match word.parse::<u32>() {
            Ok(0) => Ok(1),
            Ok(count) => Ok(count),
            Err(_) => Err(word),
        },
    }
}

enum InfoSubject {
    Target,
    Trace,
    Ambiguous,
    Unknown,
}

fn resolve_info_subject(word: &str) -> InfoSubject {
    let lower = word.to_ascii_lowercase();
    let target = "target".starts_with(&lower);
    let trace = "trace".starts_with(&lower);
    match (target, trace) {
        (true, true) => InfoSubject::Ambiguous,
        (true, false) => InfoSubject::Target,
        (false, true) => InfoSubject::Trace,
        (false, false) => InfoSubject::Unknown,
    }
}
