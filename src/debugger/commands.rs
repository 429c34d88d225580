/// Every command the session loop understands. The dispatcher matches on
/// this exhaustively; metadata (keys, long names, usage, doc) lives in the
/// static table below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Break,
    Delete,
    Continue,
    Step,
    Skip,
    Up,
    Down,
    Frame,
    Where,
    Print,
    Examine,
    SetExpand,
    SetLiteral,
    Info,
    Trace,
    Shell,
    Restart,
    Help,
    Quit,
}

/// What a dispatched command tells the session loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Stay in the loop and re-prompt.
    KeepReading,
    /// Re-render the stop-point banner, then re-prompt.
    ReEnter,
    /// Malformed arguments; stay in the loop.
    CommandError,
    /// Hand control back to the engine.
    Resume,
    /// Hand control back, suppressing the next recipe action.
    SkipNext,
    /// Hand control back; the embedding process re-launches itself.
    Restart,
    /// The process must exit with this code.
    Terminate(i32),
}

pub struct CommandSpec {
    pub kind: CommandKind,
    pub keys: &'static [char],
    pub long_names: &'static [&'static str],
    pub usage: &'static str,
    pub doc: &'static str,
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::Break,
        keys: &['b'],
        long_names: &["break"],
        usage: "break [TARGET|LINENUM] [all|run|prereq|end]*",
        doc: "Set a breakpoint at a target.\n\
              With a target name or a line number, set a break before running\n\
              that target. Without argument, list all breakpoints.\n\
              A final option names the stopping points to arm: before\n\
              prerequisite checking (prereq), before running the recipe (run),\n\
              or after the target is complete (end). Default is all three.",
    },
    CommandSpec {
        kind: CommandKind::Delete,
        keys: &['d'],
        long_names: &["delete"],
        usage: "delete TARGET",
        doc: "Delete a target breakpoint.",
    },
    CommandSpec {
        kind: CommandKind::Continue,
        keys: &['c'],
        long_names: &["continue"],
        usage: "continue",
        doc: "Continue the build until another breakpoint or error.",
    },
    CommandSpec {
        kind: CommandKind::Step,
        keys: &['s', 'n'],
        long_names: &["step", "next"],
        usage: "step [AMOUNT]",
        doc: "Step execution until another stopping point is reached.\n\
              An argument N means do this N times or until there is another\n\
              reason to stop. \"next\" is an alias.",
    },
    CommandSpec {
        kind: CommandKind::Skip,
        keys: &['k'],
        long_names: &["skip"],
        usage: "skip",
        doc: "Skip execution of the next recipe action.",
    },
    CommandSpec {
        kind: CommandKind::Up,
        keys: &['u'],
        long_names: &["up"],
        usage: "up [AMOUNT]",
        doc: "Select and print the target that caused this one to be examined.\n\
              An argument says how many targets up to go.",
    },
    CommandSpec {
        kind: CommandKind::Down,
        keys: &['D'],
        long_names: &["down"],
        usage: "down [AMOUNT]",
        doc: "Select and print the target this one caused to be examined.\n\
              An argument says how many targets down to go.",
    },
    CommandSpec {
        kind: CommandKind::Frame,
        keys: &['f'],
        long_names: &["frame"],
        usage: "frame N",
        doc: "Move the selected frame to absolute position N.\n\
              In contrast to \"up\" or \"down\" this sets an absolute\n\
              position; 0 is the top.",
    },
    CommandSpec {
        kind: CommandKind::Where,
        keys: &['T'],
        long_names: &["where"],
        usage: "where",
        doc: "Print the target call stack, marking the selected frame.",
    },
    CommandSpec {
        kind: CommandKind::Print,
        keys: &['p'],
        long_names: &["print"],
        usage: "print {VARIABLE|TARGET}",
        doc: "Show a variable definition or information about a target.\n\
              If a variable name is given, its value is shown without\n\
              expanding variable references; see also \"examine\".\n\
              If a target name is given, information about the target is\n\
              printed.",
    },
    CommandSpec {
        kind: CommandKind::Examine,
        keys: &['x'],
        long_names: &["examine"],
        usage: "examine STRING",
        doc: "Show a string with variable references expanded. See also\n\
              \"print\".",
    },
    CommandSpec {
        kind: CommandKind::SetExpand,
        keys: &['='],
        long_names: &["set"],
        usage: "set VARIABLE VALUE",
        doc: "Set a build variable. Variable references inside VALUE are\n\
              expanded before the assignment occurs.",
    },
    CommandSpec {
        kind: CommandKind::SetLiteral,
        keys: &['"'],
        long_names: &["setq"],
        usage: "setq VARIABLE VALUE",
        doc: "Set a build variable. Variable references inside VALUE are\n\
              not expanded before the assignment occurs.",
    },
    CommandSpec {
        kind: CommandKind::Info,
        keys: &['i'],
        long_names: &["info", "show"],
        usage: "info [target|trace]",
        doc: "Show the state of a thing. With no argument, show everything\n\
              there is to show.",
    },
    CommandSpec {
        kind: CommandKind::Trace,
        keys: &['t'],
        long_names: &["trace"],
        usage: "trace [on|off|toggle]",
        doc: "Set or toggle recipe-echo tracing. With no argument the value\n\
              is toggled.",
    },
    CommandSpec {
        kind: CommandKind::Shell,
        keys: &['!'],
        long_names: &["shell"],
        usage: "shell STRING",
        doc: "Execute the rest of the line as a shell command.",
    },
    CommandSpec {
        kind: CommandKind::Restart,
        keys: &['R'],
        long_names: &["restart"],
        usage: "restart",
        doc: "Restart the build process. The process re-launches itself with\n\
              its original arguments from its original working directory.",
    },
    CommandSpec {
        kind: CommandKind::Help,
        keys: &['h', '?'],
        long_names: &["help"],
        usage: "help [COMMAND]",
        doc: "Display the list of commands. With a command name, give only\n\
              the help for that command.",
    },
    CommandSpec {
        kind: CommandKind::Quit,
        keys: &['q', 'Q'],
        long_names: &["quit", "exit"],
        usage: "quit [EXIT-STATUS]",
        doc: "Exit the debugger and the build. A numeric argument becomes the\n\
              exit status reported back; otherwise exit with status 0, or\n\
              with the carried code when stopped on a fatal error.",
    },
];

/// Look a token up as a command: exact single-character key when the token
/// has length 1, otherwise exact long-name match.
pub fn lookup(word: &str) -> Option<&'static CommandSpec> {
    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return COMMANDS.iter().find(|spec| spec.keys.contains(&c));
    }
    COMMANDS
        .iter()
        .find(|spec| spec.long_names.contains(&word))
}

pub fn spec_of(kind: CommandKind) -> &'static CommandSpec {
    COMMANDS
        .iter()
        .find(|spec| spec.kind == kind)
        .expect("every command kind has a table entry")
}
