use std::io;

/// Signal returned to the build engine from a stop-point offer. This is
/// the only value that crosses back over the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Keep building.
    Resume,
    /// Bypass the next recipe action entirely, then keep building.
    SkipNext,
    /// The embedding process must shut down and re-launch itself with its
    /// original arguments from its original working directory.
    Restart,
    /// The embedding process must exit immediately with this code.
    Terminate(i32),
}

/// Error classification the engine carries into a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    Recoverable,
    /// Quitting the debugger propagates the carried exit code.
    Fatal(i32),
}

/// Seam between the debugger and the build engine it inspects.
///
/// Everything the session needs from the engine sits behind this trait:
/// target resolution and pretty-printing, the variable engine, and the
/// shell escape. The debugger holds it only for the duration of one
/// stop-point offer.
pub trait BuildHost {
    /// Resolve a target name against the build graph, returning its
    /// canonical name.
    fn resolve_target(&self, name: &str) -> Option<String>;

    /// Target whose rule sits at `line` of `file`; used when `break` is
    /// given a line number instead of a name.
    fn target_for_line(&self, file: &str, line: u32) -> Option<String>;

    /// Pretty-printed properties of a target for `print`.
    fn describe_target(&self, name: &str) -> Option<String>;

    fn lookup_variable(&self, name: &str) -> Option<String>;

    /// Expand variable references inside `text`.
    fn expand(&self, text: &str) -> String;

    /// Assign a variable, creating it when missing.
    fn assign_variable(&mut self, name: &str, value: &str);

    /// Run one line as a shell command, returning its exit status.
    fn run_shell(&mut self, command: &str) -> io::Result<i32>;
}
