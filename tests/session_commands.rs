use std::collections::HashMap;
use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use build_debugger::debugger::{
    BuildHost, ControlSignal, Debugger, FrameArena, FrameId, HostError, SourceLoc, StopKind,
};

/// Clonable writer so a test can keep reading what the session printed.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory stand-in for the build engine side of the seam.
#[derive(Default)]
struct MockHost {
    targets: Vec<String>,
    line_targets: HashMap<u32, String>,
    variables: HashMap<String, String>,
    shell_log: Vec<String>,
}

impl MockHost {
    fn with_targets(names: &[&str]) -> Self {
        Self {
            targets: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl BuildHost for MockHost {
    fn resolve_target(&self, name: &str) -> Option<String> {
        self.targets
            .iter()
            .find(|t| t.as_str() == name)
            .cloned()
    }

    fn target_for_line(&self, _file: &str, line: u32) -> Option<String> {
        self.line_targets.get(&line).cloned()
    }

    fn describe_target(&self, name: &str) -> Option<String> {
        self.resolve_target(name)
            .map(|t| format!("{t}: (mock target)"))
    }

    fn lookup_variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }

    fn expand(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (name, value) in &self.variables {
            out = out.replace(&format!("$({name})"), value);
        }
        out
    }

    fn assign_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    fn run_shell(&mut self, command: &str) -> io::Result<i32> {
        self.shell_log.push(command.to_string());
        Ok(0)
    }
}

fn scripted(input: &str) -> (Debugger, Capture) {
    let capture = Capture::default();
    let debugger = Debugger::with_io(
        Box::new(Cursor::new(input.to_string())),
        Box::new(capture.clone()),
    );
    (debugger, capture)
}

/// Chain of frames, oldest first; returns the top (last entered).
fn chain(arena: &mut FrameArena, frames: &[(&str, u32)]) -> Option<FrameId> {
    let mut parent = None;
    for (name, line) in frames {
        parent = Some(arena.push(*name, SourceLoc::new("Buildfile", *line), parent));
    }
    parent
}

fn standard_chain(arena: &mut FrameArena) -> Option<FrameId> {
    chain(arena, &[("all", 2), ("lib", 5), ("lib.o", 9)])
}

#[test]
fn quiet_offer_passes_without_entering_the_loop() {
    let (mut debugger, capture) = scripted("quit 9\n");
    let mut host = MockHost::with_targets(&["all"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("all", 2)]);

    let signal = debugger.offer_stop(&mut host, &arena, top, "all", StopKind::Prereq, None);
    assert_eq!(signal, ControlSignal::Resume);
    assert_eq!(capture.text(), "", "session loop must not run");
}

#[test]
fn break_twice_reports_already_set() {
    let (mut debugger, capture) = scripted("break foo\nbreak foo run\nbreak\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["foo"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("foo", 1)]);

    let signal = debugger.offer_stop(&mut host, &arena, top, "foo", StopKind::Run, None);
    assert_eq!(signal, ControlSignal::Terminate(0));

    let out = capture.text();
    assert!(out.contains("Breakpoint on target foo set [all]."), "{out}");
    assert!(
        out.contains("Breakpoint already set at target foo; nothing done."),
        "{out}"
    );
    // The listing still shows the original mask.
    assert!(out.contains("  foo [all]"), "{out}");
}

#[test]
fn break_delete_list_shows_nothing() {
    let (mut debugger, capture) = scripted("break foo all\ndelete foo\ndelete foo\nbreak\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["foo"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("foo", 1)]);

    debugger.offer_stop(&mut host, &arena, top, "foo", StopKind::Run, None);

    let out = capture.text();
    assert!(out.contains("Breakpoint on target foo cleared."), "{out}");
    assert!(
        out.contains("No breakpoint at target foo; nothing cleared."),
        "{out}"
    );
    assert!(out.contains("No breakpoints set."), "{out}");
}

#[test]
fn unknown_target_reports_and_sets_nothing() {
    let (mut debugger, capture) = scripted("break nosuch\nbreak\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["foo"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("foo", 1)]);

    debugger.offer_stop(&mut host, &arena, top, "foo", StopKind::Run, None);

    let out = capture.text();
    assert!(
        out.contains("Can't find target nosuch; breakpoint not set."),
        "{out}"
    );
    assert!(out.contains("No breakpoints set."), "{out}");
}

#[test]
fn unknown_category_aborts_without_partial_mutation() {
    let (mut debugger, capture) = scripted("break foo run bogus\nbreak\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["foo"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("foo", 1)]);

    debugger.offer_stop(&mut host, &arena, top, "foo", StopKind::Run, None);

    let out = capture.text();
    assert!(out.contains("Unknown stopping point 'bogus'"), "{out}");
    assert!(out.contains("No breakpoints set."), "{out}");
}

#[test]
fn break_accepts_a_line_number() {
    let (mut debugger, capture) = scripted("break 12 prereq\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["lib"]);
    host.line_targets.insert(12, "lib".to_string());
    let mut arena = FrameArena::new();
    let top = standard_chain(&mut arena);

    debugger.offer_stop(&mut host, &arena, top, "lib.o", StopKind::Run, None);

    let out = capture.text();
    assert!(out.contains("Breakpoint on target lib set [prereq]."), "{out}");
}

#[test]
fn unknown_command_keeps_the_loop_alive() {
    let (mut debugger, capture) = scripted("blorp\nquit 3\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["foo"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("foo", 1)]);

    let signal = debugger.offer_stop(&mut host, &arena, top, "foo", StopKind::Run, None);
    assert_eq!(signal, ControlSignal::Terminate(3));
    assert!(capture.text().contains("No such debugger command: blorp."));
}

#[test]
fn step_passes_offers_silently_until_the_count_runs_out() {
    let (mut debugger, capture) = scripted("step 3\ncontinue\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    // First offer halts (forced), operator types "step 3".
    let s1 = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Prereq, None);
    assert_eq!(s1, ControlSignal::Resume);

    // Two offers pass silently, the third halts and reads "continue".
    let before = capture.text().matches("builddb<").count();
    for _ in 0..2 {
        let s = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);
        assert_eq!(s, ControlSignal::Resume);
    }
    assert_eq!(
        capture.text().matches("builddb<").count(),
        before,
        "passed offers must not prompt"
    );

    let s4 = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);
    assert_eq!(s4, ControlSignal::Resume);
    assert!(capture.text().matches("builddb<").count() > before);

    // Countdown consumed: a further quiet offer passes through.
    let s5 = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::End, None);
    assert_eq!(s5, ControlSignal::Resume);
}

#[test]
fn armed_breakpoint_halts_mid_countdown() {
    let (mut debugger, _capture) = scripted("step 10\ncontinue\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a", "b"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    debugger.arm_breakpoint("b", build_debugger::debugger::BreakMask::RUN);

    // "step 10" typed at the first halt.
    debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Prereq, None);
    // Quiet target passes...
    let s = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);
    assert_eq!(s, ControlSignal::Resume);
    // ...but the armed one halts and reads "continue".
    let s = debugger.offer_stop(&mut host, &arena, top, "b", StopKind::Run, None);
    assert_eq!(s, ControlSignal::Resume);
    // Countdown was reset by the halt, so quiet offers now pass.
    let s = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::End, None);
    assert_eq!(s, ControlSignal::Resume);
}

#[test]
fn skip_returns_the_distinct_signal_and_then_resets() {
    let (mut debugger, _capture) = scripted("skip\ncontinue\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    let s1 = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);
    assert_eq!(s1, ControlSignal::SkipNext);

    // The next offer halts once (skip consumed) and reads "continue".
    let s2 = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::End, None);
    assert_eq!(s2, ControlSignal::Resume);
    let s3 = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::End, None);
    assert_eq!(s3, ControlSignal::Resume, "state must be Free again");
}

#[test]
fn empty_line_is_an_implicit_single_step() {
    let (mut debugger, capture) = scripted("\nquit 5\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    let s1 = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Prereq, None);
    assert_eq!(s1, ControlSignal::Resume);
    // The implicit step halts the very next offer.
    let s2 = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);
    assert_eq!(s2, ControlSignal::Terminate(5));
    assert!(capture.text().contains("builddb<"));
}

#[test]
fn end_of_input_falls_through_as_resume() {
    let (mut debugger, _capture) = scripted("");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    let signal = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);
    assert_eq!(signal, ControlSignal::Resume);
}

#[test]
fn frame_navigation_walks_the_chain() {
    let (mut debugger, capture) =
        scripted("where\nup\nup 5\nframe 2\ndown\nD\ndown\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["all", "lib", "lib.o"]);
    let mut arena = FrameArena::new();
    let top = standard_chain(&mut arena);

    debugger.offer_stop(&mut host, &arena, top, "lib.o", StopKind::Run, None);

    let out = capture.text();
    // where: focus marker on the top frame.
    assert!(out.contains("=> #0  lib.o at Buildfile:9"), "{out}");
    assert!(out.contains("   #2  all at Buildfile:2"), "{out}");
    // up
    assert!(out.contains("#1  lib at Buildfile:5"), "{out}");
    // up 5 overshoots: range error naming the highest position.
    assert!(out.contains("2 is the highest position"), "{out}");
    // frame 2
    assert!(out.contains("#2  all at Buildfile:2"), "{out}");
    // down, then D below the top: another range error.
    assert!(out.contains("can't move to frame position -1"), "{out}");
}

#[test]
fn location_prefix_follows_the_focus() {
    let (mut debugger, capture) = scripted("up\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["all", "lib", "lib.o"]);
    let mut arena = FrameArena::new();
    let top = standard_chain(&mut arena);

    debugger.offer_stop(&mut host, &arena, top, "lib.o", StopKind::Run, None);

    let out = capture.text();
    assert!(out.contains("Buildfile:9: lib.o"), "{out}");
    assert!(out.contains("Buildfile:5: lib"), "{out}");
}

#[test]
fn set_print_round_trip() {
    let (mut debugger, capture) = scripted(
        "set GREETING hello\nprint GREETING\nsetq RAW $(GREETING)\nprint RAW\nset BOTH $(GREETING) world\nprint BOTH\nquit\n",
    );
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);

    let out = capture.text();
    assert!(out.contains("Variable GREETING now has value 'hello'"), "{out}");
    assert!(out.contains("GREETING = hello"), "{out}");
    // setq stores the reference literally.
    assert!(out.contains("RAW = $(GREETING)"), "{out}");
    // set expands before assignment.
    assert!(out.contains("BOTH = hello world"), "{out}");
}

#[test]
fn print_prefers_targets_and_examine_expands() {
    let (mut debugger, capture) = scripted("print lib\nprint NOPE\nx $(CC) -c\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["lib"]);
    host.variables.insert("CC".into(), "cc".into());
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("lib", 1)]);

    debugger.offer_stop(&mut host, &arena, top, "lib", StopKind::Run, None);

    let out = capture.text();
    assert!(out.contains("lib: (mock target)"), "{out}");
    assert!(out.contains("Can't find variable NOPE"), "{out}");
    assert!(out.contains("cc -c"), "{out}");
}

#[test]
fn info_and_trace_report_state() {
    let (mut debugger, capture) = scripted("info\ntrace on\ninfo tr\ntrace bogus\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["lib.o"]);
    let mut arena = FrameArena::new();
    let top = standard_chain(&mut arena);

    debugger.offer_stop(&mut host, &arena, top, "lib.o", StopKind::Run, None);
    assert!(debugger.trace_enabled());

    let out = capture.text();
    assert!(out.contains("target: lib.o"), "{out}");
    assert!(out.contains("trace: off"), "{out}");
    assert!(out.contains("trace: on"), "{out}");
    assert!(out.contains("expecting \"on\", \"off\", or \"toggle\""), "{out}");
}

#[test]
fn shell_escape_runs_through_the_host() {
    let (mut debugger, _capture) = scripted("! echo hi there\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);
    assert_eq!(host.shell_log, vec!["echo hi there"]);
}

#[test]
fn help_lists_commands_and_explains_one() {
    let (mut debugger, capture) = scripted("help\nhelp break\n? s\nhelp zzz\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);

    let out = capture.text();
    assert!(out.contains("Available commands are:"), "{out}");
    assert!(out.contains("break [TARGET|LINENUM] [all|run|prereq|end]*"), "{out}");
    assert!(out.contains("step [AMOUNT]"), "{out}");
    assert!(out.contains("Undefined command: \"zzz\""), "{out}");
}

#[test]
fn recoverable_error_banner_names_the_error() {
    let (mut debugger, capture) = scripted("quit\n");
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    let signal = debugger.offer_stop(
        &mut host,
        &arena,
        top,
        "a",
        StopKind::Run,
        Some(HostError::Recoverable),
    );
    assert_eq!(signal, ControlSignal::Terminate(0));
    assert!(capture
        .text()
        .contains("Entering debugger because we encountered an error."));
}

#[test]
fn fatal_error_carries_its_exit_code_into_quit() {
    let (mut debugger, capture) = scripted("quit\n");
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    let signal = debugger.offer_stop(
        &mut host,
        &arena,
        top,
        "a",
        StopKind::Run,
        Some(HostError::Fatal(5)),
    );
    assert_eq!(signal, ControlSignal::Terminate(5));
    let out = capture.text();
    assert!(out.contains("fatal error"), "{out}");
    assert!(out.contains("exit code 5"), "{out}");
}

#[test]
fn explicit_quit_code_wins_over_the_carried_one() {
    let (mut debugger, _capture) = scripted("quit 7\n");
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    let signal = debugger.offer_stop(
        &mut host,
        &arena,
        top,
        "a",
        StopKind::Run,
        Some(HostError::Fatal(5)),
    );
    assert_eq!(signal, ControlSignal::Terminate(7));
}

#[test]
fn restart_yields_the_restart_signal() {
    let (mut debugger, capture) = scripted("R\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["a"]);
    let mut arena = FrameArena::new();
    let top = chain(&mut arena, &[("a", 1)]);

    let signal = debugger.offer_stop(&mut host, &arena, top, "a", StopKind::Run, None);
    assert_eq!(signal, ControlSignal::Restart);
    assert!(capture.text().contains("Restart requested"));
}

#[test]
fn empty_chain_banners_the_supplied_target() {
    let (mut debugger, capture) = scripted("where\nquit\n");
    debugger.stop_at_first_offer();
    let mut host = MockHost::with_targets(&["orphan"]);
    let arena = FrameArena::new();

    debugger.offer_stop(&mut host, &arena, None, "orphan", StopKind::Run, None);

    let out = capture.text();
    assert!(out.contains("orphan"), "{out}");
    assert!(out.contains("No target call stack."), "{out}");
}
