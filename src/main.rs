use std::path::PathBuf;
use std::process::{self, Command};
use std::{env, fs};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use build_debugger::debugger::{BreakMask, Debugger};
use build_debugger::engine::{parse_buildfile, BuildOutcome, Driver};

/// Interactive debugger for buildfile execution.
#[derive(Parser)]
#[command(name = "build-debugger", version)]
struct Args {
    /// Buildfile to run
    #[arg(short = 'f', long = "file", default_value = "Buildfile")]
    file: PathBuf,

    /// Goal target; defaults to the first target in the file
    goal: Option<String>,

    /// Arm a breakpoint on a target before the build starts (repeatable)
    #[arg(short = 'b', long = "break", value_name = "TARGET")]
    breakpoints: Vec<String>,

    /// Start with recipe-echo tracing on
    #[arg(short, long)]
    trace: bool,

    /// Stop at the first stop point instead of running to a breakpoint
    #[arg(short, long)]
    stop: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Recorded up front so a restart can re-launch faithfully even if a
    // recipe changes the working directory later.
    let argv: Vec<String> = env::args().collect();
    let cwd = env::current_dir().context("can't determine working directory")?;

    match run(&args)? {
        BuildOutcome::Finished => Ok(()),
        BuildOutcome::Terminated(code) => process::exit(code),
        BuildOutcome::RestartRequested => {
            eprintln!("Changing directory to {} and restarting...", cwd.display());
            let program = argv.first().map(String::as_str).unwrap_or("build-debugger");
            let status = Command::new(program)
                .args(&argv[1..])
                .current_dir(&cwd)
                .status()
                .with_context(|| format!("can't re-launch {program}"))?;
            process::exit(status.code().unwrap_or(0));
        }
    }
}

fn run(args: &Args) -> anyhow::Result<BuildOutcome> {
    let file = args.file.display().to_string();
    let text = fs::read_to_string(&args.file).with_context(|| format!("can't read {file}"))?;
    let graph = parse_buildfile(&file, &text)?;

    let goal = match &args.goal {
        Some(goal) => goal.clone(),
        None => graph
            .first_target()
            .context("buildfile defines no targets")?
            .to_string(),
    };

    let mut debugger = Debugger::stdio();
    debugger.set_trace(args.trace);
    for target in &args.breakpoints {
        debugger.arm_breakpoint(target, BreakMask::ALL);
    }
    if args.stop {
        debugger.stop_at_first_offer();
    }

    let mut driver = Driver::new(graph, debugger);
    Ok(driver.build(&goal)?)
}
