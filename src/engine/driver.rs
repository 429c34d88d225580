use std::io;

use thiserror::Error;
use tracing::debug;

use super::graph::BuildGraph;
use crate::debugger::{
    BuildHost, ControlSignal, Debugger, FrameArena, FrameId, HostError, StopKind,
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No rule to build target '{0}'")]
    UnknownTarget(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How the walk ended, for the embedding process to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Finished,
    /// The process should exit with this code (operator quit, or a recipe
    /// failed fatally).
    Terminated(i32),
    /// The process should re-launch itself with its original arguments
    /// from its original working directory.
    RestartRequested,
}

enum Flow {
    Continue,
    Terminate(i32),
    Restart,
}

/// Recursive target walker: the minimal build engine driving the
/// debugger. It offers a stop point before prerequisite checking, before
/// the recipe, and after the target completes, and acts on the control
/// signal each offer returns. No freshness logic: every prerequisite is
/// walked once, every recipe runs.
pub struct Driver {
    graph: BuildGraph,
    debugger: Debugger,
    arena: FrameArena,
    built: Vec<String>,
}

impl Driver {
    pub fn new(graph: BuildGraph, debugger: Debugger) -> Self {
        Self {
            graph,
            debugger,
            arena: FrameArena::new(),
            built: Vec::new(),
        }
    }

    pub fn debugger_mut(&mut self) -> &mut Debugger {
        &mut self.debugger
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    pub fn build(&mut self, goal: &str) -> Result<BuildOutcome, BuildError> {
        match self.walk(goal, None)? {
            Flow::Continue => Ok(BuildOutcome::Finished),
            Flow::Terminate(code) => Ok(BuildOutcome::Terminated(code)),
            Flow::Restart => Ok(BuildOutcome::RestartRequested),
        }
    }

    fn walk(&mut self, name: &str, parent: Option<FrameId>) -> Result<Flow, BuildError> {
        if self.built.iter().any(|done| done == name) {
            return Ok(Flow::Continue);
        }
        if self.in_progress(parent, name) {
            eprintln!("Circular dependency on {name} dropped.");
            return Ok(Flow::Continue);
        }
        let target = self
            .graph
            .target(name)
            .ok_or_else(|| BuildError::UnknownTarget(name.to_string()))?
            .clone();
        let frame = self.arena.push(name, target.loc.clone(), parent);
        debug!(rule = name, "entering target");

        let mut skip_recipe = false;
        match self.offer(frame, name, StopKind::Prereq, None) {
            ControlSignal::Resume => {}
            ControlSignal::SkipNext => skip_recipe = true,
            ControlSignal::Terminate(code) => return Ok(Flow::Terminate(code)),
            ControlSignal::Restart => return Ok(Flow::Restart),
        }

        for prereq in &target.prereqs {
            match self.walk(prereq, Some(frame))? {
                Flow::Continue => {}
                other => return Ok(other),
            }
        }

        match self.offer(frame, name, StopKind::Run, None) {
            ControlSignal::Resume => {}
            ControlSignal::SkipNext => skip_recipe = true,
            ControlSignal::Terminate(code) => return Ok(Flow::Terminate(code)),
            ControlSignal::Restart => return Ok(Flow::Restart),
        }

        if !skip_recipe {
            for line in &target.recipe {
                let command = self.graph.expand(line);
                if self.debugger.trace_enabled() {
                    eprintln!("{}: {command}", target.loc);
                }
                let status = self.graph.run_shell(&command)?;
                if status != 0 {
                    eprintln!("*** [{name}] Error {status}");
                    return Ok(match self.offer(
                        frame,
                        name,
                        StopKind::Run,
                        Some(HostError::Fatal(2)),
                    ) {
                        ControlSignal::Terminate(code) => Flow::Terminate(code),
                        ControlSignal::Restart => Flow::Restart,
                        // A failed recipe still stops the build.
                        ControlSignal::Resume | ControlSignal::SkipNext => Flow::Terminate(2),
                    });
                }
            }
        }

        match self.offer(frame, name, StopKind::End, None) {
            ControlSignal::Resume | ControlSignal::SkipNext => {}
            ControlSignal::Terminate(code) => return Ok(Flow::Terminate(code)),
            ControlSignal::Restart => return Ok(Flow::Restart),
        }

        self.built.push(name.to_string());
        Ok(Flow::Continue)
    }

    fn offer(
        &mut self,
        top: FrameId,
        target: &str,
        kind: StopKind,
        error: Option<HostError>,
    ) -> ControlSignal {
        self.debugger
            .offer_stop(&mut self.graph, &self.arena, Some(top), target, kind, error)
    }

    fn in_progress(&self, mut cursor: Option<FrameId>, name: &str) -> bool {
        while let Some(id) = cursor {
            let frame = self.arena.get(id);
            if frame.target == name {
                return true;
            }
            cursor = frame.parent;
        }
        false
    }
}
