mod breakpoints;
mod commands;
mod frames;
mod host;
mod session;
mod stepping;

pub use breakpoints::{parse_break_keyword, BreakMask, BreakpointSet, SetOutcome, StopKind};
pub use commands::{lookup, spec_of, CommandKind, CommandResult, CommandSpec, COMMANDS};
pub use frames::{Frame, FrameArena, FrameId, FrameRangeError, SourceLoc, StackView};
pub use host::{BuildHost, ControlSignal, HostError};
pub use session::Debugger;
pub use stepping::{OfferDecision, SteppingState};
