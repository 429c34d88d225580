mod driver;
mod graph;
mod parse;

pub use driver::{BuildError, BuildOutcome, Driver};
pub use graph::{BuildGraph, Target};
pub use parse::{parse_buildfile, ParseError};
