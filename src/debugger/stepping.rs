/// Stepping state for the debugger: how many stop-point offers to pass
/// silently before handing control back to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SteppingState {
    /// No forced stop; only breakpoints and errors halt.
    #[default]
    Free,
    /// Halt on the nth eligible offer, decrementing on each one passed.
    CountDown(u32),
    /// The next recipe action is suppressed; control returns right after.
    SkipNext,
}

/// Verdict for one stop-point offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDecision {
    PassThrough,
    Halt,
}

impl SteppingState {
    /// `continue`: run until a breakpoint or error.
    pub fn run_free(&mut self) {
        *self = SteppingState::Free;
    }

    /// `step [n]` / `next [n]`: halt on the nth offer. Zero counts as one.
    pub fn step(&mut self, count: u32) {
        *self = SteppingState::CountDown(count.max(1));
    }

    /// `skip`: suppress the next recipe action.
    pub fn skip_next(&mut self) {
        *self = SteppingState::SkipNext;
    }

    /// Decide halt-vs-pass for a stop-point offer, consuming the state as
    /// needed. `armed` is whether the offered target itself carries a
    /// breakpoint for the offered kind; `errored` is whether the engine is
    /// entering because of an error.
    pub fn check_offer(&mut self, armed: bool, errored: bool) -> OfferDecision {
        match *self {
            SteppingState::CountDown(n) if n > 1 => {
                if armed || errored {
                    *self = SteppingState::Free;
                    OfferDecision::Halt
                } else {
                    *self = SteppingState::CountDown(n - 1);
                    OfferDecision::PassThrough
                }
            }
            SteppingState::CountDown(_) => {
                *self = SteppingState::Free;
                OfferDecision::Halt
            }
            // The skipped action is behind us once the engine offers again.
            SteppingState::SkipNext => {
                *self = SteppingState::Free;
                OfferDecision::Halt
            }
            SteppingState::Free => {
                if armed || errored {
                    OfferDecision::Halt
                } else {
                    OfferDecision::PassThrough
                }
            }
        }
    }
}
