use std::fmt;

use thiserror::Error;

/// File + line a target's rule is being evaluated at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Index of a frame inside a `FrameArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(usize);

/// One activation of a target evaluation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub target: String,
    pub loc: SourceLoc,
    pub parent: Option<FrameId>,
}

/// Append-only arena holding every frame the engine has entered.
///
/// The active chain at a stop point is the parent-linked path from the
/// supplied top id back to the root; discarded chains simply stop being
/// referenced, so no id ever dangles.
#[derive(Debug, Default)]
pub struct FrameArena {
    frames: Vec<Frame>,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        target: impl Into<String>,
        loc: SourceLoc,
        parent: Option<FrameId>,
    ) -> FrameId {
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            target: target.into(),
            loc,
            parent,
        });
        id
    }

    pub fn get(&self, id: FrameId) -> &Frame {
        &self.frames[id.0]
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Raised when a frame-navigation command would leave the active chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("can't move to frame position {attempted}; {max} is the highest position")]
pub struct FrameRangeError {
    pub attempted: i64,
    pub max: usize,
}

/// Snapshot of the active chain plus the operator's focus cursor.
///
/// Position 0 is the top (most recently entered frame); `up` grows the
/// index toward the root caller, `down` shrinks it. The same numbering is
/// used by `frame` and by the `where` listing.
pub struct StackView<'a> {
    arena: &'a FrameArena,
    top: Option<FrameId>,
    focus: Option<FrameId>,
    focus_index: usize,
}

impl<'a> StackView<'a> {
    /// Install a new active chain with focus at the top.
    pub fn new(arena: &'a FrameArena, top: Option<FrameId>) -> Self {
        Self {
            arena,
            top,
            focus: top,
            focus_index: 0,
        }
    }

    pub fn focus_index(&self) -> usize {
        self.focus_index
    }

    /// Frame the operator is currently examining, if any chain is active.
    pub fn current(&self) -> Option<&'a Frame> {
        self.focus.map(|id| self.arena.get(id))
    }

    /// Frame at the top of the real chain, regardless of focus.
    pub fn top_frame(&self) -> Option<&'a Frame> {
        self.top.map(|id| self.arena.get(id))
    }

    /// Move focus by `delta` positions: positive toward the root caller
    /// ("up"), negative toward the executing leaf ("down"). On failure the
    /// focus is left where it was.
    pub fn move_relative(&mut self, delta: i64) -> Result<(), FrameRangeError> {
        let attempted = self.focus_index as i64 + delta;
        if attempted < 0 {
            return Err(FrameRangeError {
                attempted,
                max: self.highest_reachable(),
            });
        }
        self.move_absolute(attempted as usize)
    }

    /// Set focus to an absolute position, counted from the top.
    pub fn move_absolute(&mut self, index: usize) -> Result<(), FrameRangeError> {
        // Walk over scratch values and commit only on full success.
        let mut cur = self.top;
        let mut walked = 0usize;
        while walked < index {
            match cur.and_then(|id| self.arena.get(id).parent) {
                Some(parent) => {
                    cur = Some(parent);
                    walked += 1;
                }
                None => {
                    return Err(FrameRangeError {
                        attempted: index as i64,
                        max: walked,
                    })
                }
            }
        }
        if cur.is_none() && index > 0 {
            return Err(FrameRangeError {
                attempted: index as i64,
                max: 0,
            });
        }
        self.focus = cur;
        self.focus_index = index;
        Ok(())
    }

    fn highest_reachable(&self) -> usize {
        self.chain().count().saturating_sub(1)
    }

    /// Iterate the chain from the top frame down to the root caller.
    pub fn chain(&self) -> ChainIter<'a> {
        ChainIter {
            arena: self.arena,
            next: self.top,
        }
    }
}

pub struct ChainIter<'a> {
    arena: &'a FrameArena,
    next: Option<FrameId>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Frame;

    fn next(&mut self) -> Option<&'a Frame> {
        let id = self.next?;
        let frame = self.arena.get(id);
        self.next = frame.parent;
        Some(frame)
    }
}
