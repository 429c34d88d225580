use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle moment at which the engine offers the debugger a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// Before prerequisite checking.
    Prereq,
    /// After prerequisite checking, before running the recipe.
    Run,
    /// After the target is complete.
    End,
}

/// Bitmask of stop kinds a target breakpoint is armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakMask(u8);

impl BreakMask {
    pub const NONE: BreakMask = BreakMask(0);
    pub const PREREQ: BreakMask = BreakMask(0b001);
    pub const RUN: BreakMask = BreakMask(0b010);
    pub const END: BreakMask = BreakMask(0b100);
    pub const ALL: BreakMask = BreakMask(0b111);

    pub fn contains(self, kind: StopKind) -> bool {
        let bit = match kind {
            StopKind::Prereq => Self::PREREQ,
            StopKind::Run => Self::RUN,
            StopKind::End => Self::END,
        };
        self.0 & bit.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for BreakMask {
    type Output = BreakMask;

    fn bitor(self, rhs: BreakMask) -> BreakMask {
        BreakMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for BreakMask {
    fn bitor_assign(&mut self, rhs: BreakMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for BreakMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            return write!(f, "all");
        }
        if self.is_empty() {
            return write!(f, "none");
        }
        let mut first = true;
        for (name, bit) in [
            ("prereq", Self::PREREQ),
            ("run", Self::RUN),
            ("end", Self::END),
        ] {
            if self.0 & bit.0 != 0 {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

const KEYWORDS: &[(&str, BreakMask)] = &[
    ("all", BreakMask::ALL),
    ("run", BreakMask::RUN),
    ("prereq", BreakMask::PREREQ),
    ("end", BreakMask::END),
];

/// Resolve a stop-kind keyword by unambiguous case-insensitive prefix
/// ("p" is prereq, "r" is run). Returns `None` for unknown or ambiguous
/// words.
pub fn parse_break_keyword(word: &str) -> Option<BreakMask> {
    if word.is_empty() {
        return None;
    }
    let lower = word.to_ascii_lowercase();
    let mut hit = None;
    for (name, mask) in KEYWORDS {
        if *name == lower {
            return Some(*mask);
        }
        if name.starts_with(&lower) {
            if hit.is_some() {
                return None;
            }
            hit = Some(*mask);
        }
    }
    hit
}

/// Result of arming a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Added,
    /// Target was already flagged; the original mask is kept.
    AlreadySet,
}

/// Per-target breakpoint registry. Pure data plus lookup; the session loop
/// and the engine decide what to do with `is_armed`.
#[derive(Debug, Default)]
pub struct BreakpointSet {
    entries: BTreeMap<String, BreakMask>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, target: &str, mask: BreakMask) -> SetOutcome {
        if self.entries.contains_key(target) {
            return SetOutcome::AlreadySet;
        }
        self.entries.insert(target.to_string(), mask);
        SetOutcome::Added
    }

    /// Clear a target's breakpoint; reports whether anything was removed.
    pub fn clear(&mut self, target: &str) -> bool {
        self.entries.remove(target).is_some()
    }

    pub fn is_armed(&self, target: &str, kind: StopKind) -> bool {
        self.entries
            .get(target)
            .map(|mask| mask.contains(kind))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn list(&self) -> impl Iterator<Item = (&str, BreakMask)> {
        self.entries.iter().map(|(name, mask)| (name.as_str(), *mask))
    }
}
