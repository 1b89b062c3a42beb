use crate::error::DecodeError;

/// Sentinel for "no limit pushed": reads are bounded by the source only.
pub(crate) const NO_LIMIT: u64 = u64::MAX;

/// Proof of a `push_limit` call, handed back to `pop_limit`.
///
/// Tokens are deliberately neither `Clone` nor `Copy`: popping consumes
/// the token, so the same limit cannot be popped twice.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pushed limit must be popped with its token"]
pub struct LimitToken {
    depth: usize,
    opened_at: u64,
}

impl LimitToken {
    /// Nesting depth this token restores to when popped, plus one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// One saved outer boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LimitFrame {
    /// The limit that was active before the push, as an absolute offset.
    previous_limit: u64,
    /// Absolute offset at which the inner limit was opened.
    opened_at: u64,
}

/// LIFO stack of outer limits saved by `push_limit`.
///
/// Limits are absolute stream offsets rather than remaining-byte counts,
/// so restoring one after the inner range has been consumed needs no
/// adjustment: the outer boundary never moved.
#[derive(Clone, Debug, Default)]
pub(crate) struct LimitStack {
    frames: Vec<LimitFrame>,
}

impl LimitStack {
    pub(crate) fn push(&mut self, previous_limit: u64, opened_at: u64) -> LimitToken {
        self.frames.push(LimitFrame {
            previous_limit,
            opened_at,
        });
        LimitToken {
            depth: self.frames.len(),
            opened_at,
        }
    }

    /// Pop the innermost frame and return the limit it saved.
    pub(crate) fn pop(&mut self, token: LimitToken) -> Result<u64, DecodeError> {
        match self.frames.last() {
            Some(frame) if token.depth == self.frames.len() && frame.opened_at == token.opened_at => {
                let previous = frame.previous_limit;
                self.frames.pop();
                Ok(previous)
            }
            _ => Err(DecodeError::UnbalancedLimit {
                expected_depth: self.frames.len(),
                found_depth: token.depth,
            }),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}
