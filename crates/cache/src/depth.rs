//! Nesting of begin/end update brackets

/// What a begin or end did to the nesting depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DepthChange {
    /// The outermost bracket opened
    Opened,
    /// An inner bracket opened or closed
    Nested,
    /// The outermost bracket closed
    Closed { modified: bool },
    /// `end` without a matching `begin`
    Unbalanced,
}

#[derive(Debug, Default)]
pub(crate) struct OperationDepth {
    depth: u32,
    modified: bool,
}

impl OperationDepth {
    pub fn begin(&mut self) -> DepthChange {
        self.depth += 1;
        if self.depth == 1 {
            self.modified = false;
            DepthChange::Opened
        } else {
            DepthChange::Nested
        }
    }

    pub fn end(&mut self) -> DepthChange {
        match self.depth {
            0 => DepthChange::Unbalanced,
            1 => {
                self.depth = 0;
                DepthChange::Closed {
                    modified: self.modified,
                }
            }
            _ => {
                self.depth -= 1;
                DepthChange::Nested
            }
        }
    }

    /// Record a mutation; only counts inside a bracket
    pub fn mark_modified(&mut self) {
        if self.depth > 0 {
            self.modified = true;
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}
