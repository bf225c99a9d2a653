//! Analysis configuration.
//!
//! The core is a pure function from (syntax tree, options) to (typed
//! program, diagnostics); everything configurable is enumerated here and
//! passed explicitly into the driver.

use serde::{Deserialize, Serialize};

/// Width of the target integer class backing source integer literals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntWidth {
    /// 32-bit target integers (the default).
    #[default]
    I32,
    /// 64-bit target integers.
    I64,
}

impl IntWidth {
    /// Largest source integer literal representable at this width.
    pub const fn max_literal(self) -> i64 {
        match self {
            IntWidth::I32 => i32::MAX as i64,
            IntWidth::I64 => i64::MAX,
        }
    }

    pub const fn min_literal(self) -> i64 {
        match self {
            IntWidth::I32 => i32::MIN as i64,
            IntWidth::I64 => i64::MIN,
        }
    }
}

/// Options that change what the analysis accepts or traverses.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Target integer class for source integer literals.
    pub integer_width: IntWidth,
    /// When false, integer literals outside the target width are a hard
    /// error; when true the emitted code is assumed to handle the overflow.
    pub assume_bounds_checked: bool,
    /// When false, `assert` subtrees are skipped entirely.
    pub assertions_enabled: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            integer_width: IntWidth::I32,
            assume_bounds_checked: false,
            assertions_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_bounds_track_width() {
        assert_eq!(IntWidth::I32.max_literal(), i32::MAX as i64);
        assert_eq!(IntWidth::I64.min_literal(), i64::MIN);
    }
}
