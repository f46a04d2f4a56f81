//! Numerical tolerance policy for a resolve

/// Solved rates at or below this are treated as not produced
pub const NEGLIGIBLE_RATE: f64 = 1e-6;

/// Pivots smaller than this make the system singular
pub const SINGULAR_PIVOT: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub negligible_rate: f64,
    pub singular_pivot: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            negligible_rate: NEGLIGIBLE_RATE,
            singular_pivot: SINGULAR_PIVOT,
        }
    }
}
