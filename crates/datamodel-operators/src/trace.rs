//! Operator tracing hooks.
//!
//! Compiled to no-ops unless the `tracing` feature is enabled.

#[cfg(feature = "tracing")]
pub(crate) fn record(op: &'static str, rows_in: usize, rows_out: usize) {
    tracing::trace!(op, rows_in, rows_out, "operator evaluated");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn record(_op: &'static str, _rows_in: usize, _rows_out: usize) {}
