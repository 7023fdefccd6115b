//! Tracing hooks that vanish when the `tracing` feature is off.
//!
//! Call sites use `trace_span!` around a frame or a grid pass and
//! `trace_event!` for per-frame measurements. Events take an explicit level
//! (`info` or `warn`) so data-quality notices such as saturated pixels stand
//! out from routine summaries.

/// Opens an info-level span named `$name` with optional fields.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Emits an event at `info` or `warn` level with `key = value` fields.
///
/// Without the `tracing` feature the field expressions are still evaluated
/// once and dropped, so call sites behave identically either way.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    (info, $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
    (warn, $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::warn!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($level:ident, $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// Stand-in span returned by `trace_span!` when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Mirrors `tracing::Span::entered` so guards look the same either way.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
