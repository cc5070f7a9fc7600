//! Temperature analysis: the reading window and the pattern analyzer.
//!
//! The [`TemperatureAnalyzer`] owns its [`ReadingWindow`] exclusively and
//! is driven one reading at a time by the device engine.

pub mod analyzer;
pub mod window;

pub use analyzer::{AlertKind, AnalyzerState, AnalyzerStats, TemperatureAnalyzer, Verdict};
pub use window::{Reading, ReadingWindow, WindowStats};
