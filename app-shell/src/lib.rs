//! Selection state and the controller that turns (interval, field) choices
//! into render dispatches.

pub mod controller;
pub mod labels;
pub mod renderer;
pub mod switcher;

pub use controller::{SelectionController, SelectionError, SelectionState, DEFAULT_SYMBOL};
pub use labels::{ChartLabels, LabelTable};
pub use renderer::{RenderError, Renderer};
pub use switcher::{Choice, Switcher};
