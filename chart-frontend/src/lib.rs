//! Browser front end: draws the selected series with Lightweight Charts,
//! mounts the interval and field switchers and fills the overview panel.

pub mod load;
pub mod options;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
mod renderer;
#[cfg(target_arch = "wasm32")]
mod source;

#[cfg(target_arch = "wasm32")]
pub use app::{start, StockChart};
#[cfg(target_arch = "wasm32")]
pub use renderer::LightweightChartsRenderer;
#[cfg(target_arch = "wasm32")]
pub use source::{FetchError, GlooSeriesSource};

pub use options::ElementIds;
