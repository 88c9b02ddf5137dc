//! Charts module - interactive plots and static images

mod plotter;
mod renderer;

pub use plotter::ChartPlotter;
pub use renderer::{RenderError, StaticChartRenderer};
