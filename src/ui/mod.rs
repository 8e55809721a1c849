pub mod overlays;
pub mod panels;
pub mod plot;
