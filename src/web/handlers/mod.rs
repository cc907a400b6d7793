pub mod pages;

pub use pages::{home_page, render_page, CropInfoView, IndexTemplate, PredictionView};
