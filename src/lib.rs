pub mod address;
pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod event_source;
pub mod indicator;
pub mod nav;
pub mod pdf;
pub mod surface;

pub use app::{Viewer, run_viewer};
pub use error::ViewerError;
