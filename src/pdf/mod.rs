//! PDF rendering infrastructure

mod controller;
mod request;
mod types;
mod worker;

pub use controller::{DocumentInfo, RenderController};
pub use request::{RenderParams, RenderRequest, RenderResponse, RequestId, WorkerFault};
pub use types::*;
