pub mod canvas;
pub mod diagram;
pub mod error;
pub mod functions;
pub mod geometry;
pub mod history;
pub mod logging;
pub mod object;
pub mod scene;
pub mod storage;
pub use error::{Error, Result};
