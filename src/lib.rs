#![allow(async_fn_in_trait)]
pub mod aoi;
pub mod download_plan;
pub mod error;
pub mod planet;
pub mod polling;
pub mod request;
pub mod settings;
pub mod time_range;

pub use error::{Error, Result};
