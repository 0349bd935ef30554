pub mod auth;
pub mod classifier;
pub mod dates;
pub mod mapper;
pub mod persister;
pub mod sync;

pub use crate::domain::model::{Order, TargetRecord};
pub use crate::domain::ports::RecordStore;
pub use crate::utils::error::Result;
