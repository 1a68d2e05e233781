pub mod data;

pub use data::{InternalMessageFormat, MessageValue, RawUplink};
