//! Handlers 模块

pub mod health;
pub mod schneider;
pub mod uplinks;

pub use health::*;
pub use schneider::*;
pub use uplinks::*;
