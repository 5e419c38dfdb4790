//! # m4v-core
//!
//! m4v 解码器核心库, 提供比特流读写、统一错误类型和基础数值类型.

pub mod bitreader;
pub mod bitwriter;
pub mod error;
pub mod pixel_format;
pub mod rational;

// 重导出常用类型
pub use error::{M4vError, M4vResult};
pub use pixel_format::PixelFormat;
pub use rational::Rational;
