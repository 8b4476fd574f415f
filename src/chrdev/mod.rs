//! 单缓冲区字符设备
//!
//! - [`buffer`]: 固定容量的数据缓冲区
//! - [`device`]: 设备上下文（缓冲区 + 打开标志）
//! - [`fops`]: `/dev` 节点的文件操作
//! - [`report`]: `/proc` 诊断报告

pub mod buffer;
pub mod device;
pub mod fops;
pub mod report;

pub use buffer::{CopyFault, DataBuffer};
pub use device::ChrdevDevice;
pub use fops::ChrdevFops;
pub use report::DiagnosticReporter;
