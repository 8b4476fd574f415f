//! chrdev: 单缓冲区字符设备
//!
//! 一个最小的字符设备模块：通过 `/dev/chrdev0` 向用户态暴露一块固定大小的缓冲区，
//! 并通过 `/proc/chrdev_example_dir/chrdev_example` 提供只读的诊断视图。
//!
//! # 模块组织
//!
//! - [`chrdev`]: 设备本体（缓冲区、文件操作、诊断报告）
//! - [`module`]: 模块加载/卸载，按顺序注册与逆序拆除
//! - [`kernel`]: 模块所依赖的内核服务（设备号、cdev、class、devfs、procfs）
//! - [`vfs`] / [`uaccess`]: 文件抽象与用户态内存访问
//! - [`log`]: `pr_*` 风格的分级日志

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[cfg(test)]
#[macro_use]
pub mod test;

#[macro_use]
pub mod log;

pub mod chrdev;
pub mod config;
pub mod error;
pub mod kernel;
pub mod module;
pub mod sync;
pub mod uaccess;
pub mod vfs;

#[cfg(test)]
mod tests;

pub use error::ChrdevError;
pub use module::{ChrdevModule, module_exit, module_init};
