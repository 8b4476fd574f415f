//! 模块配置
//!
//! 常量给出默认值；[`ChrdevConfig`] 在加载时传入，加载后不再改变。

use alloc::string::{String, ToString};

use crate::error::ChrdevError;
use crate::vfs::FileMode;

/// 设备 class 名称
pub const CLASS_NAME: &str = "chrdev";
/// 设备号区域与 cdev 的名称
pub const DEVICE_NAME: &str = "chrdev_example";
/// `/dev` 下的设备节点名
pub const NODE_NAME: &str = "chrdev0";
/// `/proc` 下的目录名
pub const DIR_NAME: &str = "chrdev_example_dir";
/// `/proc/<DIR_NAME>/` 下的诊断文件名
pub const PROC_FILE_NAME: &str = DEVICE_NAME;

/// 数据缓冲区默认容量
pub const BUFFER_SIZE: usize = 1024;
/// 允许配置的最大容量
pub const MAX_BUFFER_SIZE: usize = 64 * 1024;
/// 诊断报告除缓冲区内容外的额外空间
pub const PROC_REPORT_OVERHEAD: usize = 100;

/// 诊断文件权限 r--r--r--
pub const PROC_FILE_MODE: u32 = 0o444;
/// 设备节点权限 rw-rw-rw-
pub const DEV_NODE_MODE: u32 = 0o666;

/// 申请的次设备号起点与数量
pub const FIRST_MINOR: u32 = 0;
/// 申请的次设备号数量
pub const MINOR_COUNT: u32 = 1;

/// 诊断文件的读取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPolicy {
    /// 每次读取翻转一次标志，隔次返回报告，其余返回 0
    #[default]
    Toggle,
    /// 按文件偏移返回完整报告，读到末尾返回 0
    Always,
}

/// 加载时配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChrdevConfig {
    /// `class_create` 使用的 class 名
    pub class_name: String,
    /// 设备号区域的名称
    pub device_name: String,
    /// `/dev` 下的节点名
    pub node_name: String,
    /// `/proc` 下的目录名
    pub proc_dir: String,
    /// 诊断文件名
    pub proc_file: String,
    /// 数据缓冲区容量
    pub capacity: usize,
    /// 诊断文件权限位，不允许写权限
    pub proc_mode: u32,
    /// 诊断文件的读取策略
    pub report_policy: ReportPolicy,
}

impl Default for ChrdevConfig {
    fn default() -> Self {
        Self {
            class_name: CLASS_NAME.to_string(),
            device_name: DEVICE_NAME.to_string(),
            node_name: NODE_NAME.to_string(),
            proc_dir: DIR_NAME.to_string(),
            proc_file: PROC_FILE_NAME.to_string(),
            capacity: BUFFER_SIZE,
            proc_mode: PROC_FILE_MODE,
            report_policy: ReportPolicy::default(),
        }
    }
}

impl ChrdevConfig {
    /// 设置缓冲区容量
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// 设置诊断报告策略
    pub fn with_report_policy(mut self, policy: ReportPolicy) -> Self {
        self.report_policy = policy;
        self
    }

    /// 设置 class 名
    pub fn with_class_name(mut self, name: &str) -> Self {
        self.class_name = name.to_string();
        self
    }

    /// 设置设备节点名
    pub fn with_node_name(mut self, name: &str) -> Self {
        self.node_name = name.to_string();
        self
    }

    /// 设置 `/proc` 目录名与诊断文件名
    pub fn with_proc_names(mut self, dir: &str, file: &str) -> Self {
        self.proc_dir = dir.to_string();
        self.proc_file = file.to_string();
        self
    }

    /// 诊断文件的权限位
    pub fn proc_file_mode(&self) -> FileMode {
        FileMode::from_bits_truncate(self.proc_mode & 0o777)
    }

    /// 检查配置，任何注册步骤之前调用
    pub fn validate(&self) -> Result<(), ChrdevError> {
        let names = [
            &self.class_name,
            &self.device_name,
            &self.node_name,
            &self.proc_dir,
            &self.proc_file,
        ];
        if names.iter().any(|n| n.is_empty() || n.contains('/')) {
            return Err(ChrdevError::InvalidArgument);
        }
        if self.capacity == 0 || self.capacity > MAX_BUFFER_SIZE {
            return Err(ChrdevError::InvalidArgument);
        }
        // 诊断接口只读
        if self.proc_mode & 0o222 != 0 {
            return Err(ChrdevError::InvalidArgument);
        }
        Ok(())
    }
}
