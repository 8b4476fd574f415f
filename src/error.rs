//! 错误类型
//!
//! 与 POSIX 兼容的错误码，可通过 [`ChrdevError::to_errno()`] 转换为返回给用户态的负数。

use core::fmt;

/// 模块内统一的错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChrdevError {
    /// 设备已被打开（-EBUSY(16)）
    Busy,
    /// 设备不存在（-ENODEV(19)）
    NoDevice,

    /// 用户态地址无效（-EFAULT(14)）
    Fault,
    /// 内存不足（-ENOMEM(12)）
    NoMemory,

    /// 路径不存在（-ENOENT(2)）
    NotFound,
    /// 已存在（-EEXIST(17)）
    AlreadyExists,
    /// 是目录（-EISDIR(21)）
    IsDirectory,

    /// 权限被拒绝（-EACCES(13)）
    PermissionDenied,
    /// 打开方式不允许该操作（-EBADF(9)）
    BadFileDescriptor,
    /// 无效参数（-EINVAL(22)）
    InvalidArgument,

    /// 操作不支持（-ENOTSUP(95)）
    NotSupported,
}

impl ChrdevError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            ChrdevError::NotFound => -2,
            ChrdevError::BadFileDescriptor => -9,
            ChrdevError::NoMemory => -12,
            ChrdevError::PermissionDenied => -13,
            ChrdevError::Fault => -14,
            ChrdevError::Busy => -16,
            ChrdevError::AlreadyExists => -17,
            ChrdevError::NoDevice => -19,
            ChrdevError::IsDirectory => -21,
            ChrdevError::InvalidArgument => -22,
            ChrdevError::NotSupported => -95,
        }
    }

    /// 错误码的符号名
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChrdevError::NotFound => "ENOENT",
            ChrdevError::BadFileDescriptor => "EBADF",
            ChrdevError::NoMemory => "ENOMEM",
            ChrdevError::PermissionDenied => "EACCES",
            ChrdevError::Fault => "EFAULT",
            ChrdevError::Busy => "EBUSY",
            ChrdevError::AlreadyExists => "EEXIST",
            ChrdevError::NoDevice => "ENODEV",
            ChrdevError::IsDirectory => "EISDIR",
            ChrdevError::InvalidArgument => "EINVAL",
            ChrdevError::NotSupported => "ENOTSUP",
        }
    }
}

impl fmt::Display for ChrdevError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.to_errno())
    }
}
