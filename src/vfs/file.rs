//! 文件抽象层 - VFS 会话层接口
//!
//! 定义了统一的文件操作接口 [`File`] trait。`Kernel::open` 返回 `Box<dyn File>`，
//! 丢弃该句柄即为 `close`。
//!
//! # 实现类型
//!
//! - [`CharDeviceFile`](crate::kernel::devfs::CharDeviceFile) - 字符设备，流式，不支持 seek
//! - [`ProcFile`](crate::kernel::proc::ProcFile) - procfs 文件

use alloc::string::String;

use crate::error::ChrdevError;
use crate::uaccess::UserBuffer;
use crate::vfs::FileMode;

/// 文件操作的统一接口
///
/// # 设计要点
///
/// - 方法不携带 offset 参数，由实现者内部维护
/// - 缓冲区是用户态地址，由实现者通过打开时绑定的地址空间访问
/// - 可选方法提供默认实现（如 `lseek` 默认返回 `NotSupported`）
pub trait File: Send + Sync {
    /// 检查文件是否可读
    fn readable(&self) -> bool;

    /// 检查文件是否可写
    fn writable(&self) -> bool;

    /// 读取数据到用户缓冲区
    fn read(&self, buf: UserBuffer) -> Result<usize, ChrdevError>;

    /// 从用户缓冲区写入数据
    fn write(&self, buf: UserBuffer) -> Result<usize, ChrdevError>;

    /// 获取文件元数据
    fn metadata(&self) -> FileMetadata;

    /// 设置文件偏移量（可选方法）
    ///
    /// 默认返回 `NotSupported`，适用于流式设备。
    fn lseek(&self, _offset: isize, _whence: SeekWhence) -> Result<usize, ChrdevError> {
        Err(ChrdevError::NotSupported)
    }

    /// 获取当前偏移量（可选方法）
    fn offset(&self) -> usize {
        0
    }

    /// 获取打开标志（可选方法）
    fn flags(&self) -> OpenFlags {
        OpenFlags::empty()
    }
}

/// 打开文件的元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// 文件类型与权限
    pub mode: FileMode,
    /// 设备号，仅对设备文件有意义
    pub rdev: u64,
}

/// 驱动看到的打开文件信息（相当于 `struct file`）
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// 目录项名，如 `chrdev0`
    pub name: String,
    /// 设备号
    pub rdev: u64,
    /// 打开标志
    pub flags: OpenFlags,
}

/// 文件偏移量设置模式
///
/// 对应 POSIX 的 `SEEK_SET`、`SEEK_CUR`、`SEEK_END`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum SeekWhence {
    /// 从文件开头计算
    Set = 0,
    /// 从当前位置计算
    Cur = 1,
    /// 从文件末尾计算
    End = 2,
}

bitflags::bitflags! {
    /// 文件打开标志（与 POSIX 兼容）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// 只读
        const O_RDONLY = 0o0;
        /// 只写
        const O_WRONLY = 0o1;
        /// 读写
        const O_RDWR = 0o2;
        /// 访问模式掩码
        const O_ACCMODE = 0o3;
        /// 非阻塞 I/O
        const O_NONBLOCK = 0o4000;
        /// exec 时关闭
        const O_CLOEXEC = 0o2000000;
    }
}

impl OpenFlags {
    /// 检查是否可读（O_RDONLY 或 O_RDWR）
    pub fn readable(&self) -> bool {
        let mode = self.bits() & OpenFlags::O_ACCMODE.bits();
        mode == OpenFlags::O_RDONLY.bits() || mode == OpenFlags::O_RDWR.bits()
    }

    /// 检查是否可写（O_WRONLY 或 O_RDWR）
    pub fn writable(&self) -> bool {
        let mode = self.bits() & OpenFlags::O_ACCMODE.bits();
        mode == OpenFlags::O_WRONLY.bits() || mode == OpenFlags::O_RDWR.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    test_case!(test_open_flags_access_mode, {
        kassert!(OpenFlags::O_RDONLY.readable());
        kassert!(!OpenFlags::O_RDONLY.writable());
        kassert!(OpenFlags::O_WRONLY.writable());
        kassert!(!OpenFlags::O_WRONLY.readable());
        let rdwr = OpenFlags::O_RDWR | OpenFlags::O_CLOEXEC;
        kassert!(rdwr.readable() && rdwr.writable());
    });
}
