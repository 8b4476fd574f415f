//! 设备上下文
//!
//! 打开标志、数据缓冲区都归 [`ChrdevDevice`] 所有；模块加载时创建，卸载时丢弃。

use core::sync::atomic::{AtomicBool, Ordering};

use super::buffer::{CopyFault, DataBuffer};
use crate::error::ChrdevError;
use crate::sync::SpinLock;
use crate::uaccess::UserSlice;

/// 设备上下文：数据缓冲区与打开标志
pub struct ChrdevDevice {
    buffer: SpinLock<DataBuffer>,
    is_open: AtomicBool,
}

impl ChrdevDevice {
    /// 创建未打开的设备，缓冲区为空
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: SpinLock::new(DataBuffer::new(capacity)),
            is_open: AtomicBool::new(false),
        }
    }

    /// 独占打开，已打开时返回 `Busy`
    pub fn try_open(&self) -> Result<(), ChrdevError> {
        self.is_open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ChrdevError::Busy)
    }

    /// 清除打开标志
    pub fn release(&self) {
        self.is_open.store(false, Ordering::Release);
    }

    /// 设备当前是否被打开
    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::Acquire)
    }

    /// 从用户缓冲区写入，见 [`DataBuffer::fill`]
    pub fn write_from(&self, src: &UserSlice<'_>) -> Result<usize, CopyFault> {
        self.buffer.lock().fill(src)
    }

    /// 读取到用户缓冲区，见 [`DataBuffer::drain`]
    pub fn read_into(&self, dst: &UserSlice<'_>) -> Result<usize, CopyFault> {
        self.buffer.lock().drain(dst)
    }

    /// 持有缓冲区锁访问内容，长度与内容保证一致
    pub fn with_buffer<R>(&self, f: impl FnOnce(&DataBuffer) -> R) -> R {
        f(&self.buffer.lock())
    }

    /// 缓冲区有效长度
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// 缓冲区是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 缓冲区容量
    pub fn capacity(&self) -> usize {
        self.buffer.lock().capacity()
    }
}
