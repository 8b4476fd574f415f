//! cdev：把设备号绑定到驱动的文件操作表
//!
//! 驱动实现 [`FileOperations`]，通过 [`Cdev::new`] 包装后用 `Kernel::cdev_add` 登记；
//! 打开设备节点时按设备号在 [`CdevMap`] 中找到对应的 cdev。

use alloc::sync::Arc;
use hashbrown::HashMap;

use crate::error::ChrdevError;
use crate::uaccess::UserSlice;
use crate::vfs::FileInfo;
use crate::vfs::dev::{major, makedev, minor};

/// 字符设备的文件操作表（相当于 `struct file_operations`）
pub trait FileOperations: Send + Sync {
    /// 打开设备
    fn open(&self, file: &FileInfo) -> Result<(), ChrdevError>;

    /// 最后一个引用关闭时调用
    fn release(&self, file: &FileInfo) -> Result<(), ChrdevError>;

    /// 读取到用户缓冲区，返回复制的字节数
    fn read(
        &self,
        file: &FileInfo,
        buf: &UserSlice<'_>,
        offset: &mut usize,
    ) -> Result<usize, ChrdevError>;

    /// 从用户缓冲区写入，返回接收的字节数
    fn write(
        &self,
        file: &FileInfo,
        buf: &UserSlice<'_>,
        offset: &mut usize,
    ) -> Result<usize, ChrdevError>;
}

/// 已初始化的 cdev（`cdev_init` 的结果）
pub struct Cdev {
    ops: Arc<dyn FileOperations>,
}

impl Cdev {
    /// 用文件操作表初始化 cdev
    pub fn new(ops: Arc<dyn FileOperations>) -> Self {
        Self { ops }
    }

    /// 文件操作表
    pub fn ops(&self) -> &Arc<dyn FileOperations> {
        &self.ops
    }
}

/// 设备号 -> cdev
pub struct CdevMap {
    map: HashMap<u64, Arc<Cdev>>,
}

impl CdevMap {
    /// 创建空表
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// 登记 `[dev, dev + count)`，任一设备号已被占用则整体失败
    pub fn add(&mut self, cdev: Cdev, dev: u64, count: u32) -> Result<(), ChrdevError> {
        if count == 0 {
            return Err(ChrdevError::InvalidArgument);
        }
        let devs = || (0..count).map(move |i| makedev(major(dev), minor(dev) + i));
        if devs().any(|d| self.map.contains_key(&d)) {
            return Err(ChrdevError::AlreadyExists);
        }

        let cdev = Arc::new(cdev);
        for d in devs() {
            self.map.insert(d, cdev.clone());
        }
        Ok(())
    }

    /// 移除 `[dev, dev + count)`
    pub fn del(&mut self, dev: u64, count: u32) {
        for i in 0..count {
            self.map.remove(&makedev(major(dev), minor(dev) + i));
        }
    }

    /// 按设备号查找 cdev
    pub fn lookup(&self, dev: u64) -> Option<Arc<Cdev>> {
        self.map.get(&dev).cloned()
    }

    /// 已登记的设备号数量
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// 是否没有绑定的 cdev
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for CdevMap {
    fn default() -> Self {
        Self::new()
    }
}
