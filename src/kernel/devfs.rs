//! devfs：`/dev` 下的设备节点与打开后的字符设备文件

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;

use crate::error::ChrdevError;
use crate::kernel::cdev::Cdev;
use crate::sync::SpinLock;
use crate::uaccess::{UserBuffer, UserSlice, UserSpace};
use crate::vfs::{File, FileInfo, FileMetadata, FileMode, OpenFlags};

/// `/dev` 下的一个节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevNode {
    /// 节点对应的设备号
    pub rdev: u64,
    /// 文件类型与权限
    pub mode: FileMode,
    /// 创建该节点的 class
    pub class: String,
}

/// `/dev` 目录：节点名 -> 节点
pub struct DevFs {
    nodes: BTreeMap<String, DevNode>,
}

impl DevFs {
    /// 创建空目录
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// 添加节点，同名节点已存在时返回 `AlreadyExists`
    pub fn insert(&mut self, name: String, node: DevNode) -> Result<(), ChrdevError> {
        if self.nodes.contains_key(&name) {
            return Err(ChrdevError::AlreadyExists);
        }
        self.nodes.insert(name, node);
        Ok(())
    }

    /// 移除节点
    pub fn remove(&mut self, name: &str) -> Option<DevNode> {
        self.nodes.remove(name)
    }

    /// 按名称查找节点
    pub fn lookup(&self, name: &str) -> Option<&DevNode> {
        self.nodes.get(name)
    }

    /// 节点数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否没有节点
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for DevFs {
    fn default() -> Self {
        Self::new()
    }
}

/// 字符设备文件
///
/// 读写委托给 cdev 的文件操作表；句柄被丢弃时调用 `release`。
pub struct CharDeviceFile {
    cdev: Arc<Cdev>,

    /// 驱动看到的文件信息
    info: FileInfo,

    /// 打开该文件的进程的地址空间
    user: Arc<dyn UserSpace>,

    /// 偏移量（流式设备通常不使用）
    offset: SpinLock<usize>,

    mode: FileMode,
}

impl CharDeviceFile {
    /// 调用驱动的 `open`，成功后返回文件句柄
    ///
    /// # 返回
    /// - `Ok(CharDeviceFile)`: 成功
    /// - `Err(e)`: 驱动拒绝打开（如 `Busy`）
    pub(super) fn open(
        cdev: Arc<Cdev>,
        info: FileInfo,
        mode: FileMode,
        user: Arc<dyn UserSpace>,
    ) -> Result<Self, ChrdevError> {
        cdev.ops().open(&info)?;
        Ok(Self {
            cdev,
            info,
            user,
            offset: SpinLock::new(0),
            mode,
        })
    }

    /// 驱动看到的文件信息
    pub fn info(&self) -> &FileInfo {
        &self.info
    }
}

impl File for CharDeviceFile {
    fn readable(&self) -> bool {
        self.info.flags.readable()
    }

    fn writable(&self) -> bool {
        self.info.flags.writable()
    }

    fn read(&self, buf: UserBuffer) -> Result<usize, ChrdevError> {
        if !self.readable() {
            return Err(ChrdevError::BadFileDescriptor);
        }
        let slice = UserSlice::new(self.user.as_ref(), buf);
        let mut offset = self.offset.lock();
        self.cdev.ops().read(&self.info, &slice, &mut offset)
    }

    fn write(&self, buf: UserBuffer) -> Result<usize, ChrdevError> {
        if !self.writable() {
            return Err(ChrdevError::BadFileDescriptor);
        }
        let slice = UserSlice::new(self.user.as_ref(), buf);
        let mut offset = self.offset.lock();
        self.cdev.ops().write(&self.info, &slice, &mut offset)
    }

    fn metadata(&self) -> FileMetadata {
        FileMetadata {
            mode: self.mode,
            rdev: self.info.rdev,
        }
    }

    fn offset(&self) -> usize {
        *self.offset.lock()
    }

    fn flags(&self) -> OpenFlags {
        self.info.flags
    }
}

impl Drop for CharDeviceFile {
    fn drop(&mut self) {
        // release 的返回值对 close 没有影响
        let _ = self.cdev.ops().release(&self.info);
    }
}
