//! procfs：诊断文件树
//!
//! 驱动实现 [`ProcOps`]，通过 `Kernel::proc_create` 挂到 `/proc` 下的目录中。
//! 条目被移除后，已经打开的 [`ProcFile`] 再读取会得到 `NoDevice`。

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::ChrdevError;
use crate::sync::SpinLock;
use crate::uaccess::{UserBuffer, UserSlice, UserSpace};
use crate::vfs::{File, FileMetadata, FileMode, OpenFlags, SeekWhence};

/// proc 文件的读回调（相当于 `struct proc_ops`）
pub trait ProcOps: Send + Sync {
    /// 从 `offset` 处读取到用户缓冲区，返回复制的字节数，0 表示文件结束
    fn proc_read(&self, buf: &UserSlice<'_>, offset: &mut usize) -> Result<usize, ChrdevError>;
}

/// proc 条目的内容
pub enum ProcEntryContent {
    /// 目录（包含子节点）
    Directory(SpinLock<BTreeMap<String, Arc<ProcEntry>>>),

    /// 文件（每次读取时调用回调）
    File(Arc<dyn ProcOps>),
}

/// procfs 中的一个条目
pub struct ProcEntry {
    name: String,
    mode: FileMode,
    content: ProcEntryContent,
    parent: Weak<ProcEntry>,
    removed: AtomicBool,
}

impl ProcEntry {
    fn new_directory(name: &str, mode: FileMode, parent: Weak<ProcEntry>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            mode: mode | FileMode::S_IFDIR,
            content: ProcEntryContent::Directory(SpinLock::new(BTreeMap::new())),
            parent,
            removed: AtomicBool::new(false),
        })
    }

    fn new_file(
        name: &str,
        mode: FileMode,
        parent: Weak<ProcEntry>,
        ops: Arc<dyn ProcOps>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            mode: mode | FileMode::S_IFREG,
            content: ProcEntryContent::File(ops),
            parent,
            removed: AtomicBool::new(false),
        })
    }

    /// 条目名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 文件类型与权限
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// 是否为目录
    pub fn is_dir(&self) -> bool {
        matches!(self.content, ProcEntryContent::Directory(_))
    }

    /// 是否已被移除
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// 子节点名（仅目录）
    pub fn children(&self) -> Vec<String> {
        match &self.content {
            ProcEntryContent::Directory(children) => children.lock().keys().cloned().collect(),
            ProcEntryContent::File(_) => Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<ProcEntry>> {
        match &self.content {
            ProcEntryContent::Directory(children) => children.lock().get(name).cloned(),
            ProcEntryContent::File(_) => None,
        }
    }

    fn add_child(&self, child: Arc<ProcEntry>) -> Result<(), ChrdevError> {
        let ProcEntryContent::Directory(children) = &self.content else {
            return Err(ChrdevError::NotFound);
        };
        let mut children = children.lock();
        if children.contains_key(&child.name) {
            return Err(ChrdevError::AlreadyExists);
        }
        children.insert(child.name.clone(), child);
        Ok(())
    }

    fn ops(&self) -> Option<&Arc<dyn ProcOps>> {
        match &self.content {
            ProcEntryContent::File(ops) => Some(ops),
            ProcEntryContent::Directory(_) => None,
        }
    }

    /// 标记自身及所有后代为已移除
    fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
        if let ProcEntryContent::Directory(children) = &self.content {
            let children: Vec<_> = core::mem::take(&mut *children.lock()).into_values().collect();
            for child in children {
                child.mark_removed();
            }
        }
    }
}

/// `/proc` 文件系统
pub struct ProcFs {
    root: Arc<ProcEntry>,
}

impl ProcFs {
    /// 创建只有根目录的 procfs
    pub fn new() -> Self {
        let root = ProcEntry::new_directory("", FileMode::from_bits_truncate(0o555), Weak::new());
        Self { root }
    }

    /// `/proc` 根目录
    pub fn root(&self) -> &Arc<ProcEntry> {
        &self.root
    }

    /// 在 `parent`（`None` 表示 `/proc`）下创建目录
    pub fn mkdir(
        &self,
        name: &str,
        parent: Option<&Arc<ProcEntry>>,
    ) -> Result<Arc<ProcEntry>, ChrdevError> {
        let parent = self.parent_dir(parent)?;
        let dir = ProcEntry::new_directory(
            name,
            FileMode::from_bits_truncate(0o555),
            Arc::downgrade(parent),
        );
        parent.add_child(dir.clone())?;
        Ok(dir)
    }

    /// 在 `parent` 下创建文件
    pub fn create(
        &self,
        name: &str,
        mode: FileMode,
        parent: Option<&Arc<ProcEntry>>,
        ops: Arc<dyn ProcOps>,
    ) -> Result<Arc<ProcEntry>, ChrdevError> {
        let parent = self.parent_dir(parent)?;
        let file = ProcEntry::new_file(name, mode, Arc::downgrade(parent), ops);
        parent.add_child(file.clone())?;
        Ok(file)
    }

    /// 移除条目及其全部后代；已移除的条目忽略
    pub fn remove(&self, entry: &Arc<ProcEntry>) {
        if entry.is_removed() {
            return;
        }
        if let Some(parent) = entry.parent.upgrade()
            && let ProcEntryContent::Directory(children) = &parent.content
        {
            let mut children = children.lock();
            if children.get(&entry.name).is_some_and(|e| Arc::ptr_eq(e, entry)) {
                children.remove(&entry.name);
            }
        }
        entry.mark_removed();
    }

    /// 按 `/proc` 下的相对路径查找，如 `chrdev_example_dir/chrdev_example`
    pub fn lookup(&self, path: &str) -> Option<Arc<ProcEntry>> {
        path.split('/')
            .filter(|c| !c.is_empty())
            .try_fold(self.root.clone(), |dir, name| dir.lookup(name))
    }

    fn parent_dir<'a>(
        &'a self,
        parent: Option<&'a Arc<ProcEntry>>,
    ) -> Result<&'a Arc<ProcEntry>, ChrdevError> {
        let parent = parent.unwrap_or(&self.root);
        if parent.is_removed() {
            return Err(ChrdevError::NotFound);
        }
        if !parent.is_dir() {
            return Err(ChrdevError::InvalidArgument);
        }
        Ok(parent)
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new()
    }
}

/// 打开的 proc 文件
pub struct ProcFile {
    entry: Arc<ProcEntry>,
    user: Arc<dyn UserSpace>,
    offset: SpinLock<usize>,
    flags: OpenFlags,
}

impl ProcFile {
    pub(super) fn new(entry: Arc<ProcEntry>, flags: OpenFlags, user: Arc<dyn UserSpace>) -> Self {
        Self {
            entry,
            user,
            offset: SpinLock::new(0),
            flags,
        }
    }
}

impl File for ProcFile {
    fn readable(&self) -> bool {
        self.flags.readable()
    }

    fn writable(&self) -> bool {
        self.flags.writable()
    }

    fn read(&self, buf: UserBuffer) -> Result<usize, ChrdevError> {
        if !self.readable() {
            return Err(ChrdevError::BadFileDescriptor);
        }
        if self.entry.is_removed() {
            return Err(ChrdevError::NoDevice);
        }
        let ops = self.entry.ops().ok_or(ChrdevError::IsDirectory)?;
        let slice = UserSlice::new(self.user.as_ref(), buf);
        let mut offset = self.offset.lock();
        ops.proc_read(&slice, &mut offset)
    }

    fn write(&self, _buf: UserBuffer) -> Result<usize, ChrdevError> {
        if !self.writable() {
            return Err(ChrdevError::BadFileDescriptor);
        }
        // proc 文件没有写回调
        Err(ChrdevError::PermissionDenied)
    }

    fn metadata(&self) -> FileMetadata {
        FileMetadata {
            mode: self.entry.mode(),
            rdev: 0,
        }
    }

    fn lseek(&self, offset: isize, whence: SeekWhence) -> Result<usize, ChrdevError> {
        let mut cur = self.offset.lock();
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => *cur,
            // 内容在读取时生成，没有固定的结尾
            SeekWhence::End => return Err(ChrdevError::InvalidArgument),
        };
        let new = base
            .checked_add_signed(offset)
            .ok_or(ChrdevError::InvalidArgument)?;
        *cur = new;
        Ok(new)
    }

    fn offset(&self) -> usize {
        *self.offset.lock()
    }

    fn flags(&self) -> OpenFlags {
        self.flags
    }
}
