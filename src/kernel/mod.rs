//! 驱动可见的内核服务
//!
//! [`Kernel`] 汇总了字符设备驱动在加载与卸载时使用的全部子系统：
//! 设备号区域、cdev 表、设备 class、devfs 节点与 procfs。
//! 每个登记操作都有对应的注销操作，驱动按相反顺序调用即可完全撤销。
//!
//! 测试可以通过 [`Kernel::inject_failure`] 让某一步登记失败一次。

pub mod cdev;
pub mod chrdev_region;
pub mod class;
pub mod devfs;
pub mod proc;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;

use crate::error::ChrdevError;
use crate::sync::SpinLock;
use crate::uaccess::UserSpace;
use crate::vfs::{File, FileInfo, FileMode, OpenFlags, major, minor};

use cdev::{Cdev, CdevMap};
use chrdev_region::ChrdevRegions;
use class::{DeviceClass, DeviceHandle};
use devfs::{CharDeviceFile, DevFs, DevNode};
use proc::{ProcEntry, ProcFile, ProcFs, ProcOps};

bitflags::bitflags! {
    /// 一次性故障注入点，触发后自动清除
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FailPoints: u32 {
        /// `alloc_chrdev_region` 失败
        const ALLOC_REGION = 1 << 0;
        /// `cdev_add` 失败
        const CDEV_ADD = 1 << 1;
        /// `class_create` 失败
        const CLASS_CREATE = 1 << 2;
        /// `device_create` 失败
        const DEVICE_CREATE = 1 << 3;
        /// `proc_mkdir` 失败
        const PROC_MKDIR = 1 << 4;
        /// `proc_create` 失败
        const PROC_CREATE = 1 << 5;
    }
}

/// 设备节点所在的目录前缀
pub const DEV_PREFIX: &str = "/dev/";
/// procfs 挂载点前缀
pub const PROC_PREFIX: &str = "/proc/";

/// 字符设备驱动使用的内核服务集合
pub struct Kernel {
    regions: SpinLock<ChrdevRegions>,
    cdevs: SpinLock<CdevMap>,
    classes: SpinLock<BTreeMap<String, Arc<DeviceClass>>>,
    devfs: SpinLock<DevFs>,
    procfs: ProcFs,
    fail: SpinLock<FailPoints>,
}

impl Kernel {
    /// 创建一个没有任何登记的内核
    pub fn new() -> Self {
        Self {
            regions: SpinLock::new(ChrdevRegions::new()),
            cdevs: SpinLock::new(CdevMap::new()),
            classes: SpinLock::new(BTreeMap::new()),
            devfs: SpinLock::new(DevFs::new()),
            procfs: ProcFs::new(),
            fail: SpinLock::new(FailPoints::empty()),
        }
    }

    /// 让 `points` 中的每一步在下一次调用时失败
    pub fn inject_failure(&self, points: FailPoints) {
        self.fail.lock().insert(points);
    }

    fn should_fail(&self, point: FailPoints) -> bool {
        let mut fail = self.fail.lock();
        let hit = fail.contains(point);
        fail.remove(point);
        hit
    }

    // ---------------- 设备号区域 ----------------

    /// 动态分配一段设备号区域
    pub fn alloc_chrdev_region(
        &self,
        base_minor: u32,
        count: u32,
        name: &str,
    ) -> Result<u64, ChrdevError> {
        if self.should_fail(FailPoints::ALLOC_REGION) {
            return Err(ChrdevError::Busy);
        }
        let dev = self.regions.lock().alloc(base_minor, count, name)?;
        pr_debug!("chrdev_region: {} got {}:{}", name, major(dev), minor(dev));
        Ok(dev)
    }

    /// 注销设备号区域
    pub fn unregister_chrdev_region(&self, dev: u64, count: u32) {
        if self.regions.lock().unregister(dev, count).is_none() {
            pr_warn!("chrdev_region: {}:{} was not registered", major(dev), minor(dev));
        }
    }

    // ---------------- cdev ----------------

    /// 把 cdev 绑定到 `[dev, dev + count)`
    pub fn cdev_add(&self, cdev: Cdev, dev: u64, count: u32) -> Result<(), ChrdevError> {
        if self.should_fail(FailPoints::CDEV_ADD) {
            return Err(ChrdevError::NoMemory);
        }
        self.cdevs.lock().add(cdev, dev, count)
    }

    /// 解除 `[dev, dev + count)` 的 cdev 绑定
    pub fn cdev_del(&self, dev: u64, count: u32) {
        self.cdevs.lock().del(dev, count);
    }

    // ---------------- class / device ----------------

    /// 创建设备 class，同名 class 已存在时返回 `AlreadyExists`
    pub fn class_create(&self, name: &str) -> Result<Arc<DeviceClass>, ChrdevError> {
        if self.should_fail(FailPoints::CLASS_CREATE) {
            return Err(ChrdevError::NoMemory);
        }
        let mut classes = self.classes.lock();
        if classes.contains_key(name) {
            return Err(ChrdevError::AlreadyExists);
        }
        let class = Arc::new(DeviceClass::new(name));
        classes.insert(name.to_string(), class.clone());
        Ok(class)
    }

    /// 注销 class；仍挂在其下的设备一并销毁
    pub fn class_destroy(&self, class: &Arc<DeviceClass>) {
        let removed = {
            let mut classes = self.classes.lock();
            let owned = classes
                .get(class.name())
                .is_some_and(|c| Arc::ptr_eq(c, class));
            owned && classes.remove(class.name()).is_some()
        };
        if !removed {
            return;
        }

        let leftover = class.drain();
        if !leftover.is_empty() {
            pr_warn!("class {}: destroying {} remaining device(s)", class.name(), leftover.len());
        }
        let mut devfs = self.devfs.lock();
        for (_, name) in leftover {
            devfs.remove(&name);
        }
    }

    /// 在 class 下创建设备，并在 `/dev/<name>` 创建节点
    pub fn device_create(
        &self,
        class: &Arc<DeviceClass>,
        dev: u64,
        name: &str,
    ) -> Result<DeviceHandle, ChrdevError> {
        if self.should_fail(FailPoints::DEVICE_CREATE) {
            return Err(ChrdevError::NoMemory);
        }
        if !self.class_registered(class) {
            return Err(ChrdevError::NoDevice);
        }
        if class.contains(dev) {
            return Err(ChrdevError::AlreadyExists);
        }

        let node = DevNode {
            rdev: dev,
            mode: FileMode::S_IFCHR | FileMode::from_bits_truncate(crate::config::DEV_NODE_MODE),
            class: class.name().to_string(),
        };
        self.devfs.lock().insert(name.to_string(), node)?;
        class.insert(dev, name);

        Ok(DeviceHandle {
            dev,
            name: name.to_string(),
        })
    }

    /// 销毁设备及其 `/dev` 节点
    pub fn device_destroy(&self, class: &Arc<DeviceClass>, dev: u64) {
        if let Some(name) = class.remove(dev) {
            self.devfs.lock().remove(&name);
        }
    }

    fn class_registered(&self, class: &Arc<DeviceClass>) -> bool {
        self.classes
            .lock()
            .get(class.name())
            .is_some_and(|c| Arc::ptr_eq(c, class))
    }

    // ---------------- procfs ----------------

    /// 在 `parent`（`None` 表示 `/proc`）下创建目录
    pub fn proc_mkdir(
        &self,
        name: &str,
        parent: Option<&Arc<ProcEntry>>,
    ) -> Result<Arc<ProcEntry>, ChrdevError> {
        if self.should_fail(FailPoints::PROC_MKDIR) {
            return Err(ChrdevError::NoMemory);
        }
        self.procfs.mkdir(name, parent)
    }

    /// 在 `parent` 下创建只读回调文件
    pub fn proc_create(
        &self,
        name: &str,
        mode: FileMode,
        parent: Option<&Arc<ProcEntry>>,
        ops: Arc<dyn ProcOps>,
    ) -> Result<Arc<ProcEntry>, ChrdevError> {
        if self.should_fail(FailPoints::PROC_CREATE) {
            return Err(ChrdevError::NoMemory);
        }
        self.procfs.create(name, mode, parent, ops)
    }

    /// 移除 proc 条目及其后代
    pub fn proc_remove(&self, entry: &Arc<ProcEntry>) {
        self.procfs.remove(entry);
    }

    // ---------------- VFS ----------------

    /// 打开 `/dev/<name>` 或 `/proc/<path>`
    ///
    /// # 返回
    /// - `Ok(file)`: 文件句柄，丢弃即关闭
    /// - `Err(ChrdevError::NotFound)`: 路径不存在
    /// - `Err(ChrdevError::NoDevice)`: 节点存在但没有登记 cdev
    /// - `Err(ChrdevError::IsDirectory)`: 打开的是 proc 目录
    /// - `Err(ChrdevError::PermissionDenied)`: 权限位不允许请求的访问模式
    /// - 驱动 `open` 返回的错误（如 `Busy`）
    pub fn open(
        &self,
        path: &str,
        flags: OpenFlags,
        user: Arc<dyn UserSpace>,
    ) -> Result<Box<dyn File>, ChrdevError> {
        if let Some(name) = path.strip_prefix(DEV_PREFIX) {
            let node = self
                .devfs
                .lock()
                .lookup(name)
                .cloned()
                .ok_or(ChrdevError::NotFound)?;
            check_access(node.mode, flags)?;
            let cdev = self.cdevs.lock().lookup(node.rdev).ok_or(ChrdevError::NoDevice)?;

            let info = FileInfo {
                name: name.to_string(),
                rdev: node.rdev,
                flags,
            };
            // 不持有内核锁调用驱动
            let file = CharDeviceFile::open(cdev, info, node.mode, user)?;
            return Ok(Box::new(file));
        }

        if let Some(rel) = path.strip_prefix(PROC_PREFIX) {
            let entry = self.procfs.lookup(rel).ok_or(ChrdevError::NotFound)?;
            if entry.is_dir() {
                return Err(ChrdevError::IsDirectory);
            }
            check_access(entry.mode(), flags)?;
            return Ok(Box::new(ProcFile::new(entry, flags, user)));
        }

        Err(ChrdevError::NotFound)
    }

    // ---------------- 查询 ----------------

    /// 是否有区域包含 `dev`
    pub fn has_region(&self, dev: u64) -> bool {
        self.regions.lock().find(dev).is_some()
    }

    /// 已登记的设备号区域数
    pub fn region_count(&self) -> usize {
        self.regions.lock().len()
    }

    /// 已绑定 cdev 的设备号数
    pub fn cdev_count(&self) -> usize {
        self.cdevs.lock().len()
    }

    /// class 是否存在
    pub fn class_exists(&self, name: &str) -> bool {
        self.classes.lock().contains_key(name)
    }

    /// 查找 `/dev` 节点
    pub fn dev_node(&self, name: &str) -> Option<DevNode> {
        self.devfs.lock().lookup(name).cloned()
    }

    /// `/dev` 节点数量
    pub fn dev_node_count(&self) -> usize {
        self.devfs.lock().len()
    }

    /// `/proc` 下的相对路径是否存在
    pub fn proc_exists(&self, path: &str) -> bool {
        self.procfs.lookup(path).is_some()
    }

    /// 是否没有任何登记残留
    pub fn is_idle(&self) -> bool {
        self.region_count() == 0
            && self.cdev_count() == 0
            && self.classes.lock().is_empty()
            && self.dev_node_count() == 0
            && self.procfs.root().children().is_empty()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

fn check_access(mode: FileMode, flags: OpenFlags) -> Result<(), ChrdevError> {
    if (flags.readable() && !mode.can_read()) || (flags.writable() && !mode.can_write()) {
        return Err(ChrdevError::PermissionDenied);
    }
    Ok(())
}

lazy_static::lazy_static! {
    /// 全局内核实例，`module_init`/`module_exit` 使用
    pub static ref KERNEL: Arc<Kernel> = Arc::new(Kernel::new());
}
