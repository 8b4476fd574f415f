//! 模块加载与卸载
//!
//! 加载按固定顺序登记：设备号区域 → cdev → class → 设备节点 → proc 目录 → proc 文件。
//! 每完成一步就把对应的撤销操作压入 [`TeardownStack`]；任何一步失败时，
//! 栈被丢弃并按相反顺序撤销已完成的步骤。卸载同样按相反顺序撤销全部步骤。

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::chrdev::{ChrdevDevice, ChrdevFops, DiagnosticReporter};
use crate::config::{ChrdevConfig, FIRST_MINOR, MINOR_COUNT};
use crate::error::ChrdevError;
use crate::kernel::cdev::Cdev;
use crate::kernel::{DEV_PREFIX, KERNEL, Kernel, PROC_PREFIX};
use crate::sync::SpinLock;
use crate::vfs::{major, minor};

/// 模块元信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    /// 模块名
    pub name: &'static str,
    /// 作者
    pub author: &'static str,
    /// 简介
    pub description: &'static str,
    /// 许可证
    pub license: &'static str,
    /// 版本
    pub version: &'static str,
}

/// 本模块的元信息
pub const MODULE_INFO: ModuleInfo = ModuleInfo {
    name: "chrdev",
    author: "Laura Shcherbak",
    description: "Character device driver",
    license: "GPL",
    version: "1.0",
};

/// 加载步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    /// 分配设备号区域
    Region,
    /// 注册 cdev
    Cdev,
    /// 创建设备 class
    Class,
    /// 创建 `/dev` 节点
    DeviceNode,
    /// 创建 `/proc` 目录
    ProcDir,
    /// 创建诊断文件
    ProcFile,
}

type Undo = Box<dyn FnOnce() + Send>;

/// 已完成步骤的撤销栈，丢弃时按相反顺序执行
pub struct TeardownStack {
    entries: Vec<(SetupStage, Undo)>,
}

impl TeardownStack {
    /// 创建空栈
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 记录已完成的步骤及其撤销操作
    pub fn push(&mut self, stage: SetupStage, undo: impl FnOnce() + Send + 'static) {
        self.entries.push((stage, Box::new(undo)));
    }

    /// 已完成的步骤，按完成顺序
    pub fn stages(&self) -> Vec<SetupStage> {
        self.entries.iter().map(|(stage, _)| *stage).collect()
    }

    /// 是否没有待撤销的步骤
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按相反顺序撤销全部步骤
    pub fn unwind(&mut self) {
        while let Some((stage, undo)) = self.entries.pop() {
            pr_debug!("chrdev: undo {:?}", stage);
            undo();
        }
    }
}

impl Default for TeardownStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TeardownStack {
    fn drop(&mut self) {
        self.unwind();
    }
}

/// 已加载的模块
pub struct ChrdevModule {
    config: ChrdevConfig,
    devt: u64,
    device: Arc<ChrdevDevice>,
    teardown: TeardownStack,
}

impl ChrdevModule {
    /// 加载模块
    ///
    /// # 返回
    /// - `Ok(module)`: 全部步骤完成，设备可用
    /// - `Err(e)`: 配置非法或某一步失败，已完成的步骤均已撤销
    pub fn init(kernel: &Arc<Kernel>, config: ChrdevConfig) -> Result<Self, ChrdevError> {
        config
            .validate()
            .inspect_err(|e| pr_err!("chrdev: invalid configuration: {}", e))?;

        let device = Arc::new(ChrdevDevice::new(config.capacity));
        let mut teardown = TeardownStack::new();

        let devt = kernel
            .alloc_chrdev_region(FIRST_MINOR, MINOR_COUNT, &config.device_name)
            .inspect_err(|e| pr_err!("chrdev: register_chrdev failed: {}", e.to_errno()))?;
        pr_info!("chrdev: register_chrdev ok, major = {} minor {}", major(devt), minor(devt));
        teardown.push(SetupStage::Region, {
            let kernel = kernel.clone();
            move || kernel.unregister_chrdev_region(devt, MINOR_COUNT)
        });

        let cdev = Cdev::new(Arc::new(ChrdevFops::new(device.clone())));
        kernel
            .cdev_add(cdev, devt, MINOR_COUNT)
            .inspect_err(|_| pr_err!("chrdev: cannot add the device to the system"))?;
        pr_info!("chrdev: cdev created successfully");
        teardown.push(SetupStage::Cdev, {
            let kernel = kernel.clone();
            move || kernel.cdev_del(devt, MINOR_COUNT)
        });

        let class = kernel
            .class_create(&config.class_name)
            .inspect_err(|e| pr_err!("chrdev: create class {} failed: {}", config.class_name, e))?;
        pr_info!("chrdev: device class created successfully");
        teardown.push(SetupStage::Class, {
            let (kernel, class) = (kernel.clone(), class.clone());
            move || kernel.class_destroy(&class)
        });

        let node = kernel
            .device_create(&class, devt, &config.node_name)
            .inspect_err(|e| pr_err!("chrdev: create device {} failed: {}", config.node_name, e))?;
        pr_info!("chrdev: device node {} created successfully", node.name);
        teardown.push(SetupStage::DeviceNode, {
            let kernel = kernel.clone();
            move || kernel.device_destroy(&class, node.dev)
        });

        let dir = kernel
            .proc_mkdir(&config.proc_dir, None)
            .inspect_err(|_| pr_err!("chrdev: create /proc/{}/ folder failed.", config.proc_dir))?;
        pr_info!("chrdev: proc folder /proc/{}/ created successfully.", config.proc_dir);
        teardown.push(SetupStage::ProcDir, {
            let (kernel, dir) = (kernel.clone(), dir.clone());
            move || kernel.proc_remove(&dir)
        });

        let reporter = Arc::new(DiagnosticReporter::new(device.clone(), config.report_policy));
        let file = kernel
            .proc_create(&config.proc_file, config.proc_file_mode(), Some(&dir), reporter)
            .inspect_err(|_| {
                pr_err!("chrdev: initialize /proc/{}/{} failed.", config.proc_dir, config.proc_file)
            })?;
        pr_info!(
            "chrdev: /proc/{}/{} initialized successfully.",
            config.proc_dir,
            config.proc_file
        );
        teardown.push(SetupStage::ProcFile, {
            let kernel = kernel.clone();
            move || kernel.proc_remove(&file)
        });

        pr_info!("chrdev: module init successfully.");
        Ok(Self {
            config,
            devt,
            device,
            teardown,
        })
    }

    /// 卸载模块
    pub fn exit(self) {
        drop(self);
    }

    /// 分配到的设备号
    pub fn devt(&self) -> u64 {
        self.devt
    }

    /// 设备上下文
    pub fn device(&self) -> &Arc<ChrdevDevice> {
        &self.device
    }

    /// 加载时使用的配置
    pub fn config(&self) -> &ChrdevConfig {
        &self.config
    }

    /// 已完成的加载步骤
    pub fn stages(&self) -> Vec<SetupStage> {
        self.teardown.stages()
    }

    /// 设备节点路径，如 `/dev/chrdev0`
    pub fn node_path(&self) -> String {
        format!("{}{}", DEV_PREFIX, self.config.node_name)
    }

    /// 诊断文件路径，如 `/proc/chrdev_example_dir/chrdev_example`
    pub fn proc_path(&self) -> String {
        format!("{}{}/{}", PROC_PREFIX, self.config.proc_dir, self.config.proc_file)
    }
}

impl Drop for ChrdevModule {
    fn drop(&mut self) {
        self.teardown.unwind();
        pr_info!("chrdev: module exited");
    }
}

lazy_static::lazy_static! {
    /// 通过 `module_init` 加载到全局内核中的模块
    static ref THIS_MODULE: SpinLock<Option<ChrdevModule>> = SpinLock::new(None);
}

/// 以默认配置加载到全局内核，返回 0 或负的 errno
pub fn module_init() -> i32 {
    module_init_with(ChrdevConfig::default())
}

/// 以指定配置加载到全局内核，返回 0 或负的 errno
pub fn module_init_with(config: ChrdevConfig) -> i32 {
    let mut slot = THIS_MODULE.lock();
    if slot.is_some() {
        pr_err!("chrdev: module already loaded");
        return ChrdevError::AlreadyExists.to_errno() as i32;
    }
    match ChrdevModule::init(&KERNEL, config) {
        Ok(module) => {
            *slot = Some(module);
            0
        }
        Err(e) => e.to_errno() as i32,
    }
}

/// 卸载全局模块；未加载时无操作
pub fn module_exit() {
    let module = THIS_MODULE.lock().take();
    if let Some(module) = module {
        module.exit();
    }
}

/// 全局模块是否已加载
pub fn is_loaded() -> bool {
    THIS_MODULE.lock().is_some()
}
