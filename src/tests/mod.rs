//! 端到端测试：通过 `Kernel::open` 得到的文件句柄操作已加载的模块

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::ChrdevConfig;
use crate::error::ChrdevError;
use crate::kernel::Kernel;
use crate::module::ChrdevModule;
use crate::uaccess::{UserBuffer, UserMemory};
use crate::vfs::{File, OpenFlags};

mod device_io;
mod lifecycle;
mod logging;

/// 用户进程的数据区起始地址
const USER_BASE: usize = 0x1000;
/// 数据区大小
const USER_LEN: usize = 0x2000;

/// 独立的内核 + 已加载的模块 + 一个用户地址空间
struct Fixture {
    kernel: Arc<Kernel>,
    module: Option<ChrdevModule>,
    mem: Arc<UserMemory>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(ChrdevConfig::default())
    }

    fn with_config(config: ChrdevConfig) -> Self {
        let kernel = Arc::new(Kernel::new());
        let module = ChrdevModule::init(&kernel, config).unwrap();
        let mem = Arc::new(UserMemory::new());
        mem.map(USER_BASE, USER_LEN).unwrap();
        Self {
            kernel,
            module: Some(module),
            mem,
        }
    }

    fn module(&self) -> &ChrdevModule {
        self.module.as_ref().unwrap()
    }

    fn open(&self, flags: OpenFlags) -> Result<Box<dyn File>, ChrdevError> {
        self.kernel.open(&self.module().node_path(), flags, self.mem.clone())
    }

    fn open_proc(&self) -> Result<Box<dyn File>, ChrdevError> {
        self.kernel
            .open(&self.module().proc_path(), OpenFlags::O_RDONLY, self.mem.clone())
    }

    /// 把 `data` 放进用户内存后写入
    fn write(&self, file: &dyn File, data: &[u8]) -> Result<usize, ChrdevError> {
        self.mem.poke(USER_BASE, data).unwrap();
        file.write(UserBuffer::new(USER_BASE, data.len()))
    }

    /// 读取最多 `len` 字节，返回读到的内容
    fn read(&self, file: &dyn File, len: usize) -> Result<Vec<u8>, ChrdevError> {
        let n = file.read(UserBuffer::new(USER_BASE, len))?;
        Ok(self.mem.peek(USER_BASE, n).unwrap())
    }

    fn unload(&mut self) {
        if let Some(module) = self.module.take() {
            module.exit();
        }
    }
}
