//! 设备节点的文件操作

use alloc::sync::Arc;

use super::buffer::CopyFault;
use super::device::ChrdevDevice;
use crate::error::ChrdevError;
use crate::kernel::cdev::FileOperations;
use crate::uaccess::UserSlice;
use crate::vfs::{FileInfo, major, minor};

/// `/dev` 节点的文件操作表，绑定到设备上下文
pub struct ChrdevFops {
    device: Arc<ChrdevDevice>,
}

impl ChrdevFops {
    /// 创建绑定到 `device` 的文件操作表
    pub fn new(device: Arc<ChrdevDevice>) -> Self {
        Self { device }
    }
}

impl FileOperations for ChrdevFops {
    fn open(&self, _file: &FileInfo) -> Result<(), ChrdevError> {
        self.device
            .try_open()
            .inspect_err(|_| pr_err!("chrdev: already open"))?;
        pr_info!("chrdev: device opened");
        Ok(())
    }

    fn release(&self, _file: &FileInfo) -> Result<(), ChrdevError> {
        self.device.release();
        pr_info!("chrdev: device closed");
        Ok(())
    }

    fn read(
        &self,
        file: &FileInfo,
        buf: &UserSlice<'_>,
        _offset: &mut usize,
    ) -> Result<usize, ChrdevError> {
        pr_info!("chrdev: read from file {}", file.name);
        pr_info!("chrdev: read from device {}:{}", major(file.rdev), minor(file.rdev));

        let n = self
            .device
            .read_into(buf)
            .inspect_err(|CopyFault { missed }| pr_err!("chrdev: copy_to_user failed: {}", missed))?;

        pr_info!("chrdev: {} bytes read", n);
        Ok(n)
    }

    fn write(
        &self,
        file: &FileInfo,
        buf: &UserSlice<'_>,
        _offset: &mut usize,
    ) -> Result<usize, ChrdevError> {
        pr_info!("chrdev: write to file {}", file.name);
        pr_info!("chrdev: write to device {}:{}", major(file.rdev), minor(file.rdev));

        let n = self
            .device
            .write_from(buf)
            .inspect_err(|CopyFault { missed }| pr_err!("chrdev: copy_from_user failed: {}", missed))?;

        pr_info!("chrdev: {} bytes written", n);
        Ok(n)
    }
}
