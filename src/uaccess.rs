//! 用户态缓冲区
//!
//! 用户态程序通过一段位于用户地址的缓冲区与内核交换数据，
//! 例如 `read(fd, buf, len)` 传入的 `buf` 与 `len`。
//! 跨边界复制可能因为地址无效而失败；与 `copy_from_user`/`copy_to_user` 的约定一致，
//! 复制函数返回**未能复制**的字节数，0 表示全部成功。

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::ChrdevError;
use crate::sync::SpinLock;

/// 一个进程的用户地址空间
pub trait UserSpace: Send + Sync {
    /// 从 `addr` 起读取 `dst.len()` 字节，遇到无效地址即停止
    ///
    /// 返回未能复制的字节数
    fn read_bytes(&self, addr: usize, dst: &mut [u8]) -> usize;

    /// 向 `addr` 起写入 `src`，遇到无效地址即停止
    ///
    /// 返回未能复制的字节数
    fn write_bytes(&self, addr: usize, src: &[u8]) -> usize;
}

/// 用户缓冲区描述：起始地址与长度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBuffer {
    addr: usize,
    len: usize,
}

impl UserBuffer {
    /// 创建一个新的用户缓冲区
    /// # 参数：
    /// - `addr`: 用户缓冲区起始地址
    /// - `len`: 缓冲区的长度
    pub const fn new(addr: usize, len: usize) -> Self {
        Self { addr, len }
    }

    /// 返回用户缓冲区起始地址
    #[inline]
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// 返回用户缓冲区长度
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 判断用户缓冲区是否为空
    /// 长度是否为 0
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 截取前 `len` 字节
    pub fn truncate(self, len: usize) -> Self {
        Self {
            addr: self.addr,
            len: core::cmp::min(self.len, len),
        }
    }
}

/// 绑定到某个地址空间的用户缓冲区，文件操作通过它访问用户内存
pub struct UserSlice<'a> {
    space: &'a dyn UserSpace,
    buf: UserBuffer,
}

impl<'a> UserSlice<'a> {
    /// 绑定地址空间与缓冲区
    pub fn new(space: &'a dyn UserSpace, buf: UserBuffer) -> Self {
        Self { space, buf }
    }

    /// 调用者请求的长度
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len
    }

    /// 请求长度是否为零
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.len == 0
    }

    /// 从用户缓冲区向内核缓冲区 `dst` 复制 `dst.len()` 字节
    ///
    /// 超出用户缓冲区长度的部分计为未复制。返回未能复制的字节数。
    pub fn copy_from_user(&self, dst: &mut [u8]) -> usize {
        let n = core::cmp::min(dst.len(), self.buf.len);
        let beyond = dst.len() - n;
        self.space.read_bytes(self.buf.addr, &mut dst[..n]) + beyond
    }

    /// 将内核缓冲区 `src` 复制到用户缓冲区
    ///
    /// 超出用户缓冲区长度的部分计为未复制。返回未能复制的字节数。
    pub fn copy_to_user(&self, src: &[u8]) -> usize {
        let n = core::cmp::min(src.len(), self.buf.len);
        let beyond = src.len() - n;
        self.space.write_bytes(self.buf.addr, &src[..n]) + beyond
    }
}

/// 内存中的用户地址空间
///
/// 只有通过 [`UserMemory::map`] 映射过的区间可以访问，其余地址一律视为无效。
pub struct UserMemory {
    /// 起始地址 -> 区间内容
    regions: SpinLock<BTreeMap<usize, Vec<u8>>>,
}

impl UserMemory {
    /// 创建一个没有任何映射的地址空间
    pub fn new() -> Self {
        Self {
            regions: SpinLock::new(BTreeMap::new()),
        }
    }

    /// 映射 `[addr, addr + len)`，内容清零
    ///
    /// # 返回
    /// - `Ok(UserBuffer)`: 描述该区间的缓冲区
    /// - `Err(ChrdevError::InvalidArgument)`: 长度为 0、地址溢出或与已有区间重叠
    pub fn map(&self, addr: usize, len: usize) -> Result<UserBuffer, ChrdevError> {
        let end = addr.checked_add(len).ok_or(ChrdevError::InvalidArgument)?;
        if len == 0 {
            return Err(ChrdevError::InvalidArgument);
        }

        let mut regions = self.regions.lock();
        let overlaps = regions
            .range(..end)
            .next_back()
            .is_some_and(|(&start, data)| start + data.len() > addr);
        if overlaps {
            return Err(ChrdevError::InvalidArgument);
        }

        regions.insert(addr, vec![0; len]);
        Ok(UserBuffer::new(addr, len))
    }

    /// 解除以 `addr` 开头的映射
    pub fn unmap(&self, addr: usize) -> Result<(), ChrdevError> {
        self.regions
            .lock()
            .remove(&addr)
            .map(|_| ())
            .ok_or(ChrdevError::InvalidArgument)
    }

    /// 以用户进程的身份写入内存
    pub fn poke(&self, addr: usize, data: &[u8]) -> Result<(), ChrdevError> {
        match self.write_bytes(addr, data) {
            0 => Ok(()),
            _ => Err(ChrdevError::Fault),
        }
    }

    /// 以用户进程的身份读取内存
    pub fn peek(&self, addr: usize, len: usize) -> Result<Vec<u8>, ChrdevError> {
        let mut out = vec![0; len];
        match self.read_bytes(addr, &mut out) {
            0 => Ok(out),
            _ => Err(ChrdevError::Fault),
        }
    }

    /// 对 `[addr, addr + len)` 中可访问的前缀逐段调用 `f(region, offset, done, n)`
    ///
    /// 返回未能访问的字节数
    fn walk(&self, addr: usize, len: usize, mut f: impl FnMut(&mut Vec<u8>, usize, usize, usize)) -> usize {
        let mut regions = self.regions.lock();
        let mut done = 0;
        while done < len {
            let cur = addr + done;
            let Some((&start, data)) = regions.range_mut(..=cur).next_back() else {
                break;
            };
            let offset = cur - start;
            if offset >= data.len() {
                break;
            }
            let n = core::cmp::min(len - done, data.len() - offset);
            f(data, offset, done, n);
            done += n;
        }
        len - done
    }
}

impl Default for UserMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserSpace for UserMemory {
    fn read_bytes(&self, addr: usize, dst: &mut [u8]) -> usize {
        if addr.checked_add(dst.len()).is_none() {
            return dst.len();
        }
        self.walk(addr, dst.len(), |data, offset, done, n| {
            dst[done..done + n].copy_from_slice(&data[offset..offset + n]);
        })
    }

    fn write_bytes(&self, addr: usize, src: &[u8]) -> usize {
        if addr.checked_add(src.len()).is_none() {
            return src.len();
        }
        self.walk(addr, src.len(), |data, offset, done, n| {
            data[offset..offset + n].copy_from_slice(&src[done..done + n]);
        })
    }
}
