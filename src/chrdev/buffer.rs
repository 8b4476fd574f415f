//! 固定容量数据缓冲区
//!
//! 写入是替换而不是追加，超出容量的部分静默截断；读取是破坏性的，
//! 读完后有效长度归零。跨边界复制失败时有效长度保持不变。

use alloc::boxed::Box;
use alloc::vec;

use crate::error::ChrdevError;
use crate::uaccess::UserSlice;

/// 一次失败的跨边界复制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyFault {
    /// 未能复制的字节数
    pub missed: usize,
}

impl From<CopyFault> for ChrdevError {
    fn from(_: CopyFault) -> Self {
        ChrdevError::Fault
    }
}

/// 固定容量的数据缓冲区
pub struct DataBuffer {
    data: Box<[u8]>,
    /// `data[..len]` 为有效内容
    len: usize,
}

impl DataBuffer {
    /// 创建容量为 `capacity` 的空缓冲区
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// 用用户缓冲区的内容替换当前内容，超出容量的部分丢弃
    ///
    /// # 返回
    /// - `Ok(n)`: 保存的字节数，`n = min(src.len(), capacity)`
    /// - `Err(CopyFault)`: 复制失败，有效长度不变
    pub fn fill(&mut self, src: &UserSlice<'_>) -> Result<usize, CopyFault> {
        let n = core::cmp::min(src.len(), self.capacity());
        let missed = src.copy_from_user(&mut self.data[..n]);
        if missed != 0 {
            return Err(CopyFault { missed });
        }
        self.len = n;
        Ok(n)
    }

    /// 将 `min(dst.len(), len)` 字节复制到用户缓冲区，成功后清空
    ///
    /// # 返回
    /// - `Ok(n)`: 复制的字节数
    /// - `Err(CopyFault)`: 复制失败，有效长度不变
    pub fn drain(&mut self, dst: &UserSlice<'_>) -> Result<usize, CopyFault> {
        let n = core::cmp::min(dst.len(), self.len);
        let missed = dst.copy_to_user(&self.data[..n]);
        if missed != 0 {
            return Err(CopyFault { missed });
        }
        self.len = 0;
        Ok(n)
    }

    /// 有效内容
    pub fn contents(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// 有效长度
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 容量
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uaccess::{UserBuffer, UserMemory};

    fn store(buf: &mut DataBuffer, mem: &UserMemory, bytes: &[u8]) -> Result<usize, CopyFault> {
        let ubuf = mem.map(0x8000, bytes.len()).unwrap();
        mem.poke(0x8000, bytes).unwrap();
        let ret = buf.fill(&UserSlice::new(mem, ubuf));
        mem.unmap(0x8000).unwrap();
        ret
    }

    test_case!(test_fill_replaces_contents, {
        let mem = UserMemory::new();
        let mut buf = DataBuffer::new(16);
        kassert!(store(&mut buf, &mem, b"hello world") == Ok(11));
        kassert!(store(&mut buf, &mem, b"bye") == Ok(3));
        kassert!(buf.contents() == b"bye");
    });

    test_case!(test_fill_truncates_to_capacity, {
        let mem = UserMemory::new();
        let mut buf = DataBuffer::new(4);
        kassert!(store(&mut buf, &mem, b"abcdefgh") == Ok(4));
        kassert!(buf.contents() == b"abcd");
        kassert!(buf.len() == buf.capacity());
    });

    test_case!(test_drain_is_destructive, {
        let mem = UserMemory::new();
        let mut buf = DataBuffer::new(16);
        store(&mut buf, &mem, b"hello").unwrap();

        let out = mem.map(0x1000, 3).unwrap();
        kassert!(buf.drain(&UserSlice::new(&mem, out)) == Ok(3));
        kassert!(mem.peek(0x1000, 3).unwrap() == b"hel");
        kassert!(buf.is_empty());
        kassert!(buf.drain(&UserSlice::new(&mem, out)) == Ok(0));
    });

    test_case!(test_faults_keep_length, {
        let mem = UserMemory::new();
        let mut buf = DataBuffer::new(16);
        store(&mut buf, &mem, b"hello").unwrap();

        // 未映射的地址
        let bad = UserBuffer::new(0xdead_0000, 8);
        kassert!(buf.drain(&UserSlice::new(&mem, bad)) == Err(CopyFault { missed: 5 }));
        kassert!(buf.len() == 5);
        kassert!(buf.fill(&UserSlice::new(&mem, bad)).is_err());
        kassert!(buf.len() == 5);
        kassert!(ChrdevError::from(CopyFault { missed: 1 }) == ChrdevError::Fault);
    });
}
