//! 字符设备号区域分配
//!
//! 对应 `alloc_chrdev_region` / `register_chrdev_region` / `unregister_chrdev_region`。
//! 动态分配的主设备号取自 Linux 的两个动态区间：先 254..=234，再 511..=384。

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::error::ChrdevError;
use crate::vfs::dev::{MINOR_LIMIT, major, makedev, minor};

/// 动态主设备号区间（从高到低分配）
const DYNAMIC_MAJORS: [(u32, u32); 2] = [(254, 234), (511, 384)];

/// 一段已登记的设备号区域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChrdevRegion {
    /// 登记时给出的名称
    pub name: String,
    /// 主设备号
    pub major: u32,
    /// 起始次设备号
    pub base_minor: u32,
    /// 次设备号数量
    pub count: u32,
}

impl ChrdevRegion {
    fn overlaps(&self, base_minor: u32, count: u32) -> bool {
        base_minor < self.base_minor + self.count && self.base_minor < base_minor + count
    }
}

/// 设备号区域表：major -> 该 major 下的区域
pub struct ChrdevRegions {
    majors: HashMap<u32, Vec<ChrdevRegion>>,
}

impl ChrdevRegions {
    /// 创建空表
    pub fn new() -> Self {
        Self {
            majors: HashMap::new(),
        }
    }

    /// 动态分配一个空闲的主设备号，并登记 `[base_minor, base_minor + count)`
    ///
    /// # 返回
    /// - `Ok(dev)`: 区域的第一个设备号
    /// - `Err(ChrdevError::InvalidArgument)`: 次设备号范围非法
    /// - `Err(ChrdevError::Busy)`: 没有空闲的动态主设备号
    pub fn alloc(&mut self, base_minor: u32, count: u32, name: &str) -> Result<u64, ChrdevError> {
        check_minor_range(base_minor, count)?;

        let free = DYNAMIC_MAJORS
            .iter()
            .flat_map(|&(high, low)| (low..=high).rev())
            .find(|m| self.majors.get(m).is_none_or(|regions| regions.is_empty()))
            .ok_or(ChrdevError::Busy)?;

        self.insert(free, base_minor, count, name);
        Ok(makedev(free, base_minor))
    }

    /// 注销区域；未登记的区域忽略
    pub fn unregister(&mut self, dev: u64, count: u32) -> Option<ChrdevRegion> {
        let (maj, base_minor) = (major(dev), minor(dev));
        let regions = self.majors.get_mut(&maj)?;
        let idx = regions
            .iter()
            .position(|r| r.base_minor == base_minor && r.count == count)?;
        let region = regions.swap_remove(idx);
        if regions.is_empty() {
            self.majors.remove(&maj);
        }
        Some(region)
    }

    /// 查找包含 `dev` 的区域
    pub fn find(&self, dev: u64) -> Option<&ChrdevRegion> {
        let (maj, min) = (major(dev), minor(dev));
        self.majors
            .get(&maj)?
            .iter()
            .find(|r| r.overlaps(min, 1))
    }

    /// 已登记区域总数
    pub fn len(&self) -> usize {
        self.majors.values().map(Vec::len).sum()
    }

    /// 是否没有登记的区域
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, maj: u32, base_minor: u32, count: u32, name: &str) {
        self.majors.entry(maj).or_default().push(ChrdevRegion {
            name: name.to_string(),
            major: maj,
            base_minor,
            count,
        });
    }
}

impl Default for ChrdevRegions {
    fn default() -> Self {
        Self::new()
    }
}

fn check_minor_range(base_minor: u32, count: u32) -> Result<(), ChrdevError> {
    match base_minor.checked_add(count) {
        Some(end) if count > 0 && end <= MINOR_LIMIT => Ok(()),
        _ => Err(ChrdevError::InvalidArgument),
    }
}
