//! 设备 class
//!
//! `class_create` 登记一个 class；`device_create` 在 class 下登记设备，
//! 并由 [`Kernel`](crate::kernel::Kernel) 同步在 devfs 中创建 `/dev/<name>` 节点。

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::sync::SpinLock;

/// 一个设备 class（对应 `/sys/class/<name>`）
pub struct DeviceClass {
    name: String,
    /// 设备号 -> 设备节点名
    devices: SpinLock<BTreeMap<u64, String>>,
}

impl DeviceClass {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            devices: SpinLock::new(BTreeMap::new()),
        }
    }

    /// class 名
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn contains(&self, dev: u64) -> bool {
        self.devices.lock().contains_key(&dev)
    }

    pub(super) fn insert(&self, dev: u64, name: &str) {
        self.devices.lock().insert(dev, name.to_string());
    }

    pub(super) fn remove(&self, dev: u64) -> Option<String> {
        self.devices.lock().remove(&dev)
    }

    pub(super) fn drain(&self) -> Vec<(u64, String)> {
        core::mem::take(&mut *self.devices.lock()).into_iter().collect()
    }
}

/// `device_create` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// 设备号
    pub dev: u64,
    /// `/dev` 下的节点名
    pub name: String,
}
