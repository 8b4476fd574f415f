//! 同步原语
//!
//! 模块内的共享状态只在短临界区内访问，统一使用自旋锁。

pub use spin::{Mutex as SpinLock, RwLock};
