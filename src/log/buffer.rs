//! 日志存储环形缓冲区
//!
//! 容量固定，写满后覆盖最旧的条目并累计丢弃数。

use alloc::collections::VecDeque;

use super::config::LOG_BUFFER_ENTRIES;
use super::entry::LogEntry;
use crate::sync::SpinLock;

/// 固定容量的日志环形缓冲区
pub(super) struct LogBuffer {
    ring: SpinLock<Ring>,
}

struct Ring {
    entries: VecDeque<LogEntry>,
    /// 由于缓冲区溢出而丢弃的日志计数
    dropped: usize,
}

impl LogBuffer {
    /// 在编译时创建一个空缓冲区
    pub(super) const fn new() -> Self {
        Self {
            ring: SpinLock::new(Ring {
                entries: VecDeque::new(),
                dropped: 0,
            }),
        }
    }

    /// 写入一条日志；缓冲区已满时先丢弃最旧的一条
    pub(super) fn write(&self, entry: LogEntry) {
        let mut ring = self.ring.lock();
        if ring.entries.len() >= LOG_BUFFER_ENTRIES {
            ring.entries.pop_front();
            ring.dropped += 1;
        }
        ring.entries.push_back(entry);
    }

    /// 按 FIFO 顺序读取下一条日志
    pub(super) fn read(&self) -> Option<LogEntry> {
        self.ring.lock().entries.pop_front()
    }

    /// 返回缓冲区中未读日志条目的数量
    pub(super) fn len(&self) -> usize {
        self.ring.lock().entries.len()
    }

    /// 返回由于缓冲区溢出而丢弃的日志总数
    pub(super) fn dropped_count(&self) -> usize {
        self.ring.lock().dropped
    }
}
