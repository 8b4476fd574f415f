use super::*;
use crate::log::{self, ConsoleSink, LogEntry, LogLevel};
use crate::sync::SpinLock;
use alloc::string::{String, ToString};

/// 收集转发到控制台的日志（级别, 消息）
struct Capture {
    lines: SpinLock<Vec<(LogLevel, String)>>,
}

impl ConsoleSink for Capture {
    fn write_entry(&self, entry: &LogEntry) {
        self.lines
            .lock()
            .push((entry.level(), entry.message().to_string()));
    }
}

impl Capture {
    fn has(&self, level: LogLevel, message: &str) -> bool {
        self.lines
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m == message)
    }
}

// 全局日志由所有用例共享，这里只断言本用例一定会产生的消息
test_case!(test_io_path_messages, {
    let capture = Arc::new(Capture {
        lines: SpinLock::new(Vec::new()),
    });
    log::set_global_level(LogLevel::Info);
    log::set_console_level(LogLevel::Info);
    log::set_console(Some(capture.clone()));

    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();
    kassert!(fx.write(file.as_ref(), b"hello") == Ok(5));
    kassert!(fx.open(OpenFlags::O_RDONLY).err() == Some(ChrdevError::Busy));
    // 未映射的地址：5 字节全部复制失败
    kassert!(file.read(UserBuffer::new(0x10_0000, 5)) == Err(ChrdevError::Fault));

    log::set_console(None);
    log::set_console_level(LogLevel::Warning);

    kassert!(capture.has(LogLevel::Info, "chrdev: device opened"));
    kassert!(capture.has(LogLevel::Info, "chrdev: write to file chrdev0"));
    kassert!(capture.has(LogLevel::Info, "chrdev: write to device 254:0"));
    kassert!(capture.has(LogLevel::Info, "chrdev: 5 bytes written"));
    kassert!(capture.has(LogLevel::Error, "chrdev: already open"));
    kassert!(capture.has(LogLevel::Info, "chrdev: read from file chrdev0"));
    kassert!(capture.has(LogLevel::Error, "chrdev: copy_to_user failed: 5"));
});
