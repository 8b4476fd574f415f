//! `/proc` 诊断报告
//!
//! 报告格式：
//!
//! ```text
//! Size of buffer: <len>.
//! Capacity of buffer: <capacity>.
//! Buffer contains:
//! <contents>
//! ```
//!
//! `contents` 是有效内容中第一个 NUL 之前的部分，按 UTF-8 有损解码。

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use super::buffer::DataBuffer;
use super::device::ChrdevDevice;
use crate::config::{PROC_REPORT_OVERHEAD, ReportPolicy};
use crate::error::ChrdevError;
use crate::kernel::proc::ProcOps;
use crate::uaccess::UserSlice;

/// 诊断文件的读回调
pub struct DiagnosticReporter {
    device: Arc<ChrdevDevice>,
    policy: ReportPolicy,
    /// Toggle 策略下上一次读取是否返回了报告
    toggle: AtomicBool,
}

impl DiagnosticReporter {
    /// 按 `policy` 为 `device` 生成报告
    pub fn new(device: Arc<ChrdevDevice>, policy: ReportPolicy) -> Self {
        Self {
            device,
            policy,
            toggle: AtomicBool::new(false),
        }
    }

    /// 当前读取策略
    pub fn policy(&self) -> ReportPolicy {
        self.policy
    }

    /// 生成当前报告
    pub fn render(&self) -> String {
        self.device.with_buffer(render)
    }
}

fn render(buffer: &DataBuffer) -> String {
    let bytes = buffer.contents();
    let text = bytes.split(|&b| b == 0).next().unwrap_or_default();

    let mut out = String::with_capacity(buffer.capacity() + PROC_REPORT_OVERHEAD);
    // 写入 String 不会失败
    let _ = write!(
        out,
        "Size of buffer: {}.\nCapacity of buffer: {}.\nBuffer contains:\n{}\n",
        buffer.len(),
        buffer.capacity(),
        String::from_utf8_lossy(text),
    );
    out
}

/// 复制到用户缓冲区，返回实际复制的字节数；一个字节都没复制成功时返回 `Fault`
fn copy_out(buf: &UserSlice<'_>, bytes: &[u8]) -> Result<usize, ChrdevError> {
    let missed = buf.copy_to_user(bytes);
    if missed != 0 {
        pr_err!("chrdev: proc copy_to_user failed: {}", missed);
    }
    match bytes.len() - missed {
        0 if !bytes.is_empty() => Err(ChrdevError::Fault),
        copied => Ok(copied),
    }
}

impl ProcOps for DiagnosticReporter {
    fn proc_read(&self, buf: &UserSlice<'_>, offset: &mut usize) -> Result<usize, ChrdevError> {
        match self.policy {
            ReportPolicy::Toggle => {
                if self.toggle.fetch_xor(true, Ordering::AcqRel) {
                    return Ok(0);
                }
                let report = self.render();
                let n = core::cmp::min(report.len(), buf.len());
                copy_out(buf, &report.as_bytes()[..n])
            }
            ReportPolicy::Always => {
                let report = self.render();
                let Some(rest) = report.as_bytes().get(*offset..) else {
                    return Ok(0);
                };
                let n = core::cmp::min(rest.len(), buf.len());
                let copied = copy_out(buf, &rest[..n])?;
                *offset += copied;
                Ok(copied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uaccess::{UserBuffer, UserMemory};

    fn device_with(bytes: &[u8], capacity: usize) -> Arc<ChrdevDevice> {
        let mem = UserMemory::new();
        let src = mem.map(0x1000, bytes.len().max(1)).unwrap();
        mem.poke(0x1000, bytes).unwrap();

        let dev = Arc::new(ChrdevDevice::new(capacity));
        dev.write_from(&UserSlice::new(&mem, src.truncate(bytes.len())))
            .unwrap();
        dev
    }

    test_case!(test_render_format, {
        let reporter = DiagnosticReporter::new(device_with(b"hello", 1024), ReportPolicy::Toggle);
        kassert!(
            reporter.render()
                == "Size of buffer: 5.\nCapacity of buffer: 1024.\nBuffer contains:\nhello\n"
        );
    });

    test_case!(test_render_empty_and_nul, {
        let empty = DiagnosticReporter::new(Arc::new(ChrdevDevice::new(16)), ReportPolicy::Toggle);
        kassert!(empty.render() == "Size of buffer: 0.\nCapacity of buffer: 16.\nBuffer contains:\n\n");

        let nul = DiagnosticReporter::new(device_with(b"ab\0cd", 16), ReportPolicy::Toggle);
        kassert!(nul.render().ends_with("Buffer contains:\nab\n"));
        kassert!(nul.render().starts_with("Size of buffer: 5."));
    });

    test_case!(test_toggle_alternates, {
        let reporter = DiagnosticReporter::new(device_with(b"hi", 16), ReportPolicy::Toggle);
        let mem = UserMemory::new();
        let out = mem.map(0x2000, 256).unwrap();
        let slice = UserSlice::new(&mem, out);
        let expected = reporter.render();

        let mut offset = 0;
        kassert!(reporter.proc_read(&slice, &mut offset) == Ok(expected.len()));
        kassert!(mem.peek(0x2000, expected.len()).unwrap() == expected.as_bytes());
        kassert!(reporter.proc_read(&slice, &mut offset) == Ok(0));
        kassert!(reporter.proc_read(&slice, &mut offset) == Ok(expected.len()));
        kassert!(reporter.proc_read(&slice, &mut offset) == Ok(0));
    });

    test_case!(test_toggle_truncates_to_request, {
        let reporter = DiagnosticReporter::new(device_with(b"hi", 16), ReportPolicy::Toggle);
        let mem = UserMemory::new();
        let out = mem.map(0x2000, 256).unwrap();

        let mut offset = 0;
        let slice = UserSlice::new(&mem, out.truncate(4));
        kassert!(reporter.proc_read(&slice, &mut offset) == Ok(4));
        kassert!(mem.peek(0x2000, 4).unwrap() == b"Size");
    });

    test_case!(test_always_uses_offset, {
        let reporter = DiagnosticReporter::new(device_with(b"hi", 16), ReportPolicy::Always);
        let expected = reporter.render();
        let mem = UserMemory::new();
        let out = mem.map(0x2000, 256).unwrap();
        let slice = UserSlice::new(&mem, out.truncate(10));

        let mut offset = 0;
        let mut collected = alloc::vec::Vec::new();
        loop {
            let n = reporter.proc_read(&slice, &mut offset).unwrap();
            if n == 0 {
                break;
            }
            collected.extend(mem.peek(0x2000, n).unwrap());
        }
        kassert!(collected == expected.as_bytes());
        kassert!(offset == expected.len());
        kassert!(reporter.proc_read(&slice, &mut offset) == Ok(0));
    });

    test_case!(test_partial_copy, {
        let reporter = DiagnosticReporter::new(device_with(b"hi", 16), ReportPolicy::Always);
        let mem = UserMemory::new();
        mem.map(0x2000, 6).unwrap();

        // 用户声明 64 字节，但只有前 6 字节可写
        let slice = UserSlice::new(&mem, UserBuffer::new(0x2000, 64));
        let mut offset = 0;
        kassert!(reporter.proc_read(&slice, &mut offset) == Ok(6));
        kassert!(offset == 6);
        kassert!(mem.peek(0x2000, 6).unwrap() == b"Size o");

        let bad = UserSlice::new(&mem, UserBuffer::new(0x9000, 64));
        kassert!(reporter.proc_read(&bad, &mut offset) == Err(ChrdevError::Fault));
        kassert!(offset == 6);
    });
}
