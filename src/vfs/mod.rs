//! 文件抽象：打开的文件、文件类型与权限位、设备号

pub mod dev;
pub mod file;
pub mod mode;

pub use dev::{major, makedev, minor};
pub use file::{File, FileInfo, FileMetadata, OpenFlags, SeekWhence};
pub use mode::FileMode;
