//! 文件类型与权限位

bitflags::bitflags! {
    /// 文件权限和类型（与 POSIX 兼容）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileMode: u32 {
        /// 文件类型掩码
        const S_IFMT = 0o170000;
        /// 普通文件
        const S_IFREG = 0o100000;
        /// 目录
        const S_IFDIR = 0o040000;
        /// 字符设备
        const S_IFCHR = 0o020000;

        // 用户权限
        /// 用户读
        const S_IRUSR = 0o400;
        /// 用户写
        const S_IWUSR = 0o200;
        /// 用户执行
        const S_IXUSR = 0o100;

        // 组权限
        /// 组读
        const S_IRGRP = 0o040;
        /// 组写
        const S_IWGRP = 0o020;
        /// 组执行
        const S_IXGRP = 0o010;

        // 其他用户权限
        /// 其他读
        const S_IROTH = 0o004;
        /// 其他写
        const S_IWOTH = 0o002;
        /// 其他执行
        const S_IXOTH = 0o001;
    }
}

impl FileMode {
    /// 检查是否有读权限（暂时只检查用户权限）
    pub fn can_read(&self) -> bool {
        self.contains(FileMode::S_IRUSR)
    }

    /// 检查是否有写权限
    pub fn can_write(&self) -> bool {
        self.contains(FileMode::S_IWUSR)
    }

    /// 权限位（去掉文件类型）
    pub fn permissions(&self) -> u32 {
        self.bits() & 0o777
    }

    /// 是否为字符设备
    pub fn is_char_device(&self) -> bool {
        self.bits() & FileMode::S_IFMT.bits() == FileMode::S_IFCHR.bits()
    }

    /// 是否为目录
    pub fn is_dir(&self) -> bool {
        self.bits() & FileMode::S_IFMT.bits() == FileMode::S_IFDIR.bits()
    }
}
