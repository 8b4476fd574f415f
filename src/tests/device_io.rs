use super::*;
use crate::vfs::SeekWhence;

test_case!(test_write_then_read_roundtrip, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();

    kassert!(fx.write(file.as_ref(), b"hello") == Ok(5));
    kassert!(fx.read(file.as_ref(), 5).unwrap() == b"hello");
    // 读取是破坏性的
    kassert!(fx.read(file.as_ref(), 5).unwrap().is_empty());
});

test_case!(test_oversized_write_truncated, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();

    let data = [b'A'; 2000];
    kassert!(fx.write(file.as_ref(), &data) == Ok(1024));
    kassert!(fx.module().device().len() == 1024);

    let back = fx.read(file.as_ref(), 4096).unwrap();
    kassert!(back.len() == 1024);
    kassert!(back.iter().all(|&b| b == b'A'));
});

test_case!(test_write_replaces_previous_contents, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();

    fx.write(file.as_ref(), b"first write").unwrap();
    fx.write(file.as_ref(), b"2nd").unwrap();
    kassert!(fx.read(file.as_ref(), 64).unwrap() == b"2nd");
});

test_case!(test_short_read_still_drains, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();

    fx.write(file.as_ref(), b"hello").unwrap();
    kassert!(fx.read(file.as_ref(), 2).unwrap() == b"he");
    kassert!(fx.read(file.as_ref(), 5).unwrap().is_empty());
});

test_case!(test_empty_write, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();

    fx.write(file.as_ref(), b"abc").unwrap();
    kassert!(fx.write(file.as_ref(), b"") == Ok(0));
    kassert!(fx.module().device().is_empty());
});

test_case!(test_second_open_busy, {
    let fx = Fixture::new();
    let first = fx.open(OpenFlags::O_RDWR).unwrap();
    kassert!(fx.open(OpenFlags::O_RDONLY).err() == Some(ChrdevError::Busy));
    kassert!(ChrdevError::Busy.to_errno() == -16);

    drop(first);
    kassert!(fx.open(OpenFlags::O_RDONLY).is_ok());
});

test_case!(test_data_survives_close, {
    let fx = Fixture::new();
    let writer = fx.open(OpenFlags::O_WRONLY).unwrap();
    fx.write(writer.as_ref(), b"persist").unwrap();
    drop(writer);

    let reader = fx.open(OpenFlags::O_RDONLY).unwrap();
    kassert!(fx.read(reader.as_ref(), 64).unwrap() == b"persist");
});

test_case!(test_read_fault_keeps_length, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();
    fx.write(file.as_ref(), b"hello").unwrap();

    let unmapped = UserBuffer::new(0x10_0000, 5);
    kassert!(file.read(unmapped) == Err(ChrdevError::Fault));
    kassert!(fx.module().device().len() == 5);
    kassert!(fx.read(file.as_ref(), 5).unwrap() == b"hello");
});

test_case!(test_read_partial_fault_keeps_length, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();
    fx.write(file.as_ref(), b"hello").unwrap();

    // 只有前 2 字节可写
    let straddling = UserBuffer::new(USER_BASE + USER_LEN - 2, 5);
    kassert!(file.read(straddling) == Err(ChrdevError::Fault));
    kassert!(fx.module().device().len() == 5);
});

test_case!(test_write_fault_keeps_length, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();
    fx.write(file.as_ref(), b"abc").unwrap();

    let unmapped = UserBuffer::new(0x10_0000, 8);
    kassert!(file.write(unmapped) == Err(ChrdevError::Fault));
    kassert!(fx.module().device().len() == 3);
});

test_case!(test_access_mode_enforced, {
    let fx = Fixture::new();
    let ro = fx.open(OpenFlags::O_RDONLY).unwrap();
    kassert!(fx.write(ro.as_ref(), b"x") == Err(ChrdevError::BadFileDescriptor));
    drop(ro);

    let wo = fx.open(OpenFlags::O_WRONLY).unwrap();
    kassert!(fx.read(wo.as_ref(), 1) == Err(ChrdevError::BadFileDescriptor));
});

test_case!(test_device_is_a_stream, {
    let fx = Fixture::new();
    let file = fx.open(OpenFlags::O_RDWR).unwrap();
    kassert!(file.lseek(0, SeekWhence::Set) == Err(ChrdevError::NotSupported));

    let meta = file.metadata();
    kassert!(meta.mode.is_char_device());
    kassert!(meta.mode.permissions() == 0o666);
    kassert!(meta.rdev == fx.module().devt());
});

test_case!(test_custom_capacity, {
    let fx = Fixture::with_config(ChrdevConfig::default().with_capacity(8));
    let file = fx.open(OpenFlags::O_RDWR).unwrap();
    kassert!(fx.write(file.as_ref(), b"0123456789") == Ok(8));
    kassert!(fx.read(file.as_ref(), 64).unwrap() == b"01234567");
});
