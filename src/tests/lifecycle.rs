use super::*;
use crate::kernel::FailPoints;
use crate::module::{SetupStage, is_loaded, module_exit, module_init};
use crate::vfs::{major, minor};

/// 每个注入点以及对应的错误
const FAILURES: [(FailPoints, ChrdevError); 6] = [
    (FailPoints::ALLOC_REGION, ChrdevError::Busy),
    (FailPoints::CDEV_ADD, ChrdevError::NoMemory),
    (FailPoints::CLASS_CREATE, ChrdevError::NoMemory),
    (FailPoints::DEVICE_CREATE, ChrdevError::NoMemory),
    (FailPoints::PROC_MKDIR, ChrdevError::NoMemory),
    (FailPoints::PROC_CREATE, ChrdevError::NoMemory),
];

test_case!(test_load_creates_everything, {
    let fx = Fixture::new();
    let devt = fx.module().devt();

    kassert!(fx.kernel.has_region(devt));
    kassert!(fx.kernel.cdev_count() == 1);
    kassert!(fx.kernel.class_exists("chrdev"));
    kassert!(fx.kernel.dev_node("chrdev0").is_some_and(|n| n.rdev == devt));
    kassert!(fx.kernel.proc_exists("chrdev_example_dir"));
    kassert!(fx.kernel.proc_exists("chrdev_example_dir/chrdev_example"));

    // 第一次动态分配取最高的动态主设备号
    kassert!(major(devt) == 254 && minor(devt) == 0);
});

test_case!(test_failure_at_each_stage_cleans_up, {
    for (point, err) in FAILURES {
        let kernel = Arc::new(Kernel::new());
        kernel.inject_failure(point);
        kassert!(ChrdevModule::init(&kernel, ChrdevConfig::default()).err() == Some(err));
        kassert!(kernel.is_idle());

        // 故障是一次性的，重试成功
        let module = ChrdevModule::init(&kernel, ChrdevConfig::default()).unwrap();
        kassert!(module.stages().len() == 6);
        module.exit();
        kassert!(kernel.is_idle());
    }
});

test_case!(test_unload_removes_everything, {
    let mut fx = Fixture::new();
    let path = fx.module().node_path();
    fx.unload();

    kassert!(fx.kernel.is_idle());
    kassert!(fx.kernel.open(&path, OpenFlags::O_RDWR, fx.mem.clone()).err() == Some(ChrdevError::NotFound));
});

test_case!(test_reload_after_unload, {
    let kernel = Arc::new(Kernel::new());
    let first = ChrdevModule::init(&kernel, ChrdevConfig::default()).unwrap();
    let devt = first.devt();
    first.exit();

    let second = ChrdevModule::init(&kernel, ChrdevConfig::default()).unwrap();
    kassert!(second.devt() == devt);
});

test_case!(test_conflicting_second_instance, {
    let fx = Fixture::new();
    let dev = fx.open(OpenFlags::O_RDWR).unwrap();
    fx.write(dev.as_ref(), b"first").unwrap();

    // 同名 class 已存在
    kassert!(
        ChrdevModule::init(&fx.kernel, ChrdevConfig::default()).err() == Some(ChrdevError::AlreadyExists)
    );

    // 第一个实例不受影响
    kassert!(fx.kernel.region_count() == 1);
    kassert!(fx.kernel.cdev_count() == 1);
    kassert!(fx.read(dev.as_ref(), 64).unwrap() == b"first");
});

test_case!(test_custom_names, {
    let config = ChrdevConfig::default()
        .with_class_name("demo")
        .with_node_name("demo0")
        .with_proc_names("demo_dir", "status");
    let fx = Fixture::with_config(config);

    kassert!(fx.module().node_path() == "/dev/demo0");
    kassert!(fx.module().proc_path() == "/proc/demo_dir/status");
    kassert!(fx.open(OpenFlags::O_RDWR).is_ok());
    kassert!(fx.open_proc().is_ok());
});

test_case!(test_handle_outlives_unload, {
    let mut fx = Fixture::new();
    let dev = fx.open(OpenFlags::O_RDWR).unwrap();
    let device = fx.module().device().clone();
    fx.unload();

    kassert!(device.is_open());
    drop(dev);
    kassert!(!device.is_open());
});

test_case!(test_stage_order, {
    let fx = Fixture::new();
    kassert!(fx.module().stages().first() == Some(&SetupStage::Region));
    kassert!(fx.module().stages().last() == Some(&SetupStage::ProcFile));
});

// 唯一使用全局内核的测试
test_case!(test_global_module_init_exit, {
    kassert!(module_init() == 0);
    kassert!(is_loaded());
    kassert!(module_init() == -17);

    let mem = Arc::new(UserMemory::new());
    let buf = mem.map(USER_BASE, 16).unwrap();
    mem.poke(USER_BASE, b"hello").unwrap();
    {
        let file = crate::kernel::KERNEL
            .open("/dev/chrdev0", OpenFlags::O_RDWR, mem.clone())
            .unwrap();
        kassert!(file.write(buf.truncate(5)) == Ok(5));
        kassert!(file.read(buf) == Ok(5));
    }

    module_exit();
    kassert!(!is_loaded());
    kassert!(crate::kernel::KERNEL.is_idle());
    // 未加载时卸载无操作
    module_exit();
});
