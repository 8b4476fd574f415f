//! 测试工具
//!
//! 主机上运行的测试沿用内核测试的写法：`test_case!` 定义用例，`kassert!` 断言。
