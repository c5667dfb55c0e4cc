//! 日志输出。浏览器中写入 console，本地构建（命令行工具和测试）写入标准输出

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;
#[cfg(target_arch = "wasm32")]
use web_sys::console;

#[macro_export]
macro_rules! console_log {
    ($($arg:tt)*) => { $crate::logging::log(&format!($($arg)*)) };
}

#[macro_export]
macro_rules! console_warn {
    ($($arg:tt)*) => { $crate::logging::warn(&format!($($arg)*)) };
}

#[macro_export]
macro_rules! console_error {
    ($($arg:tt)*) => { $crate::logging::error(&format!($($arg)*)) };
}

#[cfg(target_arch = "wasm32")]
pub fn log(message: &str) {
    console::log_1(&JsValue::from_str(message));
}

#[cfg(target_arch = "wasm32")]
pub fn warn(message: &str) {
    console::warn_1(&JsValue::from_str(message));
}

#[cfg(target_arch = "wasm32")]
pub fn error(message: &str) {
    console::error_1(&JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(message: &str) {
    println!("{}", message);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(message: &str) {
    eprintln!("警告: {}", message);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn error(message: &str) {
    eprintln!("错误: {}", message);
}
