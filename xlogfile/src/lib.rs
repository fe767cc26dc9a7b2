//! xlogfile - Mars XLOG 日志文件解码库
//!
//! 解码移动端 Mars XLOG appender 产生的帧式二进制日志文件。
//! 这类文件常见截断、跨进程重启拼接和局部损坏，解码以容错为先：
//! - 逐帧校验 magic/length/trailer 不变量
//! - 损坏区域向后扫描重新同步，跳过距离写成错误标记
//! - 11 种 magic 变体共用一个容器布局，按 magic 分发解压
//! - 16 位序列号断档以标记形式报告，不致命
//!
//! 帧格式：
//! ```text
//! ┌───────┬───────┬────────────┬──────────┬────────┬───────────┬─────────┬─────────┐
//! │ magic │ seq   │ begin_hour │ end_hour │ length │ crypt_key │ payload │ trailer │
//! │ 1B    │ 2B LE │ 1B         │ 1B       │ 4B LE  │ 4B/64B    │ N bytes │ 0x00    │
//! └───────┴───────┴────────────┴──────────┴────────┴───────────┴─────────┴─────────┘
//! ```
//!
//! 不做解密：密钥区被跳过，加密帧的负载原样进入输出。

pub mod compress;
pub mod constants;
pub mod decoder;
pub mod fileio;
pub mod frame;


pub use decoder::{DecodeError, XlogDecoder};
pub use frame::{Codec, FrameHeader, Magic};
