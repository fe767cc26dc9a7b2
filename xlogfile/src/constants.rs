//! 常量定义
//!
//! XLOG 容器格式的 magic 值和文件扩展名定义

/// 无压缩，旧版 4 字节密钥区
pub const MAGIC_NO_COMPRESS_START: u8 = 0x03;
/// raw-DEFLATE 压缩，旧版 4 字节密钥区
pub const MAGIC_COMPRESS_START: u8 = 0x04;
/// 长度前缀分段的 raw-DEFLATE 压缩，旧版 4 字节密钥区
pub const MAGIC_COMPRESS_START1: u8 = 0x05;
/// 无压缩，64 字节密钥区
pub const MAGIC_NO_COMPRESS_START1: u8 = 0x06;
/// 已加密压缩数据，解码器不做解密，负载原样输出
pub const MAGIC_COMPRESS_START2: u8 = 0x07;
/// 无压缩无加密
pub const MAGIC_NO_COMPRESS_NO_CRYPT_START: u8 = 0x08;
/// raw-DEFLATE 压缩，无加密
pub const MAGIC_COMPRESS_NO_CRYPT_START: u8 = 0x09;
/// ZSTD 同步压缩
pub const MAGIC_SYNC_ZSTD_START: u8 = 0x0A;
/// ZSTD 同步压缩，无加密
pub const MAGIC_SYNC_NO_CRYPT_ZSTD_START: u8 = 0x0B;
/// ZSTD 异步压缩
pub const MAGIC_ASYNC_ZSTD_START: u8 = 0x0C;
/// ZSTD 异步压缩，无加密
pub const MAGIC_ASYNC_NO_CRYPT_ZSTD_START: u8 = 0x0D;
/// 帧尾终止字节
pub const MAGIC_END: u8 = 0x00;

/// XLOG 文件扩展名
pub const XLOG_FILE_EXT: &str = ".xlog";
/// mmap 缓冲文件扩展名
pub const MMAP_FILE_EXT: &str = ".mmap3";
/// 解码产物的文件名后缀
pub const DECODED_FILE_SUFFIX: &str = "_.log";
