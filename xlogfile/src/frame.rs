//! 帧结构与校验
//!
//! 帧格式：
//! ```text
//! ┌───────┬───────┬────────────┬──────────┬────────┬───────────┬─────────┬─────────┐
//! │ magic │ seq   │ begin_hour │ end_hour │ length │ crypt_key │ payload │ trailer │
//! │ 1B    │ 2B LE │ 1B         │ 1B       │ 4B LE  │ 4B/64B    │ N bytes │ 0x00    │
//! └───────┴───────┴────────────┴──────────┴────────┴───────────┴─────────┴─────────┘
//! ```
//!
//! magic 同时决定密钥区长度（旧版三种 magic 为 4 字节，其余 64 字节）
//! 和负载的编码方式。length 不含帧头和尾部终止字节。

use crate::constants::MAGIC_END;

/// 固定头部大小: magic(1) + seq(2) + begin_hour(1) + end_hour(1) + length(4)
const FIXED_HEADER_SIZE: usize = 9;

/// 负载编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// 原样输出（未压缩或已加密的负载）
    Plain,
    /// raw-DEFLATE，无 zlib/gzip 包装
    Deflate,
    /// `[len:2 LE][bytes]` 子块连接后整体 raw-DEFLATE
    DeflateChunked,
    /// ZSTD
    Zstd,
}

/// 帧变体标记，取值即帧首字节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Magic {
    NoCompressStart = 0x03,
    CompressStart = 0x04,
    CompressStart1 = 0x05,
    NoCompressStart1 = 0x06,
    CompressStart2 = 0x07,
    NoCompressNoCryptStart = 0x08,
    CompressNoCryptStart = 0x09,
    SyncZstdStart = 0x0A,
    SyncNoCryptZstdStart = 0x0B,
    AsyncZstdStart = 0x0C,
    AsyncNoCryptZstdStart = 0x0D,
}

impl Magic {
    /// 识别帧首字节，未知值返回 None
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x03 => Some(Magic::NoCompressStart),
            0x04 => Some(Magic::CompressStart),
            0x05 => Some(Magic::CompressStart1),
            0x06 => Some(Magic::NoCompressStart1),
            0x07 => Some(Magic::CompressStart2),
            0x08 => Some(Magic::NoCompressNoCryptStart),
            0x09 => Some(Magic::CompressNoCryptStart),
            0x0A => Some(Magic::SyncZstdStart),
            0x0B => Some(Magic::SyncNoCryptZstdStart),
            0x0C => Some(Magic::AsyncZstdStart),
            0x0D => Some(Magic::AsyncNoCryptZstdStart),
            _ => None,
        }
    }

    /// 密钥区长度
    ///
    /// 只有旧版三种 magic 是 4 字节；0x06/0x07 虽然沿用旧命名，
    /// 密钥区已经是 64 字节。
    pub fn crypt_key_len(self) -> usize {
        match self {
            Magic::NoCompressStart | Magic::CompressStart | Magic::CompressStart1 => 4,
            _ => 64,
        }
    }

    /// 帧头总长（13 或 73 字节）
    pub fn header_len(self) -> usize {
        FIXED_HEADER_SIZE + self.crypt_key_len()
    }

    /// 负载编码方式
    pub fn codec(self) -> Codec {
        match self {
            Magic::NoCompressStart
            | Magic::NoCompressStart1
            | Magic::CompressStart2
            | Magic::NoCompressNoCryptStart => Codec::Plain,
            Magic::CompressStart | Magic::CompressNoCryptStart => Codec::Deflate,
            Magic::CompressStart1 => Codec::DeflateChunked,
            Magic::SyncZstdStart
            | Magic::SyncNoCryptZstdStart
            | Magic::AsyncZstdStart
            | Magic::AsyncNoCryptZstdStart => Codec::Zstd,
        }
    }
}

/// 帧头字段（密钥区内容不参与解码，不保留）
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub magic: Magic,
    pub seq: u16,
    pub begin_hour: u8,
    pub end_hour: u8,
    pub length: u32,
}

impl FrameHeader {
    /// 从 offset 处解析帧头，magic 未知或头部越界时返回 None
    pub fn parse(buffer: &[u8], offset: usize) -> Option<Self> {
        let magic = Magic::from_byte(*buffer.get(offset)?)?;
        if offset + magic.header_len() > buffer.len() {
            return None;
        }

        let seq = u16::from_le_bytes([buffer[offset + 1], buffer[offset + 2]]);
        let begin_hour = buffer[offset + 3];
        let end_hour = buffer[offset + 4];
        let length = u32::from_le_bytes([
            buffer[offset + 5],
            buffer[offset + 6],
            buffer[offset + 7],
            buffer[offset + 8],
        ]);

        Some(Self {
            magic,
            seq,
            begin_hour,
            end_hour,
            length,
        })
    }

    /// 帧头总长
    pub fn header_len(&self) -> usize {
        self.magic.header_len()
    }

    /// 整帧大小（帧头 + 负载 + 尾部终止字节）
    pub fn frame_size(&self) -> usize {
        self.header_len() + self.length as usize + 1
    }
}

/// 校验从 offset 开始的至多 count 个连续帧
///
/// 恰好走到缓冲末尾视为有效边界。返回 Err 时携带首个违例的诊断文本，
/// 该文本会原样进入输出中的错误标记，格式不可改动。
pub fn is_valid_log_buffer(buffer: &[u8], offset: usize, count: u32) -> Result<(), String> {
    let mut current_offset = offset;
    let mut remaining = count;

    loop {
        if current_offset >= buffer.len() {
            return Ok(());
        }

        let magic_byte = buffer[current_offset];
        let magic = match Magic::from_byte(magic_byte) {
            Some(magic) => magic,
            None => {
                return Err(format!(
                    "buffer[{}]:{} != MAGIC_NUM_START",
                    current_offset, magic_byte
                ));
            }
        };

        let header_len = magic.header_len();
        if current_offset + header_len + 1 + 1 > buffer.len() {
            return Err(format!(
                "offset:{} > buffer size:{}",
                current_offset + header_len + 1 + 1,
                buffer.len()
            ));
        }

        let length = u32::from_le_bytes([
            buffer[current_offset + 5],
            buffer[current_offset + 6],
            buffer[current_offset + 7],
            buffer[current_offset + 8],
        ]) as usize;

        if current_offset + header_len + length + 1 > buffer.len() {
            return Err(format!(
                "log length:{}, end pos {} > buffer size:{}",
                length,
                current_offset + header_len + length + 1,
                buffer.len()
            ));
        }

        let trailer_pos = current_offset + header_len + length;
        if buffer[trailer_pos] != MAGIC_END {
            return Err(format!(
                "log length:{}, buffer[{}]:{} != MAGIC_END",
                length, trailer_pos, buffer[trailer_pos]
            ));
        }

        remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            return Ok(());
        }
        current_offset += header_len + length + 1;
    }
}

/// 向后扫描，返回首个能通过校验的帧起点
///
/// 只在字节值为已知 magic 的位置尝试校验。扫不到时返回 0，
/// 由调用方从头重试并产出一条错误标记，而不是静默丢弃数据。
pub fn find_log_start(buffer: &[u8], count: u32) -> usize {
    let mut offset = 0;
    while offset < buffer.len() {
        if Magic::from_byte(buffer[offset]).is_some()
            && is_valid_log_buffer(buffer, offset, count).is_ok()
        {
            return offset;
        }
        offset += 1;
    }

    0
}
