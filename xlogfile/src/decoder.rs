//! XLOG 文件解码器
//!
//! 以容错方式解析 XLOG 容器：逐帧校验、按 magic 分发解压、
//! 检测序列号断档，数据损坏时向后扫描重新同步。
//! 解码尽量多的可读内容，而不是在第一个坏字节上失败；
//! 可恢复的错误以标记行的形式内联写入输出。

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::compress;
use crate::constants::{
    DECODED_FILE_SUFFIX, MAGIC_ASYNC_NO_CRYPT_ZSTD_START, MAGIC_ASYNC_ZSTD_START,
    MAGIC_COMPRESS_NO_CRYPT_START, MAGIC_COMPRESS_START, MAGIC_COMPRESS_START1,
    MAGIC_COMPRESS_START2, MAGIC_NO_COMPRESS_NO_CRYPT_START, MAGIC_NO_COMPRESS_START,
    MAGIC_NO_COMPRESS_START1, MAGIC_SYNC_NO_CRYPT_ZSTD_START, MAGIC_SYNC_ZSTD_START,
    MMAP_FILE_EXT, XLOG_FILE_EXT,
};
use crate::frame::{self, Codec, FrameHeader, Magic};

/// 解码错误
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("file does not exist: {0}")]
    FileNotFound(String),
    #[error("input file is empty: {0}")]
    EmptyFile(String),
    #[error("no valid log data found in file: {0}")]
    NoValidData(String),
    #[error("ZIP decoding is not implemented")]
    ZipNotImplemented,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// XLOG 解码器
///
/// `last_seq` 是唯一的跨帧状态，每次 `decode_file` 开始时重置，
/// 因此多个文件各用一个实例即可安全并行。
pub struct XlogDecoder {
    last_seq: u16,
}

impl Default for XlogDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl XlogDecoder {
    pub fn new() -> Self {
        Self { last_seq: 0 }
    }

    /// 判断扩展名是否为已知的 XLOG 文件
    pub fn is_xlog_file(path: &str) -> bool {
        path.ends_with(XLOG_FILE_EXT) || path.ends_with(MMAP_FILE_EXT)
    }

    /// 探测 v2 格式：首字节为旧版 magic
    pub fn is_mars_xlog_v2(path: &Path) -> bool {
        match read_first_bytes::<1>(path) {
            Some([magic]) => matches!(
                magic,
                MAGIC_NO_COMPRESS_START
                    | MAGIC_NO_COMPRESS_START1
                    | MAGIC_COMPRESS_START
                    | MAGIC_COMPRESS_START1
                    | MAGIC_COMPRESS_START2
                    | MAGIC_NO_COMPRESS_NO_CRYPT_START
                    | MAGIC_COMPRESS_NO_CRYPT_START
            ),
            None => false,
        }
    }

    /// 探测 v3 格式：首字节为 ZSTD 系 magic
    pub fn is_mars_xlog_v3(path: &Path) -> bool {
        match read_first_bytes::<1>(path) {
            Some([magic]) => matches!(
                magic,
                MAGIC_SYNC_ZSTD_START
                    | MAGIC_SYNC_NO_CRYPT_ZSTD_START
                    | MAGIC_ASYNC_ZSTD_START
                    | MAGIC_ASYNC_NO_CRYPT_ZSTD_START
            ),
            None => false,
        }
    }

    /// 探测 ZIP 格式：前四字节为 `PK\x03\x04`
    pub fn is_zip_file(path: &Path) -> bool {
        matches!(read_first_bytes::<4>(path), Some([b'P', b'K', 0x03, 0x04]))
    }

    /// 生成输出文件名：`input.xlog` -> `input_.log`，
    /// 其他扩展名直接追加 `_.log`，目录部分保持不变
    pub fn generate_output_filename(input_file: &str) -> String {
        if let Some(stem) = input_file.strip_suffix(XLOG_FILE_EXT) {
            format!("{}{}", stem, DECODED_FILE_SUFFIX)
        } else if let Some(stem) = input_file.strip_suffix(MMAP_FILE_EXT) {
            format!("{}{}", stem, DECODED_FILE_SUFFIX)
        } else {
            format!("{}{}", input_file, DECODED_FILE_SUFFIX)
        }
    }

    /// 解码单个文件
    ///
    /// 整个文件读入内存后按首字节分类：XLOG v2/v3 走帧解析；
    /// ZIP 未实现；未知格式先按 XLOG 尝试，失败后落到 ZIP 路径
    /// （同样未实现）。
    pub fn decode_file(
        &mut self,
        input_file: &str,
        output_file: &str,
        skip_error_blocks: bool,
    ) -> Result<(), DecodeError> {
        let input_path = Path::new(input_file);
        if !input_path.exists() {
            return Err(DecodeError::FileNotFound(input_file.to_string()));
        }

        let buffer = fs::read(input_file)?;
        if buffer.is_empty() {
            return Err(DecodeError::EmptyFile(input_file.to_string()));
        }

        // 序列号状态按文件重置
        self.last_seq = 0;

        if Self::is_mars_xlog_v2(input_path) || Self::is_mars_xlog_v3(input_path) {
            debug!("detected Mars Xlog format: {}", input_file);
            self.parse_xlog_buffer(&buffer, input_file, output_file, skip_error_blocks)
        } else if Self::is_zip_file(input_path) {
            debug!("detected ZIP format: {}", input_file);
            Err(DecodeError::ZipNotImplemented)
        } else {
            debug!("unknown format, trying Mars Xlog decoding: {}", input_file);
            match self.parse_xlog_buffer(&buffer, input_file, output_file, skip_error_blocks) {
                Ok(()) => Ok(()),
                Err(err) => {
                    debug!("Mars Xlog decoding failed ({}), trying ZIP format", err);
                    Err(DecodeError::ZipNotImplemented)
                }
            }
        }
    }

    /// 解析缓冲区并写出解码结果
    fn parse_xlog_buffer(
        &mut self,
        buffer: &[u8],
        input_file: &str,
        output_file: &str,
        skip_error_blocks: bool,
    ) -> Result<(), DecodeError> {
        let output = self
            .parse_buffer(buffer, skip_error_blocks)
            .ok_or_else(|| DecodeError::NoValidData(input_file.to_string()))?;

        fs::write(output_file, &output)?;
        Ok(())
    }

    /// 解析整个缓冲区
    ///
    /// 候选起点为偏移 0 加上所有字节值为已知 magic 的位置。
    /// 依次从每个候选起点循环解帧，第一个产出非空数据的候选即为结果；
    /// 偏移 0 覆盖完好的文件，后面的候选用来救回开头损坏的文件。
    pub fn parse_buffer(&mut self, buffer: &[u8], skip_error_blocks: bool) -> Option<Vec<u8>> {
        let mut start_positions = vec![0usize];
        for (i, &value) in buffer.iter().enumerate().skip(1) {
            if Magic::from_byte(value).is_some() {
                start_positions.push(i);
            }
        }

        for start_pos in start_positions {
            let mut temp_buffer = Vec::new();
            let mut current_pos = start_pos;

            while current_pos < buffer.len() {
                match self.decode_block(buffer, current_pos, &mut temp_buffer, skip_error_blocks)
                {
                    Some(next_pos) => current_pos = next_pos,
                    None => break,
                }
            }

            if !temp_buffer.is_empty() {
                return Some(temp_buffer);
            }
        }

        None
    }

    /// 解码 offset 处的一个帧，追加到输出，返回下一帧的偏移
    ///
    /// 校验失败且允许跳过时，在后缀上扫描下一个可信帧起点，
    /// 跳过的距离和原因写成错误标记；不允许跳过则直接结束本轮。
    /// 返回 None 表示本候选起点的解析到此为止。
    pub(crate) fn decode_block(
        &mut self,
        buffer: &[u8],
        offset: usize,
        output_buffer: &mut Vec<u8>,
        skip_error_blocks: bool,
    ) -> Option<usize> {
        if offset >= buffer.len() {
            return None;
        }

        let mut offset = offset;
        if let Err(reason) = frame::is_valid_log_buffer(buffer, offset, 1) {
            if !skip_error_blocks {
                return None;
            }

            let fix_pos = frame::find_log_start(&buffer[offset..], 1);
            let error_msg = format!("[F]xlog_decode error len={}, result:{}\n", fix_pos, reason);
            output_buffer.extend_from_slice(error_msg.as_bytes());
            offset += fix_pos;
        }

        let magic_byte = buffer[offset];
        let header = match FrameHeader::parse(buffer, offset) {
            Some(header) => header,
            None => {
                // 重新同步失败后仍停在坏数据上。未知 magic 按原始格式
                // 报告；帧头越界时直接结束，绝不读出界。
                if Magic::from_byte(magic_byte).is_none() {
                    let error_msg = format!(
                        "in DecodeBuffer buffer[{}]:{} != MAGIC_NUM_START\n",
                        offset, magic_byte
                    );
                    output_buffer.extend_from_slice(error_msg.as_bytes());
                }
                return None;
            }
        };

        let payload_start = offset + header.header_len();
        let payload_end = payload_start + header.length as usize;
        if payload_end >= buffer.len() {
            // 负载越界只出现在重新同步失败的路径上，
            // 错误标记已写入，结束本轮而不是追加残缺负载
            return None;
        }
        let payload = &buffer[payload_start..payload_end];

        // 序列号断档检测。seq 为 0/1 的帧不参与（0 是未启用，
        // 1 是每次进程重启后的重新计数）
        let seq = header.seq;
        if seq != 0 && seq != 1 && self.last_seq != 0 && u32::from(seq) != u32::from(self.last_seq) + 1
        {
            let warning = format!(
                "[F]xlog_decode log seq:{}-{} is missing\n",
                u32::from(self.last_seq) + 1,
                seq - 1
            );
            output_buffer.extend_from_slice(warning.as_bytes());
        }
        if seq != 0 {
            self.last_seq = seq;
        }

        match header.magic.codec() {
            Codec::Plain => output_buffer.extend_from_slice(payload),
            Codec::Deflate => match compress::inflate_raw(payload) {
                Ok(data) => output_buffer.extend_from_slice(&data),
                Err(err) => {
                    debug!("deflate payload at offset {} failed: {}", offset, err);
                    output_buffer.extend_from_slice(b"[F]xlog_decode decompress error\n");
                }
            },
            Codec::DeflateChunked => {
                let dearmored = dearmor_chunked(payload);
                match compress::inflate_raw(&dearmored) {
                    Ok(data) => output_buffer.extend_from_slice(&data),
                    Err(err) => {
                        debug!("chunked deflate payload at offset {} failed: {}", offset, err);
                        output_buffer.extend_from_slice(b"[F]xlog_decode decompress error\n");
                    }
                }
            }
            Codec::Zstd => match compress::decompress_zstd(payload) {
                Ok(data) => output_buffer.extend_from_slice(&data),
                Err(err) if err.kind() == std::io::ErrorKind::OutOfMemory => {
                    let error_msg = format!("[F]xlog_decode decompress error: {}\n", err);
                    output_buffer.extend_from_slice(error_msg.as_bytes());
                }
                Err(err) => {
                    debug!("zstd payload at offset {} failed: {}", offset, err);
                    output_buffer.extend_from_slice(b"[F]xlog_decode ZSTD decompress error\n");
                }
            },
        }

        Some(offset + header.frame_size())
    }
}

/// 剥掉 0x05 帧负载里的长度前缀
///
/// 负载由 `[len:2 LE][data:len]` 子块连接而成，压缩流被按块切开存放；
/// 拼回完整压缩流后才能解压。残缺的尾部子块直接忽略。
fn dearmor_chunked(payload: &[u8]) -> Vec<u8> {
    let mut decompress_data = Vec::with_capacity(payload.len());
    let mut pos = 0;

    while pos + 2 <= payload.len() {
        let single_log_len =
            u16::from_le_bytes([payload[pos], payload[pos + 1]]) as usize;
        pos += 2;

        if pos + single_log_len > payload.len() {
            break;
        }

        decompress_data.extend_from_slice(&payload[pos..pos + single_log_len]);
        pos += single_log_len;
    }

    decompress_data
}

/// 读取文件开头 N 个字节，打不开或不足 N 字节时返回 None
fn read_first_bytes<const N: usize>(path: &Path) -> Option<[u8; N]> {
    let mut file = File::open(path).ok()?;
    let mut buf = [0u8; N];
    file.read_exact(&mut buf).ok()?;
    Some(buf)
}
