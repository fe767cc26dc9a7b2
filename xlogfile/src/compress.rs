//! 解压适配层
//!
//! XLOG 负载要么是 raw-DEFLATE（无 zlib/gzip 包装），要么是 ZSTD。
//! 两种解压都是整体成功才返回数据；失败时部分输出被丢弃，
//! 由调用方写入错误标记。解压器按调用创建，返回时释放。

use std::io::{self, Read};

use flate2::read::DeflateDecoder;

/// 解压输出上限（1GB），防止损坏的 size 字段导致超大分配
const MAX_DECOMPRESSED_SIZE: u64 = 1024 * 1024 * 1024;

/// raw-DEFLATE 解压
///
/// 只有流自然结束才算成功，截断的流报错。空输入产出空输出。
pub fn inflate_raw(input: &[u8]) -> io::Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut decoder = DeflateDecoder::new(input);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    Ok(output)
}

/// ZSTD 解压
///
/// 帧头声明了内容大小时按该大小一次性解压，
/// 大小未知时退回流式解压。
pub fn decompress_zstd(input: &[u8]) -> io::Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    match zstd::zstd_safe::get_frame_content_size(input) {
        Ok(Some(content_size)) if content_size > MAX_DECOMPRESSED_SIZE => Err(io::Error::new(
            io::ErrorKind::OutOfMemory,
            format!("declared content size too large: {} bytes", content_size),
        )),
        Ok(Some(content_size)) => zstd::bulk::decompress(input, content_size as usize),
        _ => {
            let mut decoder = zstd::stream::read::Decoder::new(input)?;
            let mut output = Vec::new();
            decoder.read_to_end(&mut output)?;
            Ok(output)
        }
    }
}
