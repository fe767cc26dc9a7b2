//! xlog_decode 命令行工具
//!
//! 用法：
//!   xlog_decode decode <path>                  # 解码文件或目录（默认递归）
//!   xlog_decode decode --no-recursive <dir>    # 只处理顶层目录
//!   xlog_decode decode --keep-errors <path>    # 不跳过损坏的块
//!   xlog_decode clean <dir>                    # 删除解码产物（*_.log）

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use xlogfile::constants::{MMAP_FILE_EXT, XLOG_FILE_EXT};
use xlogfile::fileio;
use xlogfile::XlogDecoder;

const VERSION: &str = "1.0.0";

#[derive(Parser)]
#[command(name = "xlog_decode")]
#[command(about = "A tool for decoding XLOG format log files")]
// 内建的 help 子命令和 version 旗标都关掉：help 由自己的子命令实现，
// --version 要输出带许可证行的两行文本
#[command(disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 显示版本信息
    #[arg(long)]
    version: bool,

    /// 详细输出
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 解码一个 XLOG 文件，或目录下所有 XLOG 文件（默认递归）
    Decode {
        /// 禁用递归遍历
        #[arg(long)]
        no_recursive: bool,

        /// 不跳过损坏的块
        #[arg(long)]
        keep_errors: bool,

        /// 输入文件或目录
        path: String,
    },

    /// 删除目录下所有解码产物（默认递归）
    Clean {
        /// 禁用递归遍历
        #[arg(long)]
        no_recursive: bool,

        /// 目标目录
        path: String,
    },

    /// 显示帮助信息
    Help,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help 走 stdout 正常退出；参数错误一律退出码 1
            let _ = err.print();
            if err.use_stderr() {
                return ExitCode::from(1);
            }
            return ExitCode::SUCCESS;
        }
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if cli.version {
        println!("xlog_decode version {}", VERSION);
        println!("Licensed under the MIT License");
        return ExitCode::SUCCESS;
    }

    let code = match cli.command {
        None => {
            eprintln!("Error: Missing command argument\n");
            let _ = Cli::command().print_help();
            1
        }
        Some(Commands::Help) => {
            let _ = Cli::command().print_help();
            0
        }
        Some(Commands::Decode {
            no_recursive,
            keep_errors,
            path,
        }) => run(cmd_decode(&path, !no_recursive, !keep_errors)),
        Some(Commands::Clean { no_recursive, path }) => run(cmd_clean(&path, !no_recursive)),
    };

    ExitCode::from(code)
}

/// 命令的结构性错误打到标准错误，统一退出码 1
fn run(result: Result<u8>) -> u8 {
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    }
}

/// 解码命令：文件直接解码，目录先扫描再逐个解码
fn cmd_decode(path: &str, recursive: bool, skip_error_blocks: bool) -> Result<u8> {
    let path_ref = Path::new(path);
    if !path_ref.exists() {
        bail!("Path does not exist: {}", path);
    }

    if path_ref.is_dir() {
        println!(
            "Searching for XLOG files{}...",
            if recursive { " (recursively)" } else { "" }
        );
        let files = fileio::scan_directory(path_ref, &[XLOG_FILE_EXT, MMAP_FILE_EXT], recursive);

        if files.is_empty() {
            println!("No XLOG files found in the specified directory");
            return Ok(0);
        }

        println!("Found {} XLOG files, starting decode...", files.len());
        let mut success_count = 0;
        for file in &files {
            if decode_one(&file.to_string_lossy(), skip_error_blocks) {
                success_count += 1;
            }
        }

        println!("Decoded {} out of {} files", success_count, files.len());
        Ok(if success_count > 0 { 0 } else { 1 })
    } else {
        if !XlogDecoder::is_xlog_file(path) {
            eprintln!(
                "Warning: File does not have a recognized XLOG extension: {}",
                path
            );
            println!("Attempting to decode anyway...");
        }
        Ok(if decode_one(path, skip_error_blocks) { 0 } else { 1 })
    }
}

/// 清理命令：删除目录下的解码产物
fn cmd_clean(path: &str, recursive: bool) -> Result<u8> {
    let path_ref = Path::new(path);
    if !path_ref.exists() {
        bail!("Path does not exist: {}", path);
    }
    if !path_ref.is_dir() {
        bail!("Path must be a directory for clean command: {}", path);
    }

    println!(
        "Searching for decoded files{}...",
        if recursive { " (recursively)" } else { "" }
    );
    let files = fileio::find_decoded_files(path_ref, recursive);

    if files.is_empty() {
        println!("No decoded files found in the specified directory");
        return Ok(0);
    }

    println!("Found {} decoded files, starting deletion...", files.len());
    let mut deleted_count = 0;
    for file in &files {
        println!("Deleting: {}", file.display());
        match std::fs::remove_file(file) {
            Ok(()) => deleted_count += 1,
            Err(err) => eprintln!("Failed to delete {}: {}", file.display(), err),
        }
    }

    println!(
        "Deleted {} out of {} decoded files",
        deleted_count,
        files.len()
    );
    Ok(0)
}

/// 解码单个文件，打印耗时和输入/输出大小
fn decode_one(file_path: &str, skip_error_blocks: bool) -> bool {
    let mut decoder = XlogDecoder::new();
    let output_file = XlogDecoder::generate_output_filename(file_path);
    let input_size_mb = file_size_mb(file_path);
    let start_time = Instant::now();

    match decoder.decode_file(file_path, &output_file, skip_error_blocks) {
        Ok(()) => {
            let cost = start_time.elapsed().as_millis();
            let output_size_mb = file_size_mb(&output_file);
            println!(
                "{} (cost: {}ms, size: {:.2}MB -> {:.2}MB)",
                output_file, cost, input_size_mb, output_size_mb
            );
            true
        }
        Err(err) => {
            let cost = start_time.elapsed().as_millis();
            eprintln!(
                "Failed to decode file: {} (cost: {}ms, size: {:.2}MB): {}",
                file_path, cost, input_size_mb, err
            );
            false
        }
    }
}

fn file_size_mb(path: &str) -> f64 {
    std::fs::metadata(path)
        .map(|meta| meta.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}
