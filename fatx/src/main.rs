mod logger;

use std::{
    fs::File,
    io::{self, BufWriter, Write as _},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use thiserror::Error;

use libfatx::{
    Device, DeviceError, FatxError, format_drive, format_memory_unit, read_drive_layout,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("canceled")]
    Canceled,
    #[error(transparent)]
    Fatx(#[from] FatxError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Parser)]
#[command(name = "fatx", about = "FATX partition layout tools", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a fresh FATX partition table and volume headers to a device
    Format {
        /// Whole block device or image file to format
        device: PathBuf,
    },
    /// List the FATX partitions on a device or image
    List {
        /// Device or image file to inspect
        device: PathBuf,
    },
    /// Create a blank memory unit image
    Mku {
        /// Image size in MiB
        size_mb: u64,
        /// Output file path
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    logger::init_logger();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Format { device } => cmd_format(&device),
        Command::List { device } => cmd_list(&device),
        Command::Mku { size_mb, path } => cmd_mku(size_mb, &path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Aborting: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_format(path: &Path) -> Result<(), CliError> {
    let mut dev = Device::open_rw(path)?;
    let size = dev.size();

    let prompt = format!(
        "Write FATX filesystem to device {}, size {} MB? (y/n) ",
        path.display(),
        size / (1024 * 1024)
    );
    if !confirm(&prompt)? {
        return Err(CliError::Canceled);
    }

    println!("Writing to device...");
    format_drive(&mut dev)?;
    println!("Done!");
    Ok(())
}

fn cmd_list(path: &Path) -> Result<(), CliError> {
    let mut dev = Device::open_ro(path)?;
    let reports = read_drive_layout(&mut dev)?;

    print_row(&[
        "PARTITION NAME",
        "LETTER",
        "OFFSET",
        "SIZE",
        "SIZE MB",
        "CLUSTER SIZE",
    ]);
    print_row(&[
        &"=".repeat(22),
        &"=".repeat(14),
        &"=".repeat(14),
        &"=".repeat(14),
        &"=".repeat(14),
        &"=".repeat(14),
    ]);

    for report in &reports {
        let size_mb = format!("{} MB", report.size_mib());
        let cluster = match report.cluster_size {
            Some(bytes) => format!("{} KB", bytes / 1024),
            None => "error".to_string(),
        };
        print_row(&[
            &report.name,
            report.letter,
            &report.offset.to_string(),
            &report.size.to_string(),
            &size_mb,
            &cluster,
        ]);
    }
    Ok(())
}

fn cmd_mku(size_mb: u64, path: &Path) -> Result<(), CliError> {
    let total_bytes = size_mb * 1024 * 1024;

    println!("Writing to file...");
    let mut out = BufWriter::new(File::create(path)?);
    format_memory_unit(&mut out, total_bytes)?;
    println!("Done!");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim() == "y")
}

fn print_row(cells: &[&str]) {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        let width = if i == 0 { 24 } else { 16 };
        line.push_str(&format!("{cell:<width$}"));
    }
    println!("{}", line.trim_end());
}
