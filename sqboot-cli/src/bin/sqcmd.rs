use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqboot::squashfs::{BlockDevice, EntryKind, Partition, SquashFS, StreamDevice};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// The SquashFS image to operate on
    image: PathBuf,

    /// Sector offset of the filesystem within the image
    #[arg(long, default_value_t = 0)]
    part_start: u64,

    /// The command to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List directory contents
    Ls(LsArgs),
    /// Print file contents
    Cat(CatArgs),
    /// Print file sizes
    Size(CatArgs),
}

#[derive(Args, Debug)]
struct LsArgs {
    #[arg(short, long)]
    recursive: bool,
    paths: Vec<String>,
}

#[derive(Args, Debug)]
struct CatArgs {
    paths: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file = File::open(&cli.image)
        .with_context(|| format!("cannot open {}", cli.image.display()))?;
    // Images carved out of firmware blobs may end short of a sector.
    let dev = StreamDevice::new(BufReader::new(file)).pad_short_tail();
    let mut sqfs = SquashFS::probe(dev, Partition::new(cli.part_start, 0))
        .context("failed to probe SquashFS")?;

    match &cli.command {
        Command::Ls(args) => cmd_ls(&mut sqfs, args),
        Command::Cat(args) => cmd_cat(&mut sqfs, args),
        Command::Size(args) => cmd_size(&mut sqfs, args),
    }
}

fn cmd_ls<D: BlockDevice>(sqfs: &mut SquashFS<D>, args: &LsArgs) -> anyhow::Result<()> {
    let paths = if args.paths.is_empty() {
        vec!["/".to_string()]
    } else {
        args.paths.clone()
    };
    for path in &paths {
        list_dir(sqfs, path, args.recursive)?;
    }
    Ok(())
}

fn list_dir<D: BlockDevice>(
    sqfs: &mut SquashFS<D>,
    path: &str,
    recursive: bool,
) -> anyhow::Result<()> {
    let mut subdirs = Vec::new();
    for entry in sqfs.open_dir(path)? {
        let shown = if path == "/" {
            format!("/{}", entry.name)
        } else {
            format!("{}/{}", path.trim_end_matches('/'), entry.name)
        };
        match entry.kind {
            EntryKind::Dir => {
                println!("{shown}/");
                if recursive {
                    subdirs.push(shown);
                }
            }
            EntryKind::Reg => println!("{shown} ({} bytes)", entry.size),
            EntryKind::Lnk => println!("{shown}@"),
            EntryKind::Other => println!("{shown}?"),
        }
    }
    for sub in subdirs {
        list_dir(sqfs, &sub, true)?;
    }
    Ok(())
}

fn cmd_cat<D: BlockDevice>(sqfs: &mut SquashFS<D>, args: &CatArgs) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    for path in &args.paths {
        let size = sqfs.size(path).with_context(|| format!("cannot stat {path}"))?;
        let mut buf = vec![0u8; size as usize];
        sqfs.read(path, &mut buf, 0, 0)
            .with_context(|| format!("cannot read {path}"))?;
        stdout.write_all(&buf)?;
    }
    Ok(())
}

fn cmd_size<D: BlockDevice>(sqfs: &mut SquashFS<D>, args: &CatArgs) -> anyhow::Result<()> {
    for path in &args.paths {
        let size = sqfs.size(path).with_context(|| format!("cannot stat {path}"))?;
        println!("{size}\t{path}");
    }
    Ok(())
}
