//! # XFCP Register Bridge
//!
//! Deployable XFCP node: builds a small fabric of register endpoints over a
//! chosen backend and serves it to hosts over UDP and, optionally, a serial
//! byte-stream device.
//!
//! ## Overview
//!
//! Two backends are provided: soft register files held in process memory
//! (useful for bring-up and integration testing against real host tooling)
//! and Linux UIO mappings of actual hardware register blocks.
pub mod backends;

use std::error::Error;
use std::fs::OpenOptions;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::thread;

use clap::Parser;
use clap_num::maybe_hex;
use env_logger::Env;
use xfcp_server::{
    RegisterFile,
    endpoint::RegisterNode,
    fabric::{Node, Switch},
    mem::MemRegisterFile,
    server::Builder,
};

const DEFAULT_WORDS: u64 = 64;

#[derive(Parser, Eq, PartialEq, Clone)]
enum BackendImpl {
    /// Soft register files held in process memory
    Mem {
        #[arg(
            short,
            long,
            help = "Words per register file",
            default_value = "64",
            value_parser = maybe_hex::<u64>
        )]
        words: u64,
        #[arg(
            short,
            long,
            help = "Register endpoints under the root switch",
            default_value = "2"
        )]
        leaves: usize,
    },
    /// A memory-mapped hardware register block via the Linux UIO subsystem
    Uio {
        path: Option<PathBuf>,
        #[arg(
            short,
            long,
            help = "Words exposed from the mapped window",
            default_value = "64",
            value_parser = maybe_hex::<u64>
        )]
        words: u64,
    },
}

#[derive(Parser)]
#[command(about = "XFCP register bridge exposing memory-mapped endpoints over UDP and serial", long_about=None)]
struct Args {
    #[arg(short, long, default_value = "1234")]
    udp_port: u16,

    #[arg(short, long, default_value = "127.0.0.1")]
    ip: IpAddr,

    #[arg(short, long, help = "Also serve a byte-stream device (UART, PTY) at this path")]
    serial: Option<PathBuf>,

    #[clap(subcommand)]
    backend: Option<BackendImpl>,
}

/// Attempts to automatically find an XFCP register block exposed via UIO
fn uio_regs_path() -> Option<PathBuf> {
    let uio_class_path = Path::new("/sys/class/uio");
    for entry in uio_class_path.read_dir().ok()? {
        use std::fs;

        let mut path = entry.ok()?.path();
        log::debug!("Looking at UIO path {}", path.display());
        path.push("name");
        let name = match fs::read_to_string(&path) {
            Ok(name) => name,
            Err(_) => continue,
        };
        let uio_name = name.trim();
        log::debug!("UIO has name {}", uio_name);
        if uio_name == "xfcp_regs" {
            // This will be something like 'uio2'
            let uio_indexed_name = path.parent()?.file_name()?;
            let mut dev_path = PathBuf::from("/dev");
            // This will be something like '/dev/uio2'
            dev_path.push(uio_indexed_name);
            return Some(dev_path);
        }
    }
    None
}

/// Serves the fabric on every requested transport until one of them fails.
fn serve<F: RegisterFile + Send>(root: Node<F>, args: &Args) -> Result<(), Box<dyn Error>> {
    let addr = SocketAddr::new(args.ip, args.udp_port);
    log::info!("Binding to address: {}", addr);

    thread::scope(|scope| -> Result<(), Box<dyn Error>> {
        if let Some(serial_path) = &args.serial {
            let device = OpenOptions::new()
                .read(true)
                .write(true)
                .open(serial_path)?;
            let reader = device.try_clone()?;
            log::info!("Serving serial device {}", serial_path.display());

            let root = &root;
            let display_path = serial_path.clone();
            scope.spawn(move || {
                let server = Builder::new().serial(root);
                match server.serve(reader, device) {
                    Ok(()) => log::info!(
                        "Serial device {} reached end of stream",
                        display_path.display()
                    ),
                    Err(e) => log::error!("Serial server error: {}", e),
                }
            });
        }

        Builder::new().udp(&root).listen(addr)
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!("Starting XFCP bridge");

    let args = Args::parse();
    log::debug!(
        "Parsed arguments: ip={}, udp_port={}",
        args.ip,
        args.udp_port
    );

    let backend = args.backend.clone().or_else(|| {
        uio_regs_path().map(|path| {
            log::info!("Auto-detected UIO register block at {}", path.display());
            BackendImpl::Uio {
                path: Some(path),
                words: DEFAULT_WORDS,
            }
        })
    });

    match backend {
        Some(BackendImpl::Mem { words, leaves }) => {
            log::info!(
                "Initializing {} soft register file(s) of {} words each",
                leaves,
                words
            );
            let children = (0..leaves)
                .map(|_| Node::from(RegisterNode::new(MemRegisterFile::new(words as usize))))
                .collect();
            serve(Node::from(Switch::new(children)), &args)
        }
        Some(BackendImpl::Uio { path, words }) => {
            use crate::backends::uio::UioRegisterFile;

            let device_path = match path.or_else(uio_regs_path) {
                None => {
                    println!(
                        "No UIO register block could be detected. Explicitly specify a path using xfcp-bridge uio <path> to select a device."
                    );
                    return Ok(());
                }
                Some(path) => path,
            };

            log::info!(
                "Initializing UIO register file from {}",
                device_path.display()
            );
            let file = UioRegisterFile::new(device_path, words as usize)?;
            let root = Node::from(Switch::new(vec![Node::from(RegisterNode::new(file))]));
            serve(root, &args)
        }
        None => {
            println!(
                "No backend selected and no UIO register block could be detected. Use xfcp-bridge mem or xfcp-bridge uio <path>."
            );
            Ok(())
        }
    }
}
