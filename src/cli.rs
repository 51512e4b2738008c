use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "razer-raw", version, about = "Raw report multiplexer for Razer mice")]
pub struct Cli {
    /// Directory the device nodes are published under.
    #[arg(long, global = true, default_value = "/run/razer-raw")]
    pub socket_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the multiplexer daemon.
    Run,

    /// List published device nodes.
    #[command(visible_alias = "ls")]
    List,

    /// Query the battery level of a device.
    #[command(visible_aliases = ["bat", "b"])]
    Battery {
        /// Node to query; defaults to the first published node.
        #[arg(long)]
        node: Option<PathBuf>,
    },

    /// Query the serial number of a device.
    Serial {
        #[arg(long)]
        node: Option<PathBuf>,
    },

    /// Read one raw report and dump it as hex.
    Read {
        #[arg(long)]
        node: Option<PathBuf>,
    },

    /// Write one raw report given as hex, then dump the response.
    Write {
        #[arg(long)]
        node: Option<PathBuf>,

        /// Report bytes as hex, zero-padded to the full report length.
        payload: String,
    },
}
