use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::wire::Variant;

#[derive(Parser, Debug)]
#[command(name = "stockprompt", version, about = "Stock-imagery idea and prompt generator backed by Gemini")]
pub struct Args {
    /// Where history, copied prompts and the last batch are kept
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// TOML file with config overrides
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Keep each request body and raw response under <data-dir>/runs/
    #[arg(long, global = true, default_value_t = false)]
    pub save_response: bool,

    /// Use in-memory storage; nothing is written to disk
    #[arg(long, global = true, default_value_t = false)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Ask the model for a fresh batch of ideas
    Generate {
        #[arg(long, value_enum, default_value_t = Variant::Seasonal)]
        variant: Variant,
    },
    /// Show the last batch
    Show,
    /// Print prompt N of the last batch and mark it copied
    Copy {
        /// 1-based position in the last batch
        index: usize,
    },
    /// Write the last batch as an upload CSV
    Export {
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Export even if some prompts were never copied
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// List or clear previously generated titles
    History {
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
    /// Interactive loop: g = generate, c N = copy, e = export, q = quit
    Session {
        #[arg(long, value_enum, default_value_t = Variant::Seasonal)]
        variant: Variant,
    },
}
