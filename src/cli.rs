use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wpacrack", version)]
#[command(about = "Multi-strategy WPA handshake cracking with hashcat", long_about = None)]
pub struct Args {
    /// Directory holding wpacrack.yaml
    #[arg(short, long, global = true, default_value = ".")]
    pub config: Utf8PathBuf,

    /// Also log to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crack one capture file
    Crack {
        /// .cap or .pcap capture
        capture: Utf8PathBuf,

        /// Wordlist for the final attack (name in the resources dir, or a path)
        #[arg(short, long)]
        wordlist: Option<String>,

        /// Rule applied to the final attack (name in the resources dir, or a path)
        #[arg(short, long)]
        rule: Option<String>,

        /// Budget for the final attack in minutes (default from settings)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Measure hashcat speed, append it to the benchmark log and print the log
    Benchmark,

    /// Separate benign hashcat warnings from real errors in a stderr dump
    SplitStderr {
        file: Utf8PathBuf,
    },
}
