use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "subtitles-downloader")]
#[command(about = "Find videos without subtitles and download them from BSPlayer and Subdivx")]
pub struct Cli {
    /// Folder to search recursively; ignores the age limit and logs to the console
    #[arg(short = 'f', long = "folder")]
    pub folder: Option<PathBuf>,

    /// Connect directly even if proxies are configured
    #[arg(long)]
    pub no_proxy: bool,

    /// Echo log lines to stdout
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
