use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "subtitler")]
#[command(about = "Find, download and rename subtitles for video files")]
pub struct Cli {
    /// Video files or directories to process
    pub inputs: Vec<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/subtitler/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Subtitle languages to download, e.g. eng,pob
    #[arg(short, long, value_delimiter = ',')]
    pub languages: Option<Vec<String>>,

    /// Choose among multiple remote candidates interactively
    #[arg(short = 'c', long)]
    pub choose_subtitle: bool,

    /// Never pair files whose names carry no season/episode markers
    #[arg(long)]
    pub strict_episodes: bool,

    /// Compare episode keys even when there is exactly one video and one subtitle
    #[arg(long)]
    pub no_single_pair_shortcut: bool,
}
