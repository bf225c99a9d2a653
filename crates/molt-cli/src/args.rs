use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the molt binary.
#[derive(Parser, Debug)]
#[command(
    name = "molt",
    version,
    about = "Ahead-of-time type inference for a static subset of Python"
)]
pub struct CliArgs {
    /// Serialized syntax tree (JSON) produced by the front-end parser.
    pub tree: PathBuf,

    /// Use 64-bit integers for the target integer class.
    #[arg(short = 'l', long = "long")]
    pub long: bool,

    /// Do not treat out-of-range integer literals as errors.
    #[arg(short = 'b', long = "nobounds")]
    pub nobounds: bool,

    /// Disable assert statements.
    #[arg(short = 'n', long = "noassert")]
    pub noassert: bool,

    /// Output directory for the typed-program JSON.
    #[arg(short = 'o', long = "outputdir")]
    pub outputdir: Option<PathBuf>,

    /// Debug level (3 enables iterative-flow-analysis tracing).
    #[arg(short = 'd', long = "debug")]
    pub debug: Option<u8>,

    /// Silent mode, only show warnings.
    #[arg(short = 's', long = "silent")]
    pub silent: bool,
}
