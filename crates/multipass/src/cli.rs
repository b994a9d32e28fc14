use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "multipass",
    author,
    version,
    about = "Multi-pass GLSL shader sandbox",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the sandbox window (the default when no subcommand is given).
    Run(RunArgs),
    /// Write the default project to PATH.
    Init(InitArgs),
    /// Validate a project and compile-check every pass without opening a window.
    Check(ProjectArgs),
    /// Embed an image file or URL as the project's next shared texture.
    AddTexture(AddTextureArgs),
    /// Append the next lettered buffer pass.
    AddBuffer(ProjectArgs),
    /// Remove the last buffer pass and its source.
    RemoveBuffer(ProjectArgs),
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Project JSON file; the built-in demo project when omitted.
    #[arg(value_name = "PROJECT")]
    pub project: Option<PathBuf>,

    /// Render-rate cap (1-60).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<u32>,

    /// Simulation speed multiplier (0.0-4.0).
    #[arg(long, value_name = "SCALE")]
    pub time_scale: Option<f32>,

    /// Start with time frozen.
    #[arg(long)]
    pub paused: bool,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Reload the project whenever the file changes on disk.
    #[arg(long)]
    pub watch: bool,

    /// Settings file; can also be supplied via the `MULTIPASS_CONFIG` env var.
    #[arg(long, value_name = "FILE", env = "MULTIPASS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct ProjectArgs {
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,
}

#[derive(Parser, Debug)]
pub struct AddTextureArgs {
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Local image path or `http(s)://` URL.
    #[arg(value_name = "FILE|URL")]
    pub source: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("window size must be non-zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size(" 640X480 "), Ok((640, 480)));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("widexhigh").is_err());
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "multipass",
            "run",
            "demo.json",
            "--fps",
            "30",
            "--time-scale",
            "0.5",
            "--paused",
            "--size",
            "800x600",
            "--watch",
        ])
        .unwrap();
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.project, Some(PathBuf::from("demo.json")));
        assert_eq!(args.fps, Some(30));
        assert_eq!(args.time_scale, Some(0.5));
        assert!(args.paused);
        assert_eq!(args.size, Some((800, 600)));
        assert!(args.watch);
    }
}
