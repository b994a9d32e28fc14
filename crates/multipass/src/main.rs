mod cli;
mod commands;
mod run;
mod settings;
mod watch;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing(cli.verbose);

    match cli.command {
        Some(Command::Run(args)) => run::run(args),
        Some(Command::Init(args)) => commands::init(&args.path, args.force),
        Some(Command::Check(args)) => commands::check(&args.project),
        Some(Command::AddTexture(args)) => commands::add_texture(&args.project, &args.source),
        Some(Command::AddBuffer(args)) => commands::add_buffer(&args.project),
        Some(Command::RemoveBuffer(args)) => commands::remove_buffer(&args.project),
        None => run::run(cli::RunArgs::default()),
    }
}
