mod cli;
mod cmd;

use cmd::{CommandEnum, Commands};

fn main() {
    let Commands { verbose, cmds } = argh::from_env();

    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new()
        .filter_module("vmwalk", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();

    if let Err(err) = match cmds {
        CommandEnum::Blocks(this) => this.init(),
        CommandEnum::Region(this) => this.init(),
        CommandEnum::Base(this) => this.init(),
    } {
        eprintln!("\n\x1b[31m error: {err} \x1b[0m")
    }
}
