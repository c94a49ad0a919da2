use clap::Parser;
use golf_utils::{ok, AnyResult};
use log::LevelFilter;

fn main() -> AnyResult {
    let cli = golf_mdk::Cli::parse_from(wild::args());

    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(if cli.verbose {
            LevelFilter::Trace
        } else {
            LevelFilter::Warn
        })
        .init();

    golf_mdk::run(cli)?;
    ok()
}
