use clap::Parser;
use restack::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        // clap exits 2 on usage errors; the CLI contract is exit 1
        let _ = e.print();
        std::process::exit(if e.use_stderr() { 1 } else { 0 });
    });
    cli.run().map_err(anyhow::Error::new)
}
