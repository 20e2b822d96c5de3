use clap::Parser;
use sessionrelay::{run, Cli};

fn main() {
    let cli = Cli::parse();

    let _ = ctrlc::set_handler(|| {
        eprintln!("sessionrelay: interrupted, shutting down");
        std::process::exit(130);
    });

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
