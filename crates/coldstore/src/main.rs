use std::process::ExitCode;

use clap::Parser;
use coldstore::cli::App;

fn main() -> ExitCode {
    let app = App::parse();
    coldstore::run::init_logging(app.verbose, app.quiet);
    match coldstore::run::run(app) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
