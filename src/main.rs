use ensguard::cli::Cli;
use ensguard::config::Config;
use ensguard::logging::init_logging;
use log::{debug, error};

fn main() {
    let project_dirs = match Config::project_dirs() {
        Ok(dirs) => dirs,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    let config = Config::init(&project_dirs);

    // The handle flushes and closes the log file when dropped
    let _logger = match init_logging(project_dirs.data_local_dir(), &config.logging) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("Logging disabled: {}", err);
            None
        }
    };

    debug!("Command-line args: {:?}", std::env::args_os().collect::<Vec<_>>());

    if let Err(err) = Cli::handle_command_line() {
        error!("{:?}", err);
        eprint!("{}", err);
        std::process::exit(1);
    }
}
