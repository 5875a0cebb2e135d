mod backup;
mod cli;
mod commands;
mod env_loader;
mod error;
mod logging;

fn main() {
    env_loader::load_dotenv();
    logging::init();

    match cli::run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
