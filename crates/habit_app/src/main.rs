use habit_app::app::{run, AppConfig};

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid habit report configuration: {err:#}");
            std::process::exit(2);
        }
    };
    match run(&config) {
        Ok(report) => println!("{report}"),
        Err(err) => {
            eprintln!("Failed to build habit report: {err:#}");
            std::process::exit(1);
        }
    }
}
