use std::env;
use std::process::ExitCode;

mod app;

fn main() -> ExitCode {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let options = match app::parse_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("{}", app::usage_text());
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    app::init_tracing();
    app::run(options)
}
