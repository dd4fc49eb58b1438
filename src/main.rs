use std::process::ExitCode;

fn main() -> ExitCode {
    match sales_calendar_forecast::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
