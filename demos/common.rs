//! Logging and printing shared by the tutorial programs.

use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

/// Install a terminal logger whose level is read from the
/// `SUNDIALS_TUTORIALS_LOG` environment variable (default: `info`).
pub fn init_logger() {
    let level = std::env::var("SUNDIALS_TUTORIALS_LOG").ok()
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    let logger = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
    if let Err(e) = logger {
        eprintln!("Logger not installed: {}", e);
    }
}

/// Print the time `t` and the state `y`, one component per line.
pub fn print_output(t: f64, y: &[f64]) {
    println!("t: {}", t);
    println!("y:");
    for yi in y {
        println!("{:19.16e}", yi);
    }
}
