//! src/main.rs

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{CommandFactory, Parser};
use traced_io::log::log_simple;
use traced_io::{run, Cli, RunConfig, RunSummary, TraceIoError, TraceToggle, DEFAULT_TOGGLE_PATH};

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

fn setup_signal_handler() {
    // Only flag; printing here could land inside a trace window.
    if let Err(e) = ctrlc::set_handler(move || STOP_REQUESTED.store(true, Ordering::SeqCst)) {
        log_simple(format!("Could not install Ctrl+C handler: {}", e));
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    let main_result = panic::catch_unwind(panic::AssertUnwindSafe(|| main_logic(cli)));
    let exit_code = match main_result {
        Ok(Ok(summary)) => {
            log_simple(format!("Completed {}", summary));
            0
        }
        Ok(Err(TraceIoError::Config(msg))) => {
            eprintln!("{}\n\n{}", msg, Cli::command().render_usage());
            1
        }
        Ok(Err(e)) => {
            log_simple(format!("Run failed: {}", e));
            1
        }
        Err(panic_payload) => {
            let mut panic_msg = "A critical error occurred: panicked!".to_string();
            if let Some(s) = panic_payload.downcast_ref::<String>() { panic_msg.push_str(&format!("\nPanic message: {}", s)); }
            else if let Some(s) = panic_payload.downcast_ref::<&str>() { panic_msg.push_str(&format!("\nPanic message: {}", s)); }
            log_simple(panic_msg);
            101
        }
    };
    std::process::exit(exit_code);
}

fn main_logic(cli: Cli) -> Result<RunSummary, TraceIoError> {
    let config = RunConfig::from_cli(cli)?;
    // Tracing may have been left on; get it off before doing anything else.
    let mut toggle = TraceToggle::open(DEFAULT_TOGGLE_PATH)?;
    setup_signal_handler();
    log_simple(format!(
        "{} x {} of {} bytes on {} (delay {:?}), toggling {}",
        config.count,
        config.mode,
        config.bytes,
        config.path.display(),
        config.delay,
        toggle.path().display()
    ));
    run(&config, &mut toggle, &STOP_REQUESTED)
}
