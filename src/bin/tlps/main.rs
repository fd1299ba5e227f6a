use std::{io::Write, process::ExitCode};

use tlps::{
    cmdline::{self, CommandLineOptions},
    Runtime, TlpsError,
};

const EXIT_USAGE: u8 = 64;
const EXIT_COMPILE_ERROR: u8 = 65;
const EXIT_IO_ERROR: u8 = 66;
const EXIT_RUNTIME_ERROR: u8 = 70;

fn main() -> ExitCode {
    init_tracing();

    let options = CommandLineOptions::parse();
    if options.help {
        println!("{}", cmdline::USAGE);
        return ExitCode::SUCCESS;
    }

    if options.is_usage_error() {
        eprintln!("{}", cmdline::USAGE);
        return ExitCode::from(EXIT_USAGE);
    }

    let mut runtime = Runtime::new().with_debug(options.debug);

    let result = match &options.file {
        Some(filename) => run_file(&mut runtime, filename),
        None => run_prompt(&mut runtime),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(EXIT_IO_ERROR)
        }
    }
}

/// Installs a log subscriber writing to stderr, only when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(runtime: &mut Runtime, filename: &str) -> Result<ExitCode, TlpsError> {
    runtime.run_file(filename)?;

    if runtime.had_error() {
        Ok(ExitCode::from(EXIT_COMPILE_ERROR))
    } else if runtime.had_runtime_error() {
        Ok(ExitCode::from(EXIT_RUNTIME_ERROR))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_prompt(runtime: &mut Runtime) -> Result<ExitCode, TlpsError> {
    let mut entry = String::new();
    let mut line = String::new();

    loop {
        print!("{}", cmdline::prompt(!entry.is_empty()));
        std::io::stdout().flush()?;

        line.clear();
        if std::io::stdin().read_line(&mut line)? == 0 {
            if !entry.is_empty() {
                run_entry(runtime, &entry);
            }

            println!();
            return Ok(ExitCode::SUCCESS);
        }

        let text = line.trim_end_matches(['\n', '\r']);

        if text.trim().is_empty() {
            if !entry.is_empty() {
                run_entry(runtime, &entry);
                entry.clear();
            }
            continue;
        }

        entry.push_str(text);
        entry.push('\n');

        if !cmdline::continues_block(text) {
            run_entry(runtime, &entry);
            entry.clear();
        }
    }
}

fn run_entry(runtime: &mut Runtime, entry: &str) {
    runtime.reset_errors();
    runtime.run(entry);
}
