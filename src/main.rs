use std::{path::PathBuf, process::exit, sync::Once};

use anyhow::Context;
use clap::{Args, Parser};
use mlisp::{config::DEFAULT_MAX_DEPTH, Config, Output, Session};

fn main() -> anyhow::Result<()> {
    color_backtrace::install();
    init_tracing();

    let command = App::parse();
    let mut session = Session::new(command.options().config(), Output::Stdout);

    match command {
        App::Run { path, .. } => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("unable to read {}", path.display()))?;
            let name = path.display().to_string();
            #[cfg(feature = "debug")]
            println!("{:#?}", mlisp::parse(&source, &name));
            match session.run(&source, &name) {
                Ok(results) => {
                    for error in results.iter().filter(|result| result.is_error()) {
                        println!("{}", error);
                    }
                }
                Err(error) => {
                    eprintln!("{}", error);
                    exit(1)
                }
            }
        }
        App::Eval { source, .. } => {
            #[cfg(feature = "debug")]
            println!("{:#?}", mlisp::parse(&source, "<eval>"));
            match session.evaluate(&source, "<eval>") {
                Ok(value) => println!("{}", value),
                Err(error) => {
                    eprintln!("{}", error);
                    exit(1)
                }
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "mlisp", version, about)]
enum App {
    /// Evaluate each expression in a file
    #[command(alias = "r")]
    Run {
        path: PathBuf,
        #[command(flatten)]
        options: Options,
    },
    /// Evaluate an expression and print the result
    #[command(alias = "e")]
    Eval {
        source: String,
        #[command(flatten)]
        options: Options,
    },
}

impl App {
    fn options(&self) -> &Options {
        match self {
            App::Run { options, .. } | App::Eval { options, .. } => options,
        }
    }
}

#[derive(Args)]
struct Options {
    /// Maximum nesting of expression evaluation
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

impl Options {
    fn config(&self) -> Config {
        Config::default().with_max_depth(self.max_depth)
    }
}

/// Enable with `RUST_LOG=mlisp=debug` or `RUST_LOG=mlisp=trace`
fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
