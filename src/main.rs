use clap::Parser;
use script_executor::{Binding, Context, Executor, ScriptExecutor};
use serde_json::Value;
use tracing::Level;

/// Simple runner: pass a script and its binding via CLI.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Script text
    script: String,
    /// Binding as a JSON object, e.g. '{"x": 5}'
    #[arg(long, default_value = "{}")]
    binding: String,
    /// JSON file with executor settings
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    /// Print the evaluation log to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Load settings.
    let ctx = match args.config.as_ref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("Cannot read {}: {e}", path.display())));
            serde_json::from_str::<Context>(&text)
                .unwrap_or_else(|e| fail(format!("Invalid config: {e}")))
        }
        None => Context::default(),
    };

    // Parse the binding.
    let binding = serde_json::from_str::<Value>(&args.binding)
        .map_err(|e| e.to_string())
        .and_then(|v| Binding::try_from(v).map_err(|e| e.to_string()))
        .unwrap_or_else(|e| fail(format!("Invalid binding: {e}")));

    let executor = ScriptExecutor::default().with_context(ctx);
    match executor.execute(&args.script, &binding) {
        Ok(out) => match serde_json::to_string_pretty(&out) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(e),
        },
        Err(e) => fail(e),
    }
}
