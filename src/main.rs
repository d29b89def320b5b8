use clap::Parser;
use std::io::Read;
use shellsim::bash::{Bash, BashOptions};
use shellsim::interpreter::types::ExecutionLimits;

#[derive(Parser)]
#[command(name = "shellsim")]
#[command(about = "A sandboxed shell environment for AI agents")]
#[command(version)]
struct Cli {
    /// Execute the script from command line argument
    #[arg(short = 'c')]
    script: Option<String>,

    /// Exit immediately if a command exits with non-zero status
    #[arg(short = 'e', long = "errexit")]
    errexit: bool,

    /// Working directory within the sandbox
    #[arg(long = "cwd")]
    cwd: Option<String>,

    /// Output results as JSON (stdout, stderr, exitCode)
    #[arg(long = "json")]
    json: bool,

    /// Increase log verbosity on stderr (repeatable); default is warnings only
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Override the maximum number of commands executed in one session
    #[arg(long = "max-command-count")]
    max_command_count: Option<u64>,

    /// Override the maximum number of loop iterations
    #[arg(long = "max-iterations")]
    max_iterations: Option<u64>,

    /// Override the maximum function call/recursion depth
    #[arg(long = "max-call-depth")]
    max_call_depth: Option<u32>,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Determine script source: -c, file, or stdin
    let script = if let Some(s) = cli.script {
        s
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error: Cannot read script file: {}: {}", file, e);
                std::process::exit(1);
            }
        }
    } else {
        // Use std::io::IsTerminal (stable since Rust 1.70) for TTY detection
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: No script provided. Use -c 'script', provide a script file, or pipe via stdin.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).unwrap_or_default();
        buf
    };

    if script.trim().is_empty() {
        if cli.json {
            println!("{}", serde_json::json!({"stdout": "", "stderr": "", "exitCode": 0}));
        }
        std::process::exit(0);
    }

    let default_limits = ExecutionLimits::default();
    let limits = ExecutionLimits {
        max_command_count: cli.max_command_count.unwrap_or(default_limits.max_command_count),
        max_iterations: cli.max_iterations.unwrap_or(default_limits.max_iterations),
        max_recursion_depth: cli.max_call_depth.unwrap_or(default_limits.max_recursion_depth),
    };

    let mut bash = Bash::new(BashOptions {
        cwd: cli.cwd,
        limits: Some(limits),
        ..Default::default()
    }).await;

    // Prepend set -e if errexit
    let final_script = if cli.errexit {
        format!("set -e\n{}", script)
    } else {
        script
    };

    let result = bash.exec(&final_script, None).await;

    if cli.json {
        println!("{}", serde_json::json!({
            "stdout": result.stdout,
            "stderr": result.stderr,
            "exitCode": result.exit_code,
        }));
    } else {
        if !result.stdout.is_empty() {
            print!("{}", result.stdout);
        }
        if !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
    }

    std::process::exit(result.exit_code);
}
