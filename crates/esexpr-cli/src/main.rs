use clap::{Args, Parser, Subcommand, ValueEnum};
use esexpr_parser::{Expression, ParseOptions};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "esexpr")]
#[command(about = "esexpr: parse JavaScript expressions into ESTree trees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Reject sources longer than N bytes
    #[arg(long, global = true, value_name = "N")]
    max_len: Option<usize>,

    /// Reject expressions nested deeper than N productions
    #[arg(long, global = true, value_name = "N")]
    max_depth: Option<usize>,

    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an expression and print its tree
    Parse {
        #[command(flatten)]
        input: Input,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Check an expression for syntax errors without printing a tree
    Check {
        #[command(flatten)]
        input: Input,
    },

    /// Re-render an expression in canonical form
    Print {
        #[command(flatten)]
        input: Input,
    },
}

#[derive(Args)]
struct Input {
    /// Expression text; read from stdin when neither this nor --file is given
    expr: Option<String>,

    /// Read the expression from a file
    #[arg(short, long, value_name = "PATH", conflicts_with = "expr")]
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Compact ESTree JSON
    Json,
    /// Indented ESTree JSON
    Pretty,
    /// Rust debug dump including spans
    Debug,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = parse_options(&cli);

    match cli.command {
        Command::Parse { input, format } => {
            tracing::debug!(?format, "running parse");
            cmd_parse(&input, format, &options)
        }
        Command::Check { input } => {
            tracing::debug!("running check");
            cmd_check(&input, &options)
        }
        Command::Print { input } => {
            tracing::debug!("running print");
            cmd_print(&input, &options)
        }
    }
}

fn parse_options(cli: &Cli) -> ParseOptions {
    let mut options = ParseOptions {
        max_source_len: cli.max_len,
        ..ParseOptions::default()
    };
    if let Some(depth) = cli.max_depth {
        options = options.with_max_depth(depth);
    }
    options
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "esexpr=debug,esexpr_parser=debug",
        _ => "esexpr=trace,esexpr_parser=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(input: &Input) -> String {
    if let Some(expr) = &input.expr {
        tracing::debug!(len = expr.len(), "read expression from argument");
        return expr.clone();
    }

    if let Some(path) = &input.file {
        tracing::debug!(path = %path.display(), "reading expression file");
        if !path.exists() {
            eprintln!("Error: file not found: {}", path.display());
            std::process::exit(1);
        }
        return match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                std::process::exit(1);
            }
        };
    }

    let mut source = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut source) {
        eprintln!("Error reading stdin: {e}");
        std::process::exit(1);
    }
    tracing::debug!(len = source.len(), "read expression from stdin");
    source
}

fn parse_or_exit(input: &Input, options: &ParseOptions) -> Expression {
    let source = read_source(input);
    match esexpr_parser::parse_with(&source, options) {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn cmd_parse(input: &Input, format: Format, options: &ParseOptions) {
    let expr = parse_or_exit(input, options);

    let rendered = match format {
        Format::Json => serde_json::to_string(&expr),
        Format::Pretty => serde_json::to_string_pretty(&expr),
        Format::Debug => Ok(format!("{expr:#?}")),
    };

    match rendered {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error serializing tree: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_check(input: &Input, options: &ParseOptions) {
    let expr = parse_or_exit(input, options);
    eprintln!("OK: {}", expr.node_type());
}

fn cmd_print(input: &Input, options: &ParseOptions) {
    let expr = parse_or_exit(input, options);

    match esexpr_codegen::to_source(&expr) {
        Ok(source) => println!("{source}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
