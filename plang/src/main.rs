use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "plangc")]
#[command(about = "Inspect and check PLang policy documents", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a policy file
    Tokens {
        /// Policy source
        input: String,
    },

    /// Parse a policy file and print its AST
    Parse {
        /// Policy source
        input: String,

        /// Print canonical PLang instead of the debug tree
        #[arg(long)]
        canonical: bool,
    },

    /// Compile each file and report the first error in each
    Check {
        /// Policy sources
        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Tokens { input } => {
            let source = fs::read_to_string(&input)?;
            match plang::tokenize(&source) {
                Ok(tokens) => {
                    for token in &tokens {
                        println!(
                            "{:>4}:{:<4} {:<12} {:?}",
                            token.span.line, token.span.column, token.kind, token.text
                        );
                    }
                }
                Err(e) => {
                    eprintln!("{input}:{}:{}: {e}", e.line(), e.column());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Parse { input, canonical } => {
            let source = fs::read_to_string(&input)?;
            match plang::compile(&source) {
                Ok(program) if canonical => print!("{program}"),
                Ok(program) => println!("{program:#?}"),
                Err(e) => {
                    eprintln!("{input}:{}:{}: {e}", e.line(), e.column());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Check { inputs } => {
            let mut failed = 0;
            for input in &inputs {
                let source = fs::read_to_string(input)?;
                match plang::compile(&source) {
                    Ok(program) => {
                        println!("{input}: ok ({} statements)", program.statements.len());
                    }
                    Err(e) => {
                        eprintln!("{input}:{}:{}: {e}", e.line(), e.column());
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                eprintln!("{failed} of {} files failed", inputs.len());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
