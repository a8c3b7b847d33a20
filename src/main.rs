use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::debug;

use ace_lang::diagnostics::render::RenderedDiagnostic;
use ace_lang::source::SrcBuffer;
use ace_lang::{compile, Compilation};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Source files to compile.
    files: Vec<PathBuf>,

    /// Name of the package root module.
    #[arg(short, long, default_value = "main")]
    package_name: String,

    /// Print the token stream of each file and stop.
    #[arg(long)]
    emit_tokens: bool,

    /// Report diagnostics as JSON instead of text.
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init()?;

    let mut buffers = vec![];
    for path in &cli.files {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not read '{}'", path.display()))?;
        buffers.push(SrcBuffer::file(path.clone(), contents));
    }

    if cli.emit_tokens {
        for buffer in buffers {
            let tokens = ace_lang::lexer::Lexer::new(buffer).lex();
            for token in &tokens.value {
                println!("{token:?}");
            }
            print!("{}", tokens.diagnostics);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let compilation = Compilation::new(cli.package_name.clone());
    let result = compile(&compilation, buffers);

    debug!(
        "compiled package '{}': {} function(s), {} diagnostic(s)",
        cli.package_name,
        result.value.functions.len(),
        result.diagnostics.len()
    );

    if cli.json {
        let rendered = result
            .diagnostics
            .iter()
            .map(RenderedDiagnostic::from)
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        eprint!("{}", result.diagnostics);
    }

    if result.diagnostics.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
