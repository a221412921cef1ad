mod backend;
mod repl;

use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, ValueEnum};
use mindscript_lang::{errors, Backend, Interpreter, NoBackend};
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// No model; oracles refuse
    None,
    /// OpenAI-compatible chat endpoint (needs OPENAI_API_KEY)
    Openai,
    /// Ollama server
    Ollama,
    /// llama.cpp server
    Llamacpp,
}

#[derive(Parser)]
#[command(name = "mindscript", about = "The MindScript programming language", version)]
struct Cli {
    /// Script to run; starts a REPL when omitted
    file: Option<PathBuf>,

    /// Oracle backend
    #[arg(long, value_enum, default_value_t = BackendKind::None)]
    backend: BackendKind,

    /// Backend base URL
    #[arg(long)]
    url: Option<String>,

    /// Model name, for backends that need one
    #[arg(long)]
    model: Option<String>,
}

fn make_backend(cli: &Cli) -> Result<Rc<dyn Backend>, String> {
    match cli.backend {
        BackendKind::None => Ok(Rc::new(NoBackend)),
        BackendKind::Openai => {
            let model = cli
                .model
                .clone()
                .ok_or_else(|| "the openai backend requires --model".to_string())?;
            Ok(Rc::new(backend::OpenAi::new(cli.url.clone(), model)?))
        }
        BackendKind::Ollama => {
            let model = cli
                .model
                .clone()
                .ok_or_else(|| "the ollama backend requires --model".to_string())?;
            Ok(Rc::new(backend::Ollama::new(cli.url.clone(), model)))
        }
        BackendKind::Llamacpp => Ok(Rc::new(backend::LlamaCpp::new(cli.url.clone()))),
    }
}

fn main() {
    let cli = Cli::parse();

    let backend = match make_backend(&cli) {
        Ok(backend) => backend,
        Err(message) => {
            eprintln!("{} {message}", "error:".red().bold());
            std::process::exit(2);
        }
    };

    let mut interpreter = Interpreter::new(backend);

    match &cli.file {
        Some(path) => {
            let filename = path.display().to_string();
            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    eprintln!("{} cannot read {filename}: {e}", "error:".red().bold());
                    std::process::exit(2);
                }
            };
            match interpreter.eval_source(&source) {
                Ok(_) => {}
                Err(error) => {
                    errors::report(&filename, &source, &error);
                    std::process::exit(1);
                }
            }
        }
        None => repl::run(&mut interpreter),
    }
}
