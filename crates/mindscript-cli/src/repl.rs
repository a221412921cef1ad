use mindscript_lang::{errors, parser, Interpreter};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

fn history_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".mindscript_history"))
}

pub fn run(interpreter: &mut Interpreter) {
    let mut rl = DefaultEditor::new().expect("failed to create the line editor");
    let history = history_path();
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    println!(
        "MindScript {} — use Control-D to exit.",
        env!("CARGO_PKG_VERSION")
    );

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "> " } else { "| " };
        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() && line.trim().is_empty() {
                    continue;
                }
                buffer.push_str(&line);
                buffer.push('\n');

                // keep reading lines while the expression is unfinished
                let program = match parser::parse_interactive(&buffer) {
                    Ok(program) => program,
                    Err(error) if error.is_incomplete() => continue,
                    Err(error) => {
                        errors::report("<repl>", &buffer, &error);
                        buffer.clear();
                        continue;
                    }
                };

                let _ = rl.add_history_entry(buffer.trim_end());
                let source = std::mem::take(&mut buffer);
                let env = interpreter.globals.clone();
                match interpreter.eval_program(&program, &env) {
                    Ok(value) => println!("{}", value.to_string().green()),
                    Err(error) => errors::report("<repl>", &source, &error),
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }

    if let Some(path) = &history {
        let _ = rl.save_history(path);
    }
}
