//! Pseudocode CLI
//!
//! Command-line interface for the pseudocode interpreter.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use pseudo_lang::{parse, tokenize, validate, Diagnostic, Interpreter, VERSION};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 1 {
        // No arguments: start REPL
        println!("Pseudocode Interpreter v{}", VERSION);
        println!("Type 'exit' to quit\n");
        repl();
        return;
    }

    // Check for flags
    let mut show_tokens = false;
    let mut check_only = false;
    let mut show_help = false;
    let mut filename: Option<&String> = None;

    for arg in &args[1..] {
        match arg.as_str() {
            "--tokens" | "-t" => show_tokens = true,
            "--check" | "-c" => check_only = true,
            "--help" | "-h" => show_help = true,
            _ if arg.starts_with('-') => {
                eprintln!("Unknown flag: {}", arg);
                print_usage();
                process::exit(1);
            }
            _ => filename = Some(arg),
        }
    }

    if show_help {
        print_help();
        return;
    }

    let file = match filename {
        Some(file) => file,
        None => {
            eprintln!("Error: No input file specified");
            print_usage();
            process::exit(1);
        }
    };

    let outcome = if show_tokens {
        show_file_tokens(file).map(|_| true)
    } else if check_only {
        check_file(file)
    } else {
        run_file(file)
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: pseudo [OPTIONS] [script]");
    eprintln!("       pseudo --help");
}

fn print_help() {
    println!("Pseudocode Interpreter v{}", VERSION);
    println!();
    println!("USAGE:");
    println!("    pseudo [OPTIONS] [script]");
    println!();
    println!("OPTIONS:");
    println!("    -t, --tokens    Show tokenization output (lexer only)");
    println!("    -c, --check     Report diagnostics without running the program");
    println!("    -h, --help      Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("    pseudo marks.pseudo           Run a pseudocode program");
    println!("    pseudo --check marks.pseudo   Check structure and style only");
    println!("    pseudo --tokens marks.pseudo  Show tokens from the lexer");
    println!("    pseudo                        Start the interactive prompt");
}

/// Run a program from a file. Returns whether the run was clean of
/// syntax and runtime errors.
fn run_file(filename: &str) -> Result<bool, String> {
    let source = fs::read_to_string(filename)
        .map_err(|e| format!("Failed to read file '{}': {}", filename, e))?;

    let tokens = tokenize(&source);
    let (program, syntax_errors) = parse(tokens.clone());
    let diagnostics = validate(&tokens, &syntax_errors);

    for diagnostic in &diagnostics {
        eprintln!("{}", diagnostic.render(&source));
    }
    if diagnostics.iter().any(|d| d.kind.blocks_execution()) {
        return Ok(false);
    }

    let mut interpreter = Interpreter::new()
        .with_seed(time_seed())
        .with_input(read_input_line);
    let result = interpreter.interpret(&program);
    for line in interpreter.output() {
        println!("{}", line);
    }
    if let Err(err) = result {
        eprintln!("{}", Diagnostic::runtime(err.line(), err.message()).render(&source));
        return Ok(false);
    }
    Ok(true)
}

/// Report diagnostics for a file without running it. Returns whether
/// the program would be allowed to run.
fn check_file(filename: &str) -> Result<bool, String> {
    let source = fs::read_to_string(filename)
        .map_err(|e| format!("Failed to read file '{}': {}", filename, e))?;

    let tokens = tokenize(&source);
    let (_, syntax_errors) = parse(tokens.clone());
    let diagnostics = validate(&tokens, &syntax_errors);

    if diagnostics.is_empty() {
        println!("{}: no findings", filename);
        return Ok(true);
    }
    for diagnostic in &diagnostics {
        eprintln!("{}", diagnostic.render(&source));
    }
    let count = diagnostics.len();
    println!(
        "{}: {} {}",
        filename,
        count,
        if count == 1 { "finding" } else { "findings" }
    );
    Ok(!diagnostics.iter().any(|d| d.kind.blocks_execution()))
}

/// Show tokens from lexing a file
fn show_file_tokens(filename: &str) -> Result<(), String> {
    let source = fs::read_to_string(filename)
        .map_err(|e| format!("Failed to read file '{}': {}", filename, e))?;

    let tokens = tokenize(&source);

    println!("Tokens for '{}':", filename);
    println!("{}", "=".repeat(60));
    for token in &tokens {
        println!(
            "{:4}:{:<4} {:24} {:?}",
            token.line,
            token.column,
            format!("{:?}", token.kind),
            token.text
        );
    }
    println!("{}", "=".repeat(60));
    println!("Total tokens: {}", tokens.len());

    Ok(())
}

/// Start an interactive prompt. Declarations, definitions and open
/// files persist from line to line.
fn repl() {
    let mut interpreter = Interpreter::new()
        .with_seed(time_seed())
        .with_input(read_input_line);
    let mut printed = 0;
    let mut line_number = 1;

    loop {
        print!("pseudo:{} > ", line_number);
        io::stdout().flush().unwrap();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break, // EOF
            Ok(_) => {
                let input = input.trim();

                if input == "exit" || input == "quit" {
                    break;
                }
                if input.is_empty() {
                    continue;
                }

                let tokens = tokenize(input);
                let (program, syntax_errors) = parse(tokens);
                if !syntax_errors.is_empty() {
                    for err in &syntax_errors {
                        let diagnostic = Diagnostic::syntax(err.line, err.message.clone());
                        eprintln!("{}", diagnostic.render(input));
                    }
                    continue;
                }

                let result = interpreter.interpret(&program);
                for line in &interpreter.output()[printed..] {
                    println!("{}", line);
                }
                printed = interpreter.output().len();
                if let Err(err) = result {
                    let diagnostic = Diagnostic::runtime(err.line(), err.message());
                    eprintln!("{}", diagnostic.render(input));
                }

                line_number += 1;
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }
    }

    println!("\nGoodbye!");
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// One line of standard input, without its line ending. End of input
/// yields an empty string.
fn read_input_line() -> String {
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
    line.trim_end_matches('\n').trim_end_matches('\r').to_string()
}
