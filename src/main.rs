use std::io::{self, BufRead, Write};

use clap::{App, Arg};

use kaleido::{Item, Parser};

fn main() -> anyhow::Result<()> {
    let matches = App::new("kaleido")
        .version(env!("CARGO_PKG_VERSION"))
        .about("parser frontend for a kaleidoscope-style toy language")
        .arg(
            Arg::with_name("source")
                .help("program text to parse; reads stdin interactively if absent"),
        )
        .get_matches();

    match matches.value_of("source") {
        Some(source) => parse_and_report(source),
        None => repl(),
    }
}

fn repl() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("ready> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        parse_and_report(&line)?;
    }
}

/// Parse every top-level construct in `source`, reporting each one. On a
/// parse failure the offending token is discarded and parsing resumes, so
/// one bad construct never takes down the rest of the input.
fn parse_and_report(source: &str) -> anyhow::Result<()> {
    let mut parser = Parser::from_source(source);
    loop {
        match parser.parse_item() {
            Ok(None) => return Ok(()),
            Ok(Some(item)) => report(&item),
            Err(err) => {
                eprintln!("error: {}", err);
                parser.synchronize();
            }
        }
    }
}

fn report(item: &Item) {
    match item {
        Item::Extern(proto) => println!("Parsed an extern: {}", proto),
        Item::Function(func) if func.proto.is_anonymous() => {
            println!("Parsed a top-level expression: {}", func.body)
        }
        Item::Function(func) => println!("Parsed a function definition: {}", func),
    }
}
