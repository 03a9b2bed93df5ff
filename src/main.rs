use std::io::Write;

use pluck::parser::Parser;
use pluck::text::{ExtractOptions, extract_text_with_options};
use pluck::tokenizer::Lexer;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut debug = false;
    let mut input: Option<String> = None;
    let mut output: Option<String> = None;

    for arg in &args {
        match arg.as_str() {
            "-d" => debug = true,
            _ if input.is_none() => input = Some(arg.clone()),
            _ if output.is_none() => output = Some(arg.clone()),
            _ => {
                eprintln!("unexpected argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    let Some(path) = input else {
        eprintln!("usage: pluck <file.pdf> [-d] [output.txt]");
        std::process::exit(1);
    };

    env_logger::Builder::from_default_env()
        .filter_level(if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("failed to read {path}: {err}");
            std::process::exit(1);
        }
    };

    let objects = Parser::new(Lexer::new(&bytes)).parse();
    let options = ExtractOptions {
        debug,
        ..ExtractOptions::default()
    };
    let text = extract_text_with_options(objects, &options);

    match output {
        Some(out_path) => {
            if let Err(err) = write_output(&out_path, &text) {
                eprintln!("failed to write {out_path}: {err}");
                std::process::exit(1);
            }
        }
        None => {
            print!("{text}");
        }
    }
}

fn write_output(path: &str, text: &str) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(UTF8_BOM)?;
    file.write_all(text.as_bytes())
}
