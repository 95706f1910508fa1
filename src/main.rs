use std::*;
use process;

use anyhow::{Context, Result};
use log::{debug, LevelFilter};

use crate::config::*;
use crate::error::CompileError;

mod config;
mod error;
mod machine_code_generator;
mod parser;
mod symbol;
mod tokenizer;

fn exit_with_compile_error(file_name: &str, err: CompileError) -> ! {
    eprintln!("{}", err.report(file_name));
    process::exit(1);
}

fn write_assembly(path: &str, code: &[String]) -> Result<()> {
    let mut text = code.join("\n");
    text.push('\n');
    fs::write(path, text).with_context(|| format!("cannot write the assembly to {}", path))
}

fn main() {
    let config = Config::try_parse().unwrap_or_else(|err| {
        eprintln!("Something went wrong parsing arguments: {:#}", err);
        process::exit(1);
    });

    let mut logger = env_logger::Builder::from_default_env();
    if config.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let source_code = fs::read_to_string(&config.input).unwrap_or_else(|err| {
        eprintln!("Something went wrong reading {}: {}", config.input, err);
        process::exit(1);
    });
    let reserved_symbols = get_reserved_symbols();

    if config.tokens {
        let processor = tokenizer::Tokenizer::new(&source_code, &reserved_symbols);
        let tokens = processor
            .run()
            .unwrap_or_else(|err| exit_with_compile_error(&config.input, err));
        print!("{}", tokenizer::token_count_report(&tokens));
        return;
    }

    let compilation = parser::Parser::new(&source_code, &reserved_symbols)
        .and_then(parser::Parser::run)
        .unwrap_or_else(|err| exit_with_compile_error(&config.input, err));

    if config.pretty {
        print!("{}", compilation.listing);
    }
    if config.xref {
        print!("{}", compilation.scope.cross_reference());
    }

    if let Err(err) = write_assembly(&config.output, &compilation.code) {
        eprintln!("{:#}", err);
        process::exit(1);
    }
    debug!("wrote {} lines to {}", compilation.code.len(), config.output);
}
