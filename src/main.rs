//! The command-line interface to the tree automata library.

use clap::Parser;
use codespan_reporting::{
    files::SimpleFile,
    term::{
        self as terminal,
        termcolor::{ColorChoice, StandardStream},
    },
};
use grove::automaton::{State, TreeAut};
use grove::inclusion::{check_downward_inclusion, Preorder};
use grove::ops;
use grove::timbuk::{self, StateTable, SymbolTable};
use std::{
    fs,
    path::{Path, PathBuf},
    process,
    time::Instant,
};

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum Representation {
    /// Explicit transition tables.
    Explicit,
    /// Binary decision diagrams (not built into this tool).
    Bdd,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum Format {
    Timbuk,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Load an automaton and print it back
    Load { file: PathBuf },
    /// Compute the union of two automata
    Union { file1: PathBuf, file2: PathBuf },
    /// Compute the intersection of two automata
    Isect { file1: PathBuf, file2: PathBuf },
    /// Check language inclusion of the first automaton in the second
    Incl { file1: PathBuf, file2: PathBuf },
}

#[derive(clap::Parser, Debug)]
#[command(name = "grove", about = "Tree automata operations", long_about = None)]
struct Args {
    #[arg(short = 'r', long = "repr", value_enum, default_value_t = Representation::Explicit)]
    /// Internal representation of automata
    repr: Representation,

    #[arg(short = 'I', long = "input-format", value_enum)]
    /// Input format
    input_format: Option<Format>,

    #[arg(short = 'O', long = "output-format", value_enum)]
    /// Output format
    output_format: Option<Format>,

    #[arg(short = 'F', long = "format", value_enum)]
    /// Input and output format
    format: Option<Format>,

    #[arg(short = 't', long = "time")]
    /// Print the elapsed time of the operation to the error stream
    time: bool,

    #[command(subcommand)]
    command: Command,
}

fn load(path: &Path, symbols: &mut SymbolTable) -> (TreeAut, StateTable) {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("could not read {}: {err}", path.display());
            process::exit(1);
        }
    };
    let desc = match timbuk::parse(&text) {
        Ok(desc) => desc,
        Err(err) => {
            let files = SimpleFile::new(path.display().to_string(), &text);
            let writer = StandardStream::stderr(ColorChoice::Auto);
            let config = codespan_reporting::term::Config::default();
            let diagnostic = timbuk::parse_error_diagnostic((), &err);
            let _ = terminal::emit(&mut writer.lock(), &config, &files, &diagnostic);
            process::exit(1);
        }
    };
    match timbuk::build(&desc, symbols) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{}: {err}", path.display());
            process::exit(1);
        }
    }
}

/// Name the union's states after the operands, disambiguating collisions.
fn union_names(t1: &StateTable, t2: &StateTable) -> StateTable {
    let mut out = StateTable::new();
    for i in 0..t1.len() {
        out.push_fresh(t1.name(i).to_string());
    }
    for i in 0..t2.len() {
        out.push_fresh(t2.name(i).to_string());
    }
    out
}

/// Name each product state `left_right` in state order.
fn product_names(
    pairs: &fxhash::FxHashMap<(State, State), State>,
    t1: &StateTable,
    t2: &StateTable,
    total: usize,
) -> StateTable {
    let mut by_state: Vec<Option<&(State, State)>> = vec![None; total];
    for (pair, &state) in pairs {
        by_state[state] = Some(pair);
    }
    let mut out = StateTable::new();
    for entry in by_state {
        let (s, t) = entry.expect("every product state has a source pair");
        out.push_fresh(format!("{}_{}", t1.name(*s), t2.name(*t)));
    }
    out
}

fn main() {
    let args = Args::parse();
    let _ = simplelog::TermLogger::init(
        simplelog::LevelFilter::Warn,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    );

    if args.repr == Representation::Bdd {
        eprintln!("the bdd representation is not available in this build");
        process::exit(1);
    }
    // the only supported format; the flags exist so callers can be explicit
    let _ = (args.input_format, args.output_format, args.format);

    let mut symbols = SymbolTable::new();
    match &args.command {
        Command::Load { file } => {
            let (aut, states) = load(file, &mut symbols);
            let start = Instant::now();
            let text = timbuk::serialize(&aut, &symbols, &states, "anonymous");
            finish(&args, start);
            print!("{text}");
        }
        Command::Union { file1, file2 } => {
            let (a, states1) = load(file1, &mut symbols);
            let (b, states2) = load(file2, &mut symbols);
            let start = Instant::now();
            let (result, _, _) = ops::union(&a, &b).unwrap_or_else(|err| {
                eprintln!("union failed: {err}");
                process::exit(1);
            });
            finish(&args, start);
            let names = union_names(&states1, &states2);
            print!("{}", timbuk::serialize(&result, &symbols, &names, "union"));
        }
        Command::Isect { file1, file2 } => {
            let (a, states1) = load(file1, &mut symbols);
            let (b, states2) = load(file2, &mut symbols);
            let start = Instant::now();
            let (result, pairs) = ops::intersection(&a, &b).unwrap_or_else(|err| {
                eprintln!("intersection failed: {err}");
                process::exit(1);
            });
            finish(&args, start);
            let names = product_names(&pairs, &states1, &states2, result.num_states());
            print!("{}", timbuk::serialize(&result, &symbols, &names, "isect"));
        }
        Command::Incl { file1, file2 } => {
            let (a, _) = load(file1, &mut symbols);
            let (b, _) = load(file2, &mut symbols);
            let start = Instant::now();
            let verdict =
                check_downward_inclusion(&a, &b, Preorder::Simulation).unwrap_or_else(|err| {
                    eprintln!("inclusion check failed: {err}");
                    process::exit(1);
                });
            finish(&args, start);
            log::info!("{}", verdict.description);
            println!("{}", u32::from(verdict.holds));
        }
    }
}

fn finish(args: &Args, start: Instant) {
    if args.time {
        eprintln!("{}", start.elapsed().as_secs_f64());
    }
}
