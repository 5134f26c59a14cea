mod error;
use colored::Colorize;
use error::*;
use filch::{fileio, DataFile, Program, Runtime};
use std::{
    collections::HashMap,
    env::Args,
    fs::{read_to_string, OpenOptions},
    io::{ErrorKind, Write},
    path::Path,
};

fn main() {
    if let Err(e) = dispatch() {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn dispatch() -> CLIResult {
    let mut args = std::env::args();
    args.next(); // Ignore program name
    match args.next() {
        Some(arg) => {
            if &arg == "run" {
                exec(args, false)
            } else if &arg == "trace" {
                exec(args, true)
            } else {
                Err(CLIError::UnknownArgument(arg))
            }
        }
        None => Err(CLIError::InsufficientArguments),
    }
}

fn exec(mut args: Args, trace: bool) -> CLIResult {
    let path = args.next().ok_or(CLIError::InsufficientArguments)?;
    let source = slurp(&path)?;

    let program = match filch::load(&source) {
        Ok(program) => program,
        Err(e) => return Err(CLIError::ExternalError("LoadError".into(), e.to_string())),
    };

    let mut files = HashMap::new();
    let mut sources = HashMap::new();
    for name in args {
        let (id, file) = data_file(&name)?;
        files.insert(id, file);
        sources.insert(id, name);
    }

    let runtime = if trace {
        run_traced(&program, files)?
    } else {
        match program.run(files) {
            Ok(runtime) => runtime,
            Err(e) => return Err(CLIError::ExternalError("RuntimeError".into(), e.to_string())),
        }
    };

    report(&runtime);
    write_back(&runtime, &sources)
}

/// Same run, but show every statement and the state it leaves behind.
fn run_traced(program: &Program, files: HashMap<i64, DataFile>) -> CLIResult<Runtime> {
    let mut runtime = Runtime::new(program, files);
    let statements = program.statements();
    while runtime.pc < statements.len() {
        let statement = &statements[runtime.pc];
        print!("{:<24}", statement.to_string());
        if let Err(e) = runtime.step(statement) {
            println!();
            return Err(CLIError::ExternalError("RuntimeError".into(), e.to_string()));
        }
        println!("{}", runtime);
    }
    Ok(runtime)
}

fn report(runtime: &Runtime) {
    println!("{}", runtime);
    let mut ids: Vec<_> = runtime.files.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        println!("{}: {}", id, runtime.files[&id]);
    }
}

/// Storages that came from disk go back to the paths they came from;
/// ones the program conjured with GRAB only show up in the report.
fn write_back(runtime: &Runtime, sources: &HashMap<i64, String>) -> CLIResult {
    for (id, path) in sources {
        let file = match runtime.files.get(id) {
            Some(file) => file,
            None => continue,
        };
        let mut fd = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
            .map_err(|e| CLIError::ExternalError("io::Error".into(), e.to_string()))?;
        fd.write_all(fileio::ser(file).as_bytes())
            .map_err(|e| CLIError::ExternalError("io::Error".into(), e.to_string()))?;
    }
    Ok(())
}

fn data_file(name: &str) -> CLIResult<(i64, DataFile)> {
    let base = Path::new(name)
        .file_name()
        .and_then(|base| base.to_str())
        .ok_or_else(|| CLIError::NotFound(name.to_string()))?;
    let id = match fileio::file_id(base) {
        Ok(id) => id,
        Err(e) => return Err(CLIError::ExternalError("FileIOError".into(), e.to_string())),
    };
    let text = slurp(name)?;
    match fileio::parse(id, &text) {
        Ok(file) => Ok((id, file)),
        Err(e) => Err(CLIError::ExternalError("FileIOError".into(), e.to_string())),
    }
}

fn slurp(path: &str) -> CLIResult<String> {
    match read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => Err(CLIError::NotFound(path.to_string())),
            _ => Err(CLIError::ExternalError("io::Error".into(), e.to_string())),
        },
    }
}
