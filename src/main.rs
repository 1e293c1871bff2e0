use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use colored::{ColoredString, Colorize};
use structopt::StructOpt;

use torino::common::data::Data;
use torino::common::source::Source;
use torino::vm::{prelude, Env, VM};
use torino::{compile, eval, Error};

#[derive(StructOpt, Debug)]
#[structopt(name = "torino", about = "The Torino programming language")]
struct Torino {
    /// Script to run; leave it out for a repl
    #[structopt(parse(from_os_str))]
    path: Option<PathBuf>,

    /// Print the compiled bytecode before running
    #[structopt(long)]
    dump: bool,
}

enum Kind {
    Info,
    Fatal,
}

/// A small logger for the driver's own status messages, keeping them
/// visually distinct from program output and diagnostics.
struct Status(Kind, &'static str);

impl Status {
    fn info() -> Status {
        Status(Kind::Info, "Info")
    }

    fn fatal() -> Status {
        Status(Kind::Fatal, "Fatal")
    }

    fn tag(&self) -> ColoredString {
        match self.0 {
            Kind::Info => self.1.blue(),
            Kind::Fatal => self.1.red(),
        }
        .bold()
    }

    fn multiline(&self, lines: Vec<&str>) {
        eprintln!("\n{}", self.tag());
        for line in lines {
            eprintln!("{}", line);
        }
        eprintln!()
    }

    fn log(&self, message: &str) {
        let lines = message.lines().collect::<Vec<&str>>();

        if lines.len() > 1 {
            self.multiline(lines);
        } else {
            eprintln!("{} {}", self.tag(), message);
        }
    }
}

fn main() {
    let args = Torino::from_args();

    match args.path {
        Some(path) => run_file(&path, args.dump),
        None => repl(args.dump),
    }
}

fn fatal(message: &str) -> ! {
    Status::fatal().log(message);
    process::exit(1);
}

fn run_file(path: &PathBuf, dump: bool) {
    let source = match Source::path(path) {
        Ok(source) => source,
        Err(_) => fatal(&format!("could not read '{}'", path.display())),
    };

    let program = match compile(source) {
        Ok(program) => program,
        Err(error) => fatal(&error.to_string()),
    };

    if dump {
        println!("{}", program);
    }

    let mut vm = VM::stdout();
    let env = prelude();
    if let Err(trace) = vm.run(&program, &env) {
        fatal(&trace.to_string());
    }
}

fn repl(dump: bool) {
    Status::info().log("The Torino programming language");

    let env = prelude();
    let mut vm = VM::stdout();
    let stdin = io::stdin();

    loop {
        print!(">>> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => (),
        }

        if line.trim().is_empty() {
            continue;
        }

        one_line(&line, &mut vm, &env, dump);
    }
}

/// Evaluates one repl input: diagnostics are reported and the session
/// continues; non-None results are echoed in their repr form.
fn one_line(line: &str, vm: &mut VM, env: &Env, dump: bool) {
    if dump {
        match compile(Source::source(line)) {
            Ok(program) => print!("{}", program),
            Err(error) => {
                eprintln!("{}", error);
                return;
            }
        }
    }

    match eval(line, vm, env) {
        Ok(Data::None) => (),
        Ok(value) => println!("{}", value.repr()),
        Err(Error::Syntax(error)) => eprintln!("{}", error),
        Err(Error::Trace(trace)) => eprintln!("{}", trace),
    }
}
