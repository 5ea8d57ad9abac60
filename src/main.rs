/// hotpath - Specializer demo CLI
use std::env;
use std::process;
use std::sync::Arc;

use hotpath::backend::runtime::{call_function, Args, Kwargs};
use hotpath::backend::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("hotpath v{}", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    hotpath [OPTIONS]");
    eprintln!();
    eprintln!("Runs a set of sample functions interpreted and specialized and");
    eprintln!("compares the results.");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help           Print this help message");
    eprintln!("    -v, --version        Print version information");
    eprintln!("    --disassemble        Print the compiled unit of every specialized sample");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    RUST_LOG                 Log filter, e.g. hotpath=debug");
    eprintln!("    HOTPATH_SPECIALIZE       0 to run everything interpreted");
    eprintln!("    HOTPATH_LOG_DISASSEMBLY  1 to log unit disassembly at debug level");
    eprintln!("    HOTPATH_CACHE_SIZE       Specialized functions kept in the cache");
    eprintln!("    HOTPATH_TRACE            1 to trace every executed instruction");
}

fn print_version() {
    println!("hotpath {}", VERSION);
}

struct Options {
    disassemble: bool,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();

    let mut disassemble = false;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                process::exit(0);
            }
            "--disassemble" => {
                disassemble = true;
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    Ok(Options { disassemble })
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

struct Sample {
    description: &'static str,
    def: Arc<ResolvedFunction>,
    args: Vec<Value>,
}

fn samples() -> Vec<Sample> {
    // def add_two(): return 1 + 2
    let add_two = ResolvedFunction::builder("add_two")
        .stmt(Statement::ret(Expression::add(Expression::int(1), Expression::int(2))))
        .build();

    // def show_all(xs):
    //     for x in xs: print("item " + str(x))
    let show_all = ResolvedFunction::builder("show_all")
        .param("xs")
        .locals(2)
        .stmt(Statement::for_each(
            Identifier::local("x", 1),
            Expression::local("xs", 0),
            vec![Statement::expr(Expression::call(
                Expression::universal("print"),
                vec![Expression::add(
                    Expression::string("item "),
                    Expression::call(Expression::universal("str"), vec![Expression::local("x", 1)]),
                )],
            ))],
        ))
        .build();

    // def make_one():
    //     def one(): return 1
    //     return one
    let one = ResolvedFunction::builder("one")
        .stmt(Statement::ret(Expression::int(1)))
        .build();
    let make_one = ResolvedFunction::builder("make_one")
        .locals(1)
        .stmt(Statement::def(Identifier::local("one", 0), one))
        .stmt(Statement::ret(Expression::local("one", 0)))
        .build();

    // def total(xs):
    //     t = 0
    //     for x in xs: t = t + x
    //     return t
    let total = ResolvedFunction::builder("total")
        .param("xs")
        .locals(3)
        .stmt(Statement::assign(Identifier::local("t", 1), Expression::int(0)))
        .stmt(Statement::for_each(
            Identifier::local("x", 2),
            Expression::local("xs", 0),
            vec![Statement::assign(
                Identifier::local("t", 1),
                Expression::add(Expression::local("t", 1), Expression::local("x", 2)),
            )],
        ))
        .stmt(Statement::ret(Expression::local("t", 1)))
        .build();

    let numbers = Value::list(vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
    vec![
        Sample {
            description: "literal arithmetic",
            def: add_two,
            args: vec![],
        },
        Sample {
            description: "loop with builtin calls",
            def: show_all,
            args: vec![numbers.clone()],
        },
        Sample {
            description: "nested definition",
            def: make_one,
            args: vec![],
        },
        Sample {
            description: "assignment (interpreted fallback)",
            def: total,
            args: vec![numbers],
        },
    ]
}

fn run(thread: &Thread, callable: &Arc<Callable>, args: &[Value]) -> String {
    let args: Args = args.iter().cloned().collect();
    match call_function(thread, callable, args, Kwargs::new()) {
        Ok(value) => value.to_string(),
        Err(e) => format!("error: {}", e),
    }
}

fn main() {
    let options = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    init_tracing();

    let specializer = Arc::new(Specializer::from_env());
    let interpreted_thread = Thread::with_config(ExecConfig::from_env());
    let specialized_thread = Thread::with_config(ExecConfig::from_env()).with_specializer(Arc::clone(&specializer));

    let mut mismatches = 0;
    for sample in samples() {
        println!("== {} ({})", sample.def.name(), sample.description);

        let interpreted = Callable::new(Arc::clone(&sample.def), Arc::new(Interpreter));
        let specialized = specializer.specialize(&sample.def);

        let expected = run(&interpreted_thread, &interpreted, &sample.args);
        let actual = run(&specialized_thread, &specialized, &sample.args);

        println!("   interpreted: {}", expected);
        println!("   {:<11}: {}", specialized.code().describe(), actual);
        if expected != actual {
            mismatches += 1;
            println!("   MISMATCH");
        }

        if options.disassemble {
            match specializer.lookup(&sample.def) {
                Ok(unit) => println!("{}", unit.unit().disassemble()),
                Err(e) => println!("   not specialized: {}", e),
            }
        }
    }

    let stats = specializer.stats();
    println!();
    println!(
        "compiles: {}  failures: {}  cache hits: {}  evictions: {}  units loaded: {}",
        stats.compiles, stats.failures, stats.cache_hits, stats.evictions, stats.units_loaded
    );

    if mismatches > 0 {
        process::exit(1);
    }
}
