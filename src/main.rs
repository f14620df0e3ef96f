use std::path::PathBuf;
use std::process;

use clap::Parser;

use printfdebug::error::Error;
use printfdebug::inject::{DEFAULT_IMPORT_PATH, DEFAULT_PACKAGE, TraceTarget};
use printfdebug::pipeline::{self, Options};

#[derive(Parser)]
#[command(
    name = "printfdebug",
    about = "Instrument Go packages with function entry/exit trace calls",
    version,
    after_help = "Files are rewritten in place. Run on a clean checkout so the change can be reverted."
)]
struct Cli {
    /// Directories holding the Go packages to instrument.
    #[arg(required = true, value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// Import path of the tracing library.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_IMPORT_PATH)]
    import_path: String,

    /// Package qualifier used in the injected calls.
    #[arg(long = "package", value_name = "NAME", default_value = DEFAULT_PACKAGE)]
    package: String,

    /// Also instrument every sub-directory containing Go files.
    #[arg(short, long)]
    recursive: bool,

    /// Print instrumented sources to stdout instead of rewriting files.
    #[arg(long)]
    dry_run: bool,

    /// List every function found.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let options = Options {
        target: TraceTarget {
            import_path: cli.import_path,
            package: cli.package,
        },
        recursive: cli.recursive,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };

    let summary = pipeline::run(&cli.dirs, &options)?;

    let line = format!(
        "done: {} function(s) and {} literal(s) in {} file(s) across {} package(s)",
        summary.functions, summary.literals, summary.files, summary.packages
    );
    if options.dry_run {
        anstream::eprintln!("{line}");
    } else {
        anstream::println!("{line}");
    }
    Ok(())
}
