use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use snafu::ResultExt;
use tracing_subscriber::EnvFilter;

use minicc::error::{ReadSourceSnafu, WriteArtifactSnafu};
use minicc::{CompileResult, codegen, parser, symbol, tokenizer};

/// Compile a C subset source file to x86-64 AT&T assembly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Source file to compile.
  source: PathBuf,

  /// Directory that receives the token, tree, symbol and assembly dumps.
  #[arg(short, long, default_value = ".")]
  out_dir: PathBuf,

  /// Print the assembly to stdout instead of writing `<stem>.s`.
  #[arg(long)]
  stdout: bool,

  /// Raise log verbosity (-v debug, -vv trace).
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn init_tracing(verbose: u8) {
  let default = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

fn write_artifact(
  path: &Path,
  render: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> CompileResult<()> {
  let file = File::create(path).context(WriteArtifactSnafu { path })?;
  let mut out = BufWriter::new(file);
  render(&mut out)
    .and_then(|()| out.flush())
    .context(WriteArtifactSnafu { path })?;
  tracing::debug!(path = %path.display(), "wrote artifact");
  Ok(())
}

fn run(args: &Args) -> CompileResult<()> {
  let source = fs::read_to_string(&args.source).context(ReadSourceSnafu {
    path: &args.source,
  })?;
  let stem = args
    .source
    .file_stem()
    .map_or_else(|| "out".into(), |stem| stem.to_string_lossy());
  let artifact = |ext: &str| args.out_dir.join(format!("{stem}.{ext}"));

  let tokens = tokenizer::tokenize(&source);
  write_artifact(&artifact("tokens"), |out| {
    tokenizer::write_token_table(&tokens, out)
  })?;

  let program = parser::parse_program(&tokens)?;
  write_artifact(&artifact("ast"), |out| parser::write_ast(&program.root, out))?;
  write_artifact(&artifact("symbols"), |out| {
    symbol::write_symbol_table(&program.symbols, out)
  })?;

  let diagnostics = &program.diagnostics;
  for diagnostic in diagnostics.iter() {
    eprintln!("{diagnostic}");
  }
  if !diagnostics.is_empty() {
    eprintln!(
      "{} error(s), {} warning(s)",
      diagnostics.errors().count(),
      diagnostics.warnings().count()
    );
  }

  let asm = codegen::generate(&program.root, &program.symbols);
  if args.stdout {
    print!("{asm}");
  } else {
    write_artifact(&artifact("s"), |out| out.write_all(asm.as_bytes()))?;
  }
  Ok(())
}

fn main() {
  let args = Args::parse();
  init_tracing(args.verbose);

  if let Err(err) = run(&args) {
    eprintln!("{err}");
    process::exit(1);
  }
}
