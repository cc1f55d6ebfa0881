use clap::{Parser, Subcommand};
use kernelize::{
    parse_source, CudaCodegen, FunctionSpec, KernelCompiler, KernelOptions, Lexer, Module,
    NvccCompiler, Parser as KernelParser,
};
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "kernelize")]
#[command(about = "kernelize - Python-style element functions to CUDA C kernels", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lex and parse a source file
    Build {
        /// Input source file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the Abstract Syntax Tree
        #[arg(short, long)]
        ast: bool,

        /// Print tokens from lexer
        #[arg(short, long)]
        tokens: bool,
    },

    /// Translate a function to CUDA C
    Transpile {
        /// Input source file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Function to translate (defaults to the first one in the file)
        #[arg(short, long)]
        function: Option<String>,

        /// Output .cu file (prints to stdout if omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        kernel: KernelArgs,
    },

    /// Check that every function in a file translates
    Check {
        /// Input source file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Translate a function and compile it to PTX with nvcc
    Compile {
        /// Input source file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Function to compile (defaults to the first one in the file)
        #[arg(short, long)]
        function: Option<String>,

        /// Directory for the staged .cu and .ptx files
        #[arg(long = "staging-dir", value_name = "DIR", default_value = ".")]
        staging_dir: PathBuf,

        /// CUDA compiler to invoke
        #[arg(long, default_value = "nvcc")]
        nvcc: String,

        #[command(flatten)]
        kernel: KernelArgs,
    },

    /// Print version information
    Version,
}

/// Flags that shape the generated kernel text
#[derive(clap::Args)]
struct KernelArgs {
    /// Name of the implicit result buffer
    #[arg(long = "result-name", default_value = kernelize::RESULT)]
    result_name: String,

    /// Name of the global thread index
    #[arg(long = "index-name", default_value = kernelize::INDEX)]
    index_name: String,

    /// Element type for unannotated parameters and the result buffer
    #[arg(long = "default-type", default_value = kernelize::DEFAULT_ELEMENT_TYPE)]
    default_type: String,

    /// Declared type of scratch locals
    #[arg(long = "local-type", default_value = kernelize::DEFAULT_ELEMENT_TYPE)]
    local_type: String,
}

impl KernelArgs {
    fn options(&self) -> KernelOptions {
        KernelOptions {
            result_name: self.result_name.clone(),
            index_name: self.index_name.clone(),
            default_element_type: self.default_type.clone(),
            result_element_type: self.default_type.clone(),
            local_type: self.local_type.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build { file, ast: print_ast, tokens: print_tokens } => {
            build_file(file, print_ast, print_tokens)?;
        }
        Commands::Transpile { file, function, output, kernel } => {
            transpile_file(file, function, output, kernel.options())?;
        }
        Commands::Check { file } => {
            check_file(file)?;
        }
        Commands::Compile { file, function, staging_dir, nvcc, kernel } => {
            compile_file(file, function, staging_dir, nvcc, kernel.options())?;
        }
        Commands::Version => {
            println!("kernelize v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn build_file(file: PathBuf, print_ast: bool, print_tokens: bool) -> anyhow::Result<()> {
    println!("Building: {}", file.display());

    let source = fs::read_to_string(&file)?;

    let mut lexer = Lexer::new(&source);
    let tokens = lexer.tokenize()?;

    if print_tokens {
        println!("\n=== TOKENS ===");
        for (idx, token) in tokens.iter().enumerate() {
            println!("{:3}: {:?}", idx, token);
        }
    }

    let mut parser = KernelParser::new(tokens.clone());
    let module = match parser.parse() {
        Ok(module) => module,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return Err(e.into());
        }
    };

    if print_ast {
        println!("\n=== AST ===");
        println!("{:#?}", module);
    }

    println!("\nParse: OK");
    println!("Total tokens: {}", tokens.len());
    println!("Functions: {}", module.functions.len());

    Ok(())
}

/// Pick the requested function, or the first one defined
fn select_function<'m>(module: &'m Module, name: Option<&str>) -> anyhow::Result<&'m FunctionSpec> {
    match name {
        Some(name) => module.function(name)
            .ok_or_else(|| anyhow::anyhow!("No function named '{}'", name)),
        None => module.functions.first()
            .ok_or_else(|| anyhow::anyhow!("No function definition found")),
    }
}

fn transpile_file(
    file: PathBuf,
    function: Option<String>,
    output: Option<PathBuf>,
    options: KernelOptions,
) -> anyhow::Result<()> {
    let source = fs::read_to_string(&file)?;
    let module = parse_source(&source)?;
    let func = select_function(&module, function.as_deref())?;

    let kernel = kernelize::transpile_cached(func, &options)?;

    match output {
        Some(path) => {
            fs::write(&path, format!("{}\n", kernel.source))?;
            info!(kernel = %kernel.name, path = %path.display(), "wrote kernel");
        }
        None => println!("{}", kernel.source),
    }

    Ok(())
}

fn check_file(file: PathBuf) -> anyhow::Result<()> {
    println!("Checking: {}", file.display());

    let source = fs::read_to_string(&file)?;
    let module = match parse_source(&source) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return Err(e.into());
        }
    };

    let codegen = CudaCodegen::new();
    let mut failures = 0;
    for func in &module.functions {
        match codegen.generate(func) {
            Ok(_) => println!("  {}: OK", func.name),
            Err(e) => {
                println!("  {}: {}", func.name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} functions cannot be translated", failures, module.functions.len());
    }
    println!("Translation check: OK");
    Ok(())
}

fn compile_file(
    file: PathBuf,
    function: Option<String>,
    staging_dir: PathBuf,
    nvcc: String,
    options: KernelOptions,
) -> anyhow::Result<()> {
    let source = fs::read_to_string(&file)?;
    let module = parse_source(&source)?;
    let func = select_function(&module, function.as_deref())?;

    let kernel = kernelize::transpile_cached(func, &options)?;
    let ptx = NvccCompiler::with_program(nvcc).compile(&kernel, &staging_dir)?;

    println!("Kernel source: {}", ptx.cu_path.display());
    println!("PTX output: {}", ptx.ptx_path.display());
    Ok(())
}
