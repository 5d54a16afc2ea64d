use anyhow::Result;
use clap::Parser;
use loadpath::config::Config;
use loadpath::runtime::RealRuntime;
use std::path::PathBuf;

/// loadpath - package resolver and module loader
///
/// Discovers packages under a set of prefixes, orders them by dependency and
/// resolves module identifiers against the resulting search path.
///
/// If LOADPATH_PACKAGE_HOME is set, that directory is searched before every
/// other prefix; otherwise ~/.loadpath is used when it exists.
///
/// Examples:
///   loadpath paths           # Print the module search path
///   loadpath order           # Print packages in load order
///   loadpath find core/fs    # Print the file a module resolves to
#[derive(Parser, Debug)]
#[command(author, version = env!("LOADPATH_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Package prefix (repeatable; also via LOADPATH_PREFIX, colon separated)
    #[arg(
        long = "prefix",
        short = 'p',
        env = "LOADPATH_PREFIX",
        value_delimiter = ':',
        value_name = "PATH",
        global = true
    )]
    pub prefixes: Vec<PathBuf>,

    /// Active engine (repeatable; defaults to "default")
    #[arg(
        long = "engine",
        short = 'e',
        env = "LOADPATH_ENGINES",
        value_delimiter = ',',
        value_name = "NAME",
        global = true
    )]
    pub engines: Vec<String>,

    /// Extra package directory searched before every prefix (repeatable)
    #[arg(long = "package", value_name = "DIR", global = true)]
    pub packages: Vec<PathBuf>,

    /// Program file whose enclosing packages become prefixes
    #[arg(long = "program", value_name = "FILE", global = true)]
    pub program: Option<PathBuf>,

    /// Fail on unreadable package descriptors and failed preloads
    #[arg(long, env = "LOADPATH_STRICT", global = true)]
    pub strict: bool,

    /// Also honor build-only `using` aliases
    #[arg(long = "build-dependencies", global = true)]
    pub build_dependencies: bool,

    /// Skip package discovery; search only the bootstrap paths
    #[arg(long = "no-packages", global = true)]
    pub no_packages: bool,

    /// Log debug messages
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the module search path
    Paths,

    /// Print packages in load order
    Order,

    /// Print every cataloged package
    Catalog,

    /// Print satellite packages and their aliases
    Using,

    /// Print installed engine packages
    Engines,

    /// Print the file a module identifier resolves to
    Find(ModuleArgs),

    /// Load a module and print its exports
    Load(ModuleArgs),

    /// Locate a file inside the installed packages
    Resource(ResourceArgs),
}

#[derive(clap::Args, Debug)]
pub struct ModuleArgs {
    /// Top-level module identifier
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ResourceArgs {
    /// Path terms, each remapped through a package's "directories"
    #[arg(value_name = "TERM", required = true)]
    pub terms: Vec<String>,

    /// Print every match instead of the first
    #[arg(long)]
    pub all: bool,
}

impl Cli {
    fn config(&self, runtime: &RealRuntime) -> Result<Config> {
        let base = Config::new(runtime, self.prefixes.clone(), self.program.as_deref())?;
        let defaults = Config::default();
        Ok(Config {
            packages: self.packages.clone(),
            engines: if self.engines.is_empty() {
                defaults.engines
            } else {
                self.engines.clone()
            },
            strict: self.strict,
            verbose: self.verbose,
            include_build_dependencies: self.build_dependencies,
            no_packages: self.no_packages,
            ..base
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = RealRuntime;
    let config = cli.config(&runtime)?;

    let level = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Paths => loadpath::commands::paths(runtime, config)?,
        Commands::Order => loadpath::commands::order(runtime, config)?,
        Commands::Catalog => loadpath::commands::catalog(runtime, config)?,
        Commands::Using => loadpath::commands::using(runtime, config)?,
        Commands::Engines => loadpath::commands::engines(runtime, config)?,
        Commands::Find(args) => loadpath::commands::find(runtime, config, &args.id)?,
        Commands::Load(args) => loadpath::commands::load(runtime, config, &args.id)?,
        Commands::Resource(args) => {
            loadpath::commands::resource(runtime, config, &args.terms, args.all)?
        }
    }
    Ok(())
}
