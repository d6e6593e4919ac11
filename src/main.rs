use clap::Parser;
use miette::Result;
use reqtrace::cli::{Cli, Commands, GlobalOpts};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Build(args) => reqtrace::cli::commands::build::run(args, &global),
        Commands::Check(args) => reqtrace::cli::commands::check::run(args, &global),
        Commands::Orphans(args) => reqtrace::cli::commands::orphans::run(args, &global),
        Commands::Coverage(args) => reqtrace::cli::commands::coverage::run(args, &global),
        Commands::Links(args) => reqtrace::cli::commands::links::run(args, &global),
        Commands::Completions(args) => reqtrace::cli::commands::completions::run(args),
    }
}

/// `RUST_LOG` wins; otherwise `-v` means debug, `-q` errors only
fn init_logging(global: &GlobalOpts) {
    let default_level = if global.verbose {
        "reqtrace=debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
