use clap::Parser;
use miette::Result;
use qat::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
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
    init_logging(cli.global.verbose);

    let global = &cli.global;
    match cli.command {
        Commands::Init(args) => qat::cli::commands::init::run(args),
        Commands::New(args) => qat::cli::commands::new::run(args, global),
        Commands::Calc(args) => qat::cli::commands::calc::run(args, global),
        Commands::Eval(args) => qat::cli::commands::eval::run(args, global),
        Commands::Import(args) => qat::cli::commands::import::run(args),
        Commands::Validate(args) => qat::cli::commands::validate::run(args, global),
        Commands::Render(args) => qat::cli::commands::render::run(args, global),
        Commands::Completions(args) => qat::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr so piped output stays clean. RUST_LOG wins over -v.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "qat=debug",
        _ => "qat=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
