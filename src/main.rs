use clap::Parser;
use miette::Result;
use oficina::cli::commands;
use oficina::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Terminate quietly on a closed pipe (`oficina quote list | head`)
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
    oficina::cli::logging::init(global.verbose);

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Customer(cmd) => commands::customer::run(cmd, &global),
        Commands::Vehicle(cmd) => commands::vehicle::run(cmd, &global),
        Commands::Employee(cmd) => commands::employee::run(cmd, &global),
        Commands::Catalog(cmd) => commands::catalog::run(cmd, &global),
        Commands::Quote(cmd) => commands::quote::run(cmd, &global),
        Commands::Order(cmd) => commands::order::run(cmd, &global),
        Commands::Pdv(cmd) => commands::pdv::run(cmd, &global),
        Commands::Schedule(cmd) => commands::schedule::run(cmd, &global),
        Commands::Checklist(cmd) => commands::checklist::run(cmd, &global),
        Commands::Portal(cmd) => commands::portal::run(cmd, &global),
        Commands::Status(args) => commands::status::run(args, &global),
        Commands::Validate(args) => commands::validate::run(args, &global),
        Commands::Import(args) => commands::import::run(args, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
