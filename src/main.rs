mod cli;
mod db;
mod dedup;
mod error;
mod fmt;
mod importer;
mod models;
mod normalizer;
mod sections;
mod settings;
mod sources;
mod validate;

use clap::{CommandFactory, Parser};

use cli::{Cli, CodesCommands, Commands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("KAD_LOG", "warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            policy,
            vat_rate,
        } => cli::init::run(data_dir, policy, vat_rate),
        Commands::Import {
            file,
            format,
            sheet,
            policy,
            dry_run,
            accept_collisions,
            json,
        } => cli::import::run(cli::import::ImportArgs {
            file,
            format,
            sheet,
            policy,
            dry_run,
            accept_collisions,
            json,
        }),
        Commands::Normalize { values, policy } => cli::normalize::run(&values, policy.as_deref()),
        Commands::Classify { codes } => cli::normalize::classify_codes(&codes),
        Commands::Codes { command } => match command {
            CodesCommands::List { section, all } => cli::codes::list(section.as_deref(), all),
            CodesCommands::Show { code } => cli::codes::show(&code),
            CodesCommands::Update {
                code,
                description,
                description_en,
                vat_rate,
                popular,
                related,
            } => cli::codes::update(
                &code,
                db::CodeUpdate {
                    description,
                    description_en,
                    vat_rate,
                    is_popular: popular,
                    related_codes: related,
                },
            ),
            CodesCommands::Deactivate { code } => cli::codes::set_active(&code, false),
            CodesCommands::Activate { code } => cli::codes::set_active(&code, true),
        },
        Commands::Check { kind, value } => cli::check::run(kind, &value),
        Commands::Status => cli::status::run(),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "kad", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
