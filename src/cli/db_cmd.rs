use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum DbCmd {
    #[command(
        about = "Migrate storage and backfill plan levels",
        long_about = "Bring the storage schema up to date, give every workout plan without a fitness level the 'unspecified' level, create the plan and session indexes and print a short report."
    )]
    Setup,
}
