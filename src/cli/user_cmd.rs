use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum UserCmd {
    #[command(
        about = "Create a local account",
        long_about = "Register a local account with an email and password. The password is prompted for when not given on the command line."
    )]
    Add {
        #[arg(long, value_name = "EMAIL", help = "Account email", required = true)]
        email: String,
        #[arg(
            long,
            value_name = "NAME",
            help = "Display name (defaults to the part of the email before '@')",
            required = false
        )]
        username: Option<String>,
        #[arg(
            long,
            value_name = "PASSWORD",
            help = "Account password",
            required = false
        )]
        password: Option<String>,
    },
}
