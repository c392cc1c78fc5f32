use crate::configuration::{Configuration, GoogleCredentials};

pub struct Context {
    pub config: Configuration,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        let cfg = Configuration {
            data_dir: cli.data_dir.clone(),
            storage: cli.storage,
            listen: cli.listen,
            public_url: cli
                .public_url
                .clone()
                .unwrap_or_else(|| format!("http://{}", cli.listen)),
            google: match (&cli.google_client_id, &cli.google_client_secret) {
                (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                    Some(GoogleCredentials {
                        client_id: id.clone(),
                        client_secret: secret.clone(),
                    })
                }
                _ => None,
            },
            log_file: cli.log_file.clone(),
            reset: cli.reset,
        };
        Self { config: cfg }
    }
}
