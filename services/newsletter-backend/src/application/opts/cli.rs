use std::path::PathBuf;

use common::config;
use common::err_context::ErrorContextExt;
use common::settings::Settings;

use super::Error;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sub directories of the config directory merged into the settings.
pub const CONFIG_SUB_DIRS: [&str; 4] = ["service", "database", "email", "worker"];

/// Prefix of environment variables overriding settings, eg `NEWSLETTER__DATABASE__PORT`.
pub const ENV_PREFIX: &str = "NEWSLETTER";

#[derive(Debug, Clone, clap::Parser)]
#[clap(
    name = "newsletter",
    about = "Newsletter subscription service",
    version = VERSION,
    )]
pub struct Opts {
    /// Defines the config directory
    #[arg(value_parser = clap::value_parser!(PathBuf), short = 'c', long = "config-dir")]
    pub config_dir: PathBuf,

    /// Defines the run mode in {testing, dev, prod, ...}
    ///
    /// If no run mode is provided, a default behavior will be used.
    #[arg(short = 'm', long = "run-mode")]
    pub run_mode: Option<String>,

    /// Override settings values using key=value
    #[arg(short = 's', long = "setting")]
    pub settings: Vec<String>,

    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Serve the subscription form, and run the confirmation worker if enabled
    Run,
    /// Only run the confirmation worker
    Worker,
    /// Prints the service's configuration
    Config,
}

impl TryInto<Settings> for Opts {
    type Error = Error;

    fn try_into(self) -> Result<Settings, Self::Error> {
        config::merge_configuration(
            self.config_dir.as_ref(),
            &CONFIG_SUB_DIRS,
            self.run_mode.as_deref(),
            ENV_PREFIX,
            self.settings,
        )
        .context("Newsletter Settings: Could not merge configuration")?
        .try_deserialize()
        .context("Newsletter Settings: Could not deserialize configuration")
        .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::settings::Executor;
    use speculoos::prelude::*;

    fn config_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
    }

    #[test]
    fn should_return_ok_with_default_config_dir() {
        let opts = Opts {
            config_dir: config_dir(),
            run_mode: None,
            settings: vec![],
            cmd: Command::Run,
        };

        let settings: Result<Settings, _> = opts.try_into();
        assert_that(&settings).is_ok();
    }

    #[test]
    fn testing_profile_should_use_memory_executor() {
        let opts = Opts {
            config_dir: config_dir(),
            run_mode: Some("testing".to_string()),
            settings: vec![],
            cmd: Command::Run,
        };

        let settings: Settings = opts.try_into().unwrap();
        assert_that(&settings.database.executor).is_equal_to(Executor::Memory);
        assert_that(&settings.mode).is_equal_to("testing".to_string());
    }

    #[test]
    fn should_apply_overrides() {
        let opts = Opts {
            config_dir: config_dir(),
            run_mode: None,
            settings: vec![
                "newsletter.subscribe_url='/join'".to_string(),
                "database.table_name='subscribers'".to_string(),
            ],
            cmd: Command::Config,
        };

        let settings: Settings = opts.try_into().unwrap();
        assert_that(&settings.newsletter.subscribe_url).is_equal_to("/join".to_string());
        assert_that(&settings.database.table_name).is_equal_to("subscribers".to_string());
    }
}
