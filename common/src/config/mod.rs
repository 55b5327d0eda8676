mod error;
pub use self::error::Error;

use config::{Config, Environment, File, FileFormat};
use std::{env, path::Path};
use tracing::trace;

use crate::err_context::ErrorContextExt;

/// Environment variable selecting the configuration profile. It takes precedence
/// over the profile given on the command line.
pub const PROFILE_ENV_VAR: &str = "NEWSLETTER_PROFILE";

static DEFAULT_ENV_NAME: &str = "default";
static LOCAL_ENV_NAME: &str = "local";

/// Builds a configuration from layered sources.
///
/// For each sub directory of `root_dir`, we read, in order: `default`, the profile (if any),
/// and `local`. Then environment variables starting with `prefix` (eg `NEWSLETTER__DATABASE__PORT`),
/// and finally the TOML `overrides` (eg `database.port=5433`).
pub fn merge_configuration<
    'a,
    R: Into<Option<&'a str>> + Clone,
    P: Into<Option<&'a str>>,
    D: AsRef<str>,
>(
    root_dir: &Path,
    sub_dirs: &[D],
    profile: R,
    prefix: P,
    overrides: Vec<String>,
) -> Result<Config, Error> {
    let profile = env::var(PROFILE_ENV_VAR)
        .ok()
        .or_else(|| profile.into().map(String::from));

    let mut builder = sub_dirs
        .iter()
        .fold(Config::builder(), |builder, sub_dir| {
            let dir_path = root_dir.join(sub_dir.as_ref());

            let default_path = dir_path.join(DEFAULT_ENV_NAME);
            trace!(
                "Reading default configuration from: {}",
                default_path.display()
            );
            let mut builder = builder.add_source(File::from(default_path));

            if let Some(profile) = profile.as_ref() {
                let profile_path = dir_path.join(profile);
                trace!(
                    "Reading profile configuration from: {}",
                    profile_path.display()
                );
                builder = builder.add_source(File::from(profile_path).required(false));
            }

            // Never checked in.
            let local_path = dir_path.join(LOCAL_ENV_NAME);
            trace!("Reading local configuration from: {}", local_path.display());
            builder.add_source(File::from(local_path).required(false))
        });

    if let Some(prefix) = prefix.into() {
        let environment = Environment::with_prefix(prefix)
            .prefix_separator("__")
            .separator("__");
        builder = builder.add_source(environment)
    }

    if !overrides.is_empty() {
        builder = builder.add_source(config_from_args(overrides)?)
    }

    builder
        .build()
        .context("Could not merge configuration")
        .map_err(|err| err.into())
}

// Create a new configuration source from a list of assignments key=value
fn config_from_args(args: impl IntoIterator<Item = String>) -> Result<Config, Error> {
    let builder = args.into_iter().fold(Config::builder(), |builder, arg| {
        builder.add_source(File::from_str(&arg, FileFormat::Toml))
    });
    builder
        .build()
        .context("Could not build configuration from args")
        .map_err(|err| err.into())
}
