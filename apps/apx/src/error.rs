//! CLI error handling

use std::fmt;

use apx_errors::UserFacingError;

/// Why an apx command stopped
#[derive(Debug)]
pub enum CliError {
    /// Settings could not be loaded from file, environment or flags
    Config(apx_errors::ConfigError),
    /// Catalog, mirror or sandbox operation failed
    Patch(apx_errors::Error),
    /// Package names that the catalog does not list
    UnknownPackages(Vec<String>),
    /// A fetch or repair stopped before every package finished
    Incomplete { packages: Vec<String>, repaired: bool },
    /// Writing the result to stdout failed
    Output(std::io::Error),
}

impl CliError {
    /// Process exit status; an interrupted fetch is distinct from a hard error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Incomplete { .. } => 3,
            CliError::UnknownPackages(_) => 2,
            _ => 1,
        }
    }
}

fn write_details(f: &mut fmt::Formatter<'_>, e: &dyn UserFacingError) -> fmt::Result {
    if let Some(code) = e.user_code() {
        write!(f, "\n  Code: {code}")?;
    }
    if let Some(hint) = e.user_hint() {
        write!(f, "\n  Hint: {hint}")?;
    }
    if e.is_retryable() {
        write!(f, "\n  Retry: run the same command again.")?;
    }
    Ok(())
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Could not load apx settings: {}", e.user_message())?;
                write_details(f, e)
            }
            CliError::Patch(e) => {
                write!(f, "{}", e.user_message())?;
                write_details(f, e)
            }
            CliError::UnknownPackages(names) => write!(
                f,
                "Not in the catalog: {}\n  Hint: `apx status` lists the known packages.",
                names.join(", ")
            ),
            CliError::Incomplete { packages, repaired } => {
                let verb = if *repaired { "Repair" } else { "Fetch" };
                write!(
                    f,
                    "{verb} of {} stopped early; assets already in the sandbox are kept.\n  \
                     Retry: run `apx fetch` to copy only what is still missing.",
                    packages.join(", ")
                )
            }
            CliError::Output(e) => write!(f, "Could not write output: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Patch(e) => Some(e),
            CliError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<apx_errors::ConfigError> for CliError {
    fn from(e: apx_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<apx_errors::Error> for CliError {
    fn from(e: apx_errors::Error) -> Self {
        CliError::Patch(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Output(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apx_errors::{ConfigError, DownloadError};

    #[test]
    fn test_incomplete_fetch_points_at_resume() {
        let err = CliError::Incomplete {
            packages: vec!["core".to_string(), "dlc".to_string()],
            repaired: false,
        };
        let text = err.to_string();
        assert!(text.starts_with("Fetch of core, dlc stopped early"));
        assert!(text.contains("apx fetch"));
        assert_eq!(err.exit_code(), 3);

        let err = CliError::Incomplete {
            packages: vec!["dlc".to_string()],
            repaired: true,
        };
        assert!(err.to_string().starts_with("Repair of dlc"));
    }

    #[test]
    fn test_unknown_packages_are_listed() {
        let err = CliError::UnknownPackages(vec!["maps".to_string(), "extra".to_string()]);
        assert!(err.to_string().starts_with("Not in the catalog: maps, extra"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_patch_error_carries_code_and_hint() {
        let err = CliError::from(apx_errors::Error::from(DownloadError::PackageNotFound {
            package: "dlc".to_string(),
        }));
        let text = err.to_string();
        assert!(text.contains("dlc"));
        assert!(text.contains("\n  Hint: "));
        assert_eq!(err.exit_code(), 1);

        let err = CliError::from(ConfigError::MissingField {
            field: "mirror".to_string(),
        });
        let text = err.to_string();
        assert!(text.starts_with("Could not load apx settings: missing required field: mirror"));
        assert!(text.contains("--mirror"));
    }
}
