use std::path::PathBuf;

/// Failures that should stop a stage before it does any work.
///
/// Everything else travels as a plain `anyhow::Error`; the binary downcasts
/// to this type to decide between exit code 2 and a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("missing {0} in environment")]
    MissingCredentials(&'static str),
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("no usable input: {0}")]
    NoUsableInput(String),
}

impl PipelineError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Exit code for an arbitrary stage error: 2 for [`PipelineError`], 1 otherwise.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PipelineError>() {
        Some(kind) => kind.exit_code(),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn configuration_errors_exit_with_two() {
        let err: anyhow::Error = PipelineError::MissingCredentials("TMDB_API_KEY").into();
        assert_eq!(exit_code_for(&err), 2);
        assert_eq!(err.to_string(), "missing TMDB_API_KEY in environment");
    }

    #[test]
    fn context_does_not_hide_the_kind() {
        let res: Result<(), PipelineError> =
            Err(PipelineError::MissingInput(PathBuf::from("data/titles.csv")));
        let err = res.context("seed: reading tables").unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let err = anyhow::anyhow!("connection reset");
        assert_eq!(exit_code_for(&err), 1);
    }
}
