pub type TreeMovieResult<T> = Result<T, TreeMovieError>;

#[derive(thiserror::Error, Debug)]
pub enum TreeMovieError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("interpolation error: {0}")]
    Interpolation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TreeMovieError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    pub fn interpolation(msg: impl Into<String>) -> Self {
        Self::Interpolation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            TreeMovieError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            TreeMovieError::layout("x")
                .to_string()
                .contains("layout error:")
        );
        assert!(
            TreeMovieError::interpolation("x")
                .to_string()
                .contains("interpolation error:")
        );
        assert!(
            TreeMovieError::render("x")
                .to_string()
                .contains("render error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = TreeMovieError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
