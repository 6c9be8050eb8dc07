pub type SceneGenResult<T> = Result<T, SceneGenError>;

#[derive(thiserror::Error, Debug)]
pub enum SceneGenError {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A class had no foreground assets. Non-fatal: the instance is skipped
    /// and the scene proceeds with one fewer object.
    #[error("asset unavailable for class '{0}'")]
    AssetUnavailable(String),

    #[error("compose error: {0}")]
    Compose(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SceneGenError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn asset_unavailable(class: impl Into<String>) -> Self {
        Self::AssetUnavailable(class.into())
    }

    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SceneGenError::configuration("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(
            SceneGenError::asset_unavailable("Ball")
                .to_string()
                .contains("asset unavailable for class 'Ball'")
        );
        assert!(
            SceneGenError::compose("x")
                .to_string()
                .contains("compose error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SceneGenError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
