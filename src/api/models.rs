use serde::Deserialize;

use crate::data_models::{FormError, Level};

/// Query string of both `/` and `/results`.
#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub level: Option<i64>,
    /// Raw slider position, sent when the form is submitted without script.
    pub slider: Option<i64>,
}

impl SearchParams {
    /// `level` wins over `slider`; neither means the loosest level.
    pub fn level(&self) -> Result<Level, FormError> {
        match (self.level, self.slider) {
            (Some(level), _) => Level::new(level),
            (None, Some(slider)) => Level::from_slider(slider),
            (None, None) => Ok(Level::default()),
        }
    }
}
