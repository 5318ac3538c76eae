use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Accuracy/speed trade-off for face localization.
///
/// Only the locator factory interprets this value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionModel {
    /// Fast, lighter model.
    #[default]
    Hog,
    /// Slower, more accurate model.
    Cnn,
}

impl fmt::Display for DetectionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionModel::Hog => write!(f, "hog"),
            DetectionModel::Cnn => write!(f, "cnn"),
        }
    }
}

impl FromStr for DetectionModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hog" => Ok(DetectionModel::Hog),
            "cnn" => Ok(DetectionModel::Cnn),
            other => Err(format!(
                "Detection method must be 'hog' or 'cnn', got '{other}'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hog", DetectionModel::Hog)]
    #[case("cnn", DetectionModel::Cnn)]
    fn test_parse_and_display_agree(#[case] text: &str, #[case] model: DetectionModel) {
        assert_eq!(text.parse::<DetectionModel>().unwrap(), model);
        assert_eq!(model.to_string(), text);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("haar".parse::<DetectionModel>().is_err());
        assert!("HOG".parse::<DetectionModel>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&DetectionModel::Cnn).unwrap(), "\"cnn\"");
        let parsed: DetectionModel = serde_json::from_str("\"hog\"").unwrap();
        assert_eq!(parsed, DetectionModel::Hog);
    }

    #[test]
    fn test_default_is_hog() {
        assert_eq!(DetectionModel::default(), DetectionModel::Hog);
    }
}
