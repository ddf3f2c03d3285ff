//! Basis on which a user claims accreditation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Accreditation basis. Immutable once the request is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccreditationType {
    ByIncome,
    ByNetWorth,
}

impl AccreditationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccreditationType::ByIncome => "BY_INCOME",
            AccreditationType::ByNetWorth => "BY_NET_WORTH",
        }
    }
}

impl fmt::Display for AccreditationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccreditationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BY_INCOME" => Ok(AccreditationType::ByIncome),
            "BY_NET_WORTH" => Ok(AccreditationType::ByNetWorth),
            other => Err(ValidationError::invalid_format(
                "accreditation_type",
                format!("unknown accreditation type '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_wire_names() {
        assert_eq!(
            serde_json::to_string(&AccreditationType::ByNetWorth).unwrap(),
            "\"BY_NET_WORTH\""
        );
    }

    #[test]
    fn parses_storage_strings() {
        assert_eq!("BY_INCOME".parse(), Ok(AccreditationType::ByIncome));
        assert!("BY_LUCK".parse::<AccreditationType>().is_err());
    }
}
