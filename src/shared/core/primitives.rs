use serde::{Deserialize, Serialize};

/// An amount in minor currency units (cents for USD).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

/// A value the upstream may or may not report.
///
/// Mapped rows use this instead of bare `Option` so that "upstream did not say"
/// is an explicit state that survives all the way to the write path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Reported<T> {
    Known(T),
    #[default]
    Unknown,
}

impl<T> Reported<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Reported::Known(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Reported::Known(value) => Some(value),
            Reported::Unknown => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Reported::Known(value) => Some(value),
            Reported::Unknown => None,
        }
    }
}

impl<T> From<Option<T>> for Reported<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Reported::Known(v),
            None => Reported::Unknown,
        }
    }
}

#[cfg(test)]
mod primitives_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(1250), Reported::Known(1250))]
    #[case(None, Reported::Unknown)]
    fn it_should_convert_from_option(#[case] input: Option<i64>, #[case] expected: Reported<i64>) {
        assert_eq!(Reported::from(input), expected);
    }

    #[rstest]
    fn it_should_expose_known_values_as_option() {
        let cost = Reported::Known(Money::new(400, "USD"));
        assert!(cost.is_known());
        assert_eq!(cost.as_option().map(|m| m.amount), Some(400));
        assert_eq!(Reported::<Money>::Unknown.into_option(), None);
    }
}
