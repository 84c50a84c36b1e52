use crate::error::TpgError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), TpgError>;
}

/// Probabilities drive geometric loops, so 1.0 is as invalid as a negative value
pub fn check_probability(section: &str, name: &str, value: f64) -> Result<(), TpgError> {
    if !(0.0..1.0).contains(&value) {
        return Err(TpgError::Configuration(format!(
            "{}.{} must be in [0, 1), got {}",
            section, name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_bounds() {
        assert!(check_probability("s", "p", 0.0).is_ok());
        assert!(check_probability("s", "p", 0.999).is_ok());
        assert!(check_probability("s", "p", 1.0).is_err());
        assert!(check_probability("s", "p", -0.1).is_err());
        assert!(check_probability("s", "p", f64::NAN).is_err());
    }
}
