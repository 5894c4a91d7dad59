use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PinListError {
    #[error("invalid pin number {0:?}")]
    InvalidNumber(String),
    #[error("expected {expected} pins, got {got}")]
    WrongCount { expected: usize, got: usize },
}

/// Parses a list of pin numbers separated by commas, semicolons or spaces.
pub fn parse_pin_bus<const N: usize>(pin_str: &str) -> Result<[usize; N], PinListError> {
    let pins = pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| PinListError::InvalidNumber(s.to_string())))
        .collect::<Result<Vec<usize>, _>>()?;

    let got = pins.len();
    pins.try_into()
        .map_err(|_| PinListError::WrongCount { expected: N, got })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mixed_separators() {
        assert_eq!(parse_pin_bus("26, 16;20 21"), Ok([26, 16, 20, 21]));
        assert_eq!(parse_pin_bus::<2>("  5,,6 "), Ok([5, 6]));
    }

    #[test]
    fn rejects_wrong_count() {
        assert_eq!(
            parse_pin_bus::<4>("1,2,3"),
            Err(PinListError::WrongCount { expected: 4, got: 3 })
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            parse_pin_bus::<4>("1,2,x,4"),
            Err(PinListError::InvalidNumber("x".to_string()))
        );
        assert_eq!(
            parse_pin_bus::<1>("-3"),
            Err(PinListError::InvalidNumber("-3".to_string()))
        );
    }
}
