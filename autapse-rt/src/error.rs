use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutapseError {
    /// The pre-sized sample store has no room left.
    BufferFull,
    InvalidConfiguration(&'static str),
    InvalidInput(&'static str),
}

impl fmt::Display for AutapseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutapseError::BufferFull => write!(f, "buffer full"),
            AutapseError::InvalidConfiguration(msg) => write!(f, "invalid configuration: {}", msg),
            AutapseError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
        }
    }
}

impl std::error::Error for AutapseError {}

pub type AutapseResult<T, E = AutapseError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn display_messages() {
        assert_eq!(format!("{}", AutapseError::BufferFull), "buffer full");
        assert_eq!(
            format!("{}", AutapseError::InvalidConfiguration("rate")),
            "invalid configuration: rate"
        );
        assert_eq!(format!("{}", AutapseError::InvalidInput("period")), "invalid input: period");
    }

    #[test]
    fn works_with_question_mark() {
        fn check(ok: bool) -> AutapseResult<u32> {
            if ok { Ok(7) } else { Err(AutapseError::BufferFull) }
        }
        fn outer() -> Result<u32, Box<dyn std::error::Error>> {
            Ok(check(true)? + 1)
        }
        assert_eq!(outer().unwrap(), 8);
        assert_eq!(check(false), Err(AutapseError::BufferFull));
    }
}
