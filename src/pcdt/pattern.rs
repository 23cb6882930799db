//! Character-class pattern classification for passwords.

use std::fmt;

/// One of the four character classes a password byte can belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    Lower,
    Upper,
    Digit,
    Symbol,
}

impl CharClass {
    #[must_use]
    pub const fn of(ch: char) -> Self {
        if ch.is_ascii_lowercase() {
            Self::Lower
        } else if ch.is_ascii_uppercase() {
            Self::Upper
        } else if ch.is_ascii_digit() {
            Self::Digit
        } else {
            Self::Symbol
        }
    }

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Lower => 'L',
            Self::Upper => 'U',
            Self::Digit => 'D',
            Self::Symbol => 'S',
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Run-length encode a password into ordered `(class, count)` groups.
///
/// The counts always sum to the number of characters in the input.
#[must_use]
pub fn classify(password: &str) -> Vec<(CharClass, usize)> {
    let mut groups: Vec<(CharClass, usize)> = Vec::new();

    for ch in password.chars() {
        let class = CharClass::of(ch);
        match groups.last_mut() {
            Some((last, count)) if *last == class => *count += 1,
            _ => groups.push((class, 1)),
        }
    }

    groups
}

/// Render groups as a pattern signature, e.g. `U1L7D4` for `Hunter2024`-style
/// inputs. An empty password yields an empty signature.
#[must_use]
pub fn signature(groups: &[(CharClass, usize)]) -> String {
    groups
        .iter()
        .map(|(class, count)| format!("{class}{count}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_groups_consecutive_classes() {
        let groups = classify("Hunter2024");
        assert_eq!(
            groups,
            vec![
                (CharClass::Upper, 1),
                (CharClass::Lower, 5),
                (CharClass::Digit, 4),
            ]
        );
    }

    #[test]
    fn classify_counts_sum_to_length() {
        for password in ["", "a", "aA1!", "correct horse battery staple", "P@ssw0rd!!"] {
            let total: usize = classify(password).iter().map(|(_, count)| count).sum();
            assert_eq!(total, password.chars().count());
        }
    }

    #[test]
    fn classify_is_deterministic() {
        assert_eq!(classify("aB3$aB3$"), classify("aB3$aB3$"));
    }

    #[test]
    fn signature_concatenates_class_letters_and_counts() {
        let groups = classify("aaBB12!!");
        assert_eq!(signature(&groups), "L2U2D2S2");
    }

    #[test]
    fn signature_of_empty_password_is_empty() {
        assert_eq!(signature(&classify("")), "");
    }

    #[test]
    fn whitespace_and_unicode_fall_into_symbol() {
        let groups = classify(" é");
        assert_eq!(groups, vec![(CharClass::Symbol, 2)]);
    }
}
