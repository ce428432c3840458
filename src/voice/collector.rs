//! DTMF digit collection

/// Result of a completed collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    /// The terminator key was pressed
    Terminated,
    /// The requested number of digits, in press order
    Digits(String),
}

/// Accumulates key presses until a count is reached or the terminator arrives
#[derive(Debug, Clone)]
pub struct DigitCollector {
    wanted: usize,
    terminator: char,
    pressed: String,
}

impl DigitCollector {
    pub fn new(wanted: usize, terminator: char) -> Self {
        Self {
            wanted,
            terminator,
            pressed: String::with_capacity(wanted),
        }
    }

    /// Whether `digit` is a key a phone keypad can send
    pub fn is_dtmf(digit: char) -> bool {
        matches!(digit, '0'..='9' | '*' | '#' | 'A'..='D')
    }

    /// Whether `digit` takes part in collection; anything else is line noise
    pub fn accepts(&self, digit: char) -> bool {
        digit == self.terminator || Self::is_dtmf(digit)
    }

    /// Record one key press.
    ///
    /// Returns `Some` once the collection is complete.
    pub fn push(&mut self, digit: char) -> Option<Collected> {
        if digit == self.terminator {
            return Some(Collected::Terminated);
        }
        if !self.accepts(digit) {
            return None;
        }

        self.pressed.push(digit);
        if self.pressed.len() >= self.wanted {
            Some(Collected::Digits(std::mem::take(&mut self.pressed)))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_requested_count_in_order() {
        let mut collector = DigitCollector::new(4, '#');
        assert_eq!(collector.push('1'), None);
        assert_eq!(collector.push('2'), None);
        assert_eq!(collector.push('3'), None);
        assert_eq!(collector.push('4'), Some(Collected::Digits("1234".to_string())));
    }

    #[test]
    fn test_terminator_wins_regardless_of_progress() {
        let mut collector = DigitCollector::new(4, '#');
        assert_eq!(collector.push('#'), Some(Collected::Terminated));

        let mut collector = DigitCollector::new(4, '#');
        collector.push('9');
        collector.push('9');
        collector.push('9');
        assert_eq!(collector.push('#'), Some(Collected::Terminated));
    }

    #[test]
    fn test_star_counts_noise_does_not() {
        let mut collector = DigitCollector::new(2, '#');
        assert_eq!(collector.push('x'), None);
        assert_eq!(collector.push('*'), None);
        assert_eq!(collector.push('0'), Some(Collected::Digits("*0".to_string())));
    }

    #[test]
    fn test_accepts_keypad_keys_only() {
        let collector = DigitCollector::new(3, '#');
        assert!(collector.accepts('7'));
        assert!(collector.accepts('*'));
        assert!(collector.accepts('#'));
        assert!(collector.accepts('D'));
        assert!(!collector.accepts('x'));
        assert!(!collector.accepts(' '));

        let collector = DigitCollector::new(3, '!');
        assert!(collector.accepts('!'));
    }
}
