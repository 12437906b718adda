use std::time::Duration;

/// Default base unit (one dot) in milliseconds.
pub const DEFAULT_DOT_MS: u64 = 80;

/// One element of an encoded Morse string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Dot,
    Dash,
    /// Space between codes within a word.
    SymbolGap,
    /// `/` between words.
    WordGap,
}

impl Symbol {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '.' => Some(Symbol::Dot),
            '-' => Some(Symbol::Dash),
            ' ' => Some(Symbol::SymbolGap),
            '/' => Some(Symbol::WordGap),
            _ => None,
        }
    }

    /// Tone length in dot units, or `None` for gaps.
    pub fn tone_units(&self) -> Option<u32> {
        match self {
            Symbol::Dot => Some(1),
            Symbol::Dash => Some(3),
            Symbol::SymbolGap | Symbol::WordGap => None,
        }
    }

    /// Total time the symbol occupies, in dot units (tone plus trailing gap).
    pub fn units(&self) -> u32 {
        match self {
            Symbol::Dot => 2,
            Symbol::Dash => 4,
            Symbol::SymbolGap | Symbol::WordGap => 3,
        }
    }
}

/// Base timing for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub dot: Duration,
}

impl Timing {
    pub fn from_dot_ms(ms: u64) -> Self {
        Timing {
            dot: Duration::from_millis(ms.max(1)),
        }
    }

    /// Dot length for a speed in words per minute ("PARIS" = 50 units).
    pub fn from_wpm(wpm: u32) -> Self {
        Timing::from_dot_ms(1200 / u64::from(wpm.max(1)))
    }

    pub fn units(&self, n: u32) -> Duration {
        self.dot * n
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing::from_dot_ms(DEFAULT_DOT_MS)
    }
}

/// One entry in a message's playback timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Tone(Duration),
    Silence(Duration),
}

impl Step {
    pub fn duration(&self) -> Duration {
        match self {
            Step::Tone(d) | Step::Silence(d) => *d,
        }
    }
}

/// A parsed Morse string, ready to be handed to a playback session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorseMessage {
    symbols: Vec<Symbol>,
}

impl MorseMessage {
    /// Parse an encoded string. Characters other than `.`, `-`, space and
    /// `/` carry no timing and are skipped.
    pub fn parse(morse: &str) -> Self {
        MorseMessage {
            symbols: morse.chars().filter_map(Symbol::from_char).collect(),
        }
    }

    /// Encode `text` and parse the result.
    pub fn from_text(text: &str) -> Self {
        MorseMessage::parse(&crate::codec::encode(text))
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn total_units(&self) -> u32 {
        self.symbols.iter().map(Symbol::units).sum()
    }

    /// Wall time the message takes to play at `timing`.
    pub fn duration(&self, timing: Timing) -> Duration {
        timing.units(self.total_units())
    }

    /// Flatten the message into tone and silence steps.
    pub fn steps(&self, timing: Timing) -> Vec<Step> {
        let mut steps = Vec::with_capacity(self.symbols.len() * 2);
        for symbol in &self.symbols {
            match symbol.tone_units() {
                Some(units) => {
                    steps.push(Step::Tone(timing.units(units)));
                    steps.push(Step::Silence(timing.dot));
                }
                None => steps.push(Step::Silence(timing.units(3))),
            }
        }
        steps
    }
}
