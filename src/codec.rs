//! Text ⇄ Morse translation.
//!
//! Pure functions over a fixed lookup table. Characters without a code
//! (and codes without a character) degrade to `?` instead of failing.

/// Placeholder emitted for anything the table cannot translate.
pub const UNKNOWN: &str = "?";

/// Separator placed between encoded words.
pub const WORD_SEPARATOR: &str = " / ";

/// The lookup table, in display order.
const TABLE: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('.', ".-.-.-"),
    (',', "--..--"),
    ('?', "..--.."),
    ('\'', ".----."),
    ('!', "-.-.--"),
    ('/', "-..-."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('&', ".-..."),
    (':', "---..."),
    (';', "-.-.-."),
    ('=', "-...-"),
    ('+', ".-.-."),
    ('-', "-....-"),
    ('_', "..--.-"),
    ('"', ".-..-."),
    ('$', "...-..-"),
    ('@', ".--.-."),
];

/// Every supported character with its code, in display order.
pub fn dictionary() -> &'static [(char, &'static str)] {
    TABLE
}

/// Morse code for an (already upper-cased) character.
pub fn code_for(ch: char) -> Option<&'static str> {
    TABLE.iter().find(|(c, _)| *c == ch).map(|(_, code)| *code)
}

/// Character for a single Morse code.
pub fn char_for(code: &str) -> Option<char> {
    TABLE.iter().find(|(_, c)| *c == code).map(|(ch, _)| *ch)
}

/// Translate text to Morse.
///
/// Words are split on whitespace and upper-cased; codes within a word are
/// joined by a single space and words by `" / "`.
pub fn encode(text: &str) -> String {
    text.split_whitespace()
        .map(encode_word)
        .collect::<Vec<_>>()
        .join(WORD_SEPARATOR)
}

fn encode_word(word: &str) -> String {
    word.to_uppercase()
        .chars()
        .map(|ch| code_for(ch).unwrap_or(UNKNOWN))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Translate Morse back to text.
///
/// `/` separates words no matter how it is spaced; codes within a word are
/// separated by any whitespace.
pub fn decode(morse: &str) -> String {
    let morse = morse.trim();
    if morse.is_empty() {
        return String::new();
    }
    morse
        .split('/')
        .map(decode_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_word(word: &str) -> String {
    let decoded: String = word
        .split_whitespace()
        .map(|code| char_for(code).unwrap_or('?'))
        .collect();
    // An empty word is an unknown code like any other.
    if decoded.is_empty() {
        UNKNOWN.to_string()
    } else {
        decoded
    }
}
