//! Unicode to Z-SCII input-character mapping.
//!
//! The screen layer edits input as Unicode code points and hands the
//! interpreter Z-SCII bytes. The default extra-character table (Z-SCII 155
//! and up) is the standard one; a custom table from the story file can be
//! installed at link time.

/// Z-SCII code for backspace/delete during input
pub const ZSCII_DELETE: u8 = 8;
/// Z-SCII code for newline
pub const ZSCII_NEWLINE: u8 = 13;
/// Z-SCII code for escape
pub const ZSCII_ESCAPE: u8 = 27;
/// Z-SCII cursor key codes, up/down/left/right
pub const ZSCII_CURSOR_UP: u8 = 129;
pub const ZSCII_CURSOR_DOWN: u8 = 130;
pub const ZSCII_CURSOR_LEFT: u8 = 131;
pub const ZSCII_CURSOR_RIGHT: u8 = 132;
/// Z-SCII code for forward delete during input
pub const ZSCII_FORWARD_DELETE: u8 = 127;

/// The standard table for Z-SCII 155..=223
const DEFAULT_EXTRA_CHARACTERS: [char; 69] = [
    'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß', '»', '«', 'ë', 'ï', 'ÿ', 'Ë', 'Ï', 'á', 'é', 'í', 'ó', 'ú',
    'ý', 'Á', 'É', 'Í', 'Ó', 'Ú', 'Ý', 'à', 'è', 'ì', 'ò', 'ù', 'À', 'È', 'Ì', 'Ò', 'Ù', 'â', 'ê',
    'î', 'ô', 'û', 'Â', 'Ê', 'Î', 'Ô', 'Û', 'å', 'Å', 'ø', 'Ø', 'ã', 'ñ', 'õ', 'Ã', 'Ñ', 'Õ', 'æ',
    'Æ', 'ç', 'Ç', 'þ', 'ð', 'Þ', 'Ð', '£', 'œ', 'Œ', '¡', '¿',
];

/// Unicode to Z-SCII mapping for keyboard input
#[derive(Clone, Debug)]
pub struct ZsciiMapper {
    extra_characters: Vec<char>,
}

impl Default for ZsciiMapper {
    fn default() -> Self {
        ZsciiMapper {
            extra_characters: DEFAULT_EXTRA_CHARACTERS.to_vec(),
        }
    }
}

impl ZsciiMapper {
    /// Mapper with a custom extra-character table from the story file.
    pub fn with_extra_characters(extra_characters: Vec<char>) -> Self {
        ZsciiMapper { extra_characters }
    }

    /// Map a Unicode code point to a Z-SCII input character.
    ///
    /// # Returns
    /// The Z-SCII code, or `None` when the character has no input mapping.
    pub fn unicode_to_zscii(&self, c: char) -> Option<u8> {
        match c {
            '\n' | '\r' => Some(ZSCII_NEWLINE),
            ' '..='~' => Some(c as u8),
            _ => self
                .extra_characters
                .iter()
                .position(|&e| e == c)
                .map(|i| 155 + i as u8),
        }
    }

    /// Map a Z-SCII input character back to Unicode.
    ///
    /// Unmappable codes come back as a space so that a malformed preload
    /// cannot poison the editor buffer.
    pub fn zscii_to_unicode(&self, zscii: u8) -> char {
        match zscii {
            ZSCII_NEWLINE => '\n',
            0x20..=0x7e => zscii as char,
            155.. => *self
                .extra_characters
                .get(zscii as usize - 155)
                .unwrap_or(&' '),
            _ => ' ',
        }
    }
}
