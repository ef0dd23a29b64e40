/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Normalize extracted text before segmentation.
///
/// Expands ligatures, folds non-breaking and other exotic spaces to ASCII
/// spaces, turns typographic apostrophes into `'` (so `Mother’s Name`
/// matches), and drops carriage returns.
pub fn normalize_text(text: &str) -> String {
    expand_ligatures(text)
        .chars()
        .filter(|&c| c != '\r')
        .map(|c| match c {
            '\u{00A0}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}' => ' ',
            '\u{2018}' | '\u{2019}' | '\u{02BC}' | '`' => '\'',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("\u{FB01}rst o\u{FB03}ce"), "first office");
    }

    #[test]
    fn test_normalize_spaces_and_apostrophes() {
        let raw = "Mother\u{2019}s\u{00A0}Name: SUNITA\r\nRoll No:\u{202F}1";
        assert_eq!(normalize_text(raw), "Mother's Name: SUNITA\nRoll No: 1");
    }

    #[test]
    fn test_normalize_leaves_plain_text() {
        let plain = "184 ENGLISH 078 020 098 A1\n";
        assert_eq!(normalize_text(plain), plain);
    }
}
