//! Regex patterns for per-type field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Piece count written with the Japanese counter, e.g. "12 個".
    pub static ref PCS_JP: Regex = Regex::new(r"(?i)(\d+)\s*個").unwrap();

    /// Piece count with the PCS unit marker, e.g. "72PCS" or "168 pcs".
    pub static ref PCS_EN: Regex = Regex::new(r"(?i)(\d+)\s*PCS").unwrap();

    /// Piece count printed after a kg weight column, e.g. "kg 34".
    pub static ref PCS_AFTER_KG: Regex = Regex::new(r"(?i)kg\s*(\d+)").unwrap();

    /// Full product line: item number, free-text description (non-greedy),
    /// unit weight, then the piece count after the origin column, e.g.
    /// "1  Fancl Brightening Lotion  0.054 kg | JAPAN  168 PCS".
    pub static ref PRODUCT_LINE: Regex =
        Regex::new(r"(?i)(\d+)\s+(.*?)\s+\d+\.\d+\s+kg\s+.*?\|\s+JAPAN\s+(\d+)\s*PCS").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcs_en_mixed_case_and_spacing() {
        let hits: Vec<&str> = PCS_EN
            .captures_iter("72PCS then 168 pcs and 3 Pcs")
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        assert_eq!(hits, vec!["72", "168", "3"]);
    }

    #[test]
    fn test_pcs_jp_counter() {
        let hits: Vec<&str> = PCS_JP
            .captures_iter("数量 15個、予備 3 個")
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        assert_eq!(hits, vec!["15", "3"]);
    }

    #[test]
    fn test_product_line_description_is_non_greedy() {
        let line = "1      Fancl Brightening Lotion 1         0.054 kg _ | JAPAN     168 PCS";
        let caps = PRODUCT_LINE.captures(line).unwrap();
        assert_eq!(caps[2].trim(), "Fancl Brightening Lotion 1");
        assert_eq!(&caps[3], "168");
    }
}
