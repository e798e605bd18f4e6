//! VIN 正規化與檢查碼驗證。
//!
//! 用來交叉比對 `/api/vin-decode` 回傳的 VIN 以及 OCR 讀到的字串。

use regex::Regex;
use std::sync::OnceLock;

pub const VIN_LENGTH: usize = 17;

/// 檢查碼位置（第 9 碼，0-based 為 8）
const CHECK_DIGIT_INDEX: usize = 8;

const WEIGHTS: [u32; VIN_LENGTH] = [8, 7, 6, 5, 4, 3, 2, 10, 0, 9, 8, 7, 6, 5, 4, 3, 2];

/// 常見製造國代碼開頭
const COMMON_WMI_PREFIXES: [char; 10] = ['1', '2', '3', '4', '5', 'J', 'K', 'W', 'Y', 'Z'];

pub const CHECK_DIGIT_CONFIDENCE: u8 = 98;
pub const PATTERN_CONFIDENCE: u8 = 85;

const UNIQUE_VIN_PREFIX: &str = "1HGBH41JXMN";

fn vin_sequence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[A-HJ-NPR-Z0-9]+").expect("static VIN regex"))
}

/// 移除 VIN 不允許的字元 (I, O, Q 與符號) 並轉大寫
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| is_vin_char(*c))
        .collect()
}

fn is_vin_char(c: char) -> bool {
    c.is_ascii_digit() || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q'))
}

fn transliterate(c: char) -> Option<u32> {
    let value = match c {
        '0'..='9' => c.to_digit(10)?,
        'A' | 'J' => 1,
        'B' | 'K' | 'S' => 2,
        'C' | 'L' | 'T' => 3,
        'D' | 'M' | 'U' => 4,
        'E' | 'N' | 'V' => 5,
        'F' | 'W' => 6,
        'G' | 'P' | 'X' => 7,
        'H' | 'Y' => 8,
        'R' | 'Z' => 9,
        _ => return None,
    };
    Some(value)
}

pub fn is_valid_check_digit(vin: &str) -> bool {
    let chars: Vec<char> = vin.chars().collect();
    if chars.len() != VIN_LENGTH {
        return false;
    }

    let mut sum = 0;
    for (i, c) in chars.iter().enumerate() {
        if i == CHECK_DIGIT_INDEX {
            continue;
        }
        match transliterate(*c) {
            Some(v) => sum += v * WEIGHTS[i],
            None => return false,
        }
    }

    let expected = match sum % 11 {
        10 => 'X',
        d => char::from_digit(d, 10).unwrap_or('?'),
    };
    chars[CHECK_DIGIT_INDEX] == expected
}

/// 從 OCR 文字中找出所有 17 碼候選
pub fn extract_candidates(text: &str) -> Vec<String> {
    vin_sequence_regex()
        .find_iter(text)
        .map(|m| normalize(m.as_str()))
        .filter(|seq| seq.len() == VIN_LENGTH)
        .collect()
}

/// 回傳最可能的 VIN 與信心分數
pub fn best_candidate(text: &str) -> Option<(String, u8)> {
    let candidates = extract_candidates(text);

    if let Some(vin) = candidates.iter().find(|c| is_valid_check_digit(c)) {
        return Some((vin.clone(), CHECK_DIGIT_CONFIDENCE));
    }

    candidates
        .into_iter()
        .find(|c| c.chars().next().is_some_and(|first| COMMON_WMI_PREFIXES.contains(&first)))
        .map(|vin| (vin, PATTERN_CONFIDENCE))
}

/// 測試用的唯一 VIN，後六碼取自 seed（通常是時間戳）
pub fn unique_test_vin(seed: u64) -> String {
    format!("{}{:06}", UNIQUE_VIN_PREFIX, seed % 1_000_000)
}
