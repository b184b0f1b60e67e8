//! Format checks for Greek tax numbers (ΑΦΜ), VAT numbers and IBANs.

use crate::error::IdError;

const AFM_LEN: usize = 9;
const GR_IBAN_LEN: usize = 27;

fn compact(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Returns the 9-digit AFM when it has the right length and check digit.
pub fn check_afm(input: &str) -> Result<String, IdError> {
    let afm = compact(input);
    if afm.chars().count() != AFM_LEN {
        return Err(IdError::WrongLength {
            expected: AFM_LEN,
            found: afm.chars().count(),
        });
    }
    if !afm.chars().all(|c| c.is_ascii_digit()) {
        return Err(IdError::NotDigits);
    }
    let digits: Vec<u32> = afm.bytes().map(|b| u32::from(b - b'0')).collect();
    if digits.iter().all(|&d| d == 0) {
        return Err(IdError::AllZeros);
    }
    let sum: u32 = digits[..8]
        .iter()
        .enumerate()
        .map(|(i, &d)| d << (8 - i))
        .sum();
    if (sum % 11) % 10 != digits[8] {
        return Err(IdError::Checksum);
    }
    Ok(afm)
}

/// Greek VAT number: an AFM with an optional `EL` prefix. Returns `EL` + AFM.
pub fn check_vat(input: &str) -> Result<String, IdError> {
    let vat = compact(input);
    let afm = vat.strip_prefix("EL").unwrap_or(&vat);
    if afm.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(IdError::WrongCountry("EL"));
    }
    Ok(format!("EL{}", check_afm(afm)?))
}

/// Greek IBAN (`GR` + 25 digits, ISO 13616 mod-97). Returns it in groups of four.
pub fn check_iban(input: &str) -> Result<String, IdError> {
    let iban = compact(input);
    if !iban.starts_with("GR") {
        return Err(IdError::WrongCountry("GR"));
    }
    if iban.chars().count() != GR_IBAN_LEN {
        return Err(IdError::WrongLength {
            expected: GR_IBAN_LEN,
            found: iban.chars().count(),
        });
    }
    if !iban[2..].chars().all(|c| c.is_ascii_digit()) {
        return Err(IdError::NotDigits);
    }

    let rearranged = format!("{}{}", &iban[4..], &iban[..4]);
    let mut remainder: u32 = 0;
    for c in rearranged.chars() {
        // letters count as two digits: A = 10 ... Z = 35
        let value = c.to_digit(36).unwrap_or(0);
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    if remainder != 1 {
        return Err(IdError::Checksum);
    }

    let grouped = iban
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).to_string())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(grouped)
}
