use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::KadError;

/// NACE Rev. 2 top-level sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Section {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
}

pub const ALL_SECTIONS: &[Section] = &[
    Section::A,
    Section::B,
    Section::C,
    Section::D,
    Section::E,
    Section::F,
    Section::G,
    Section::H,
    Section::I,
    Section::J,
    Section::K,
    Section::L,
    Section::M,
    Section::N,
    Section::O,
    Section::P,
    Section::Q,
    Section::R,
    Section::S,
    Section::T,
    Section::U,
];

/// Returned for prefixes no range covers (00, 04, 34, 40, ...).
pub const DEFAULT_SECTION: Section = Section::C;

// (min prefix, max prefix, section), inclusive, first match wins
const SECTION_RANGES: &[(u8, u8, Section)] = &[
    (1, 3, Section::A),
    (5, 9, Section::B),
    (10, 33, Section::C),
    (35, 35, Section::D),
    (36, 39, Section::E),
    (41, 43, Section::F),
    (45, 47, Section::G),
    (49, 53, Section::H),
    (55, 56, Section::I),
    (58, 63, Section::J),
    (64, 66, Section::K),
    (68, 68, Section::L),
    (69, 75, Section::M),
    (77, 82, Section::N),
    (84, 84, Section::O),
    (85, 85, Section::P),
    (86, 88, Section::Q),
    (90, 93, Section::R),
    (94, 96, Section::S),
    (97, 98, Section::T),
    (99, 99, Section::U),
];

impl Section {
    pub fn letter(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
            Self::G => 'G',
            Self::H => 'H',
            Self::I => 'I',
            Self::J => 'J',
            Self::K => 'K',
            Self::L => 'L',
            Self::M => 'M',
            Self::N => 'N',
            Self::O => 'O',
            Self::P => 'P',
            Self::Q => 'Q',
            Self::R => 'R',
            Self::S => 'S',
            Self::T => 'T',
            Self::U => 'U',
        }
    }

    /// Greek section title; also used as the record category.
    pub fn title(&self) -> &'static str {
        match self {
            Self::A => "Γεωργία, δασοκομία και αλιεία",
            Self::B => "Ορυχεία και λατομεία",
            Self::C => "Μεταποίηση",
            Self::D => "Παροχή ηλεκτρικού ρεύματος, φυσικού αερίου, ατμού και κλιματισμού",
            Self::E => "Παροχή νερού, επεξεργασία λυμάτων, διαχείριση αποβλήτων και δραστηριότητες εξυγίανσης",
            Self::F => "Κατασκευές",
            Self::G => "Χονδρικό και λιανικό εμπόριο, επισκευή μηχανοκίνητων οχημάτων και μοτοσυκλετών",
            Self::H => "Μεταφορά και αποθήκευση",
            Self::I => "Δραστηριότητες υπηρεσιών παροχής καταλύματος και υπηρεσιών εστίασης",
            Self::J => "Ενημέρωση και επικοινωνία",
            Self::K => "Χρηματοπιστωτικές και ασφαλιστικές δραστηριότητες",
            Self::L => "Διαχείριση ακίνητης περιουσίας",
            Self::M => "Επαγγελματικές, επιστημονικές και τεχνικές δραστηριότητες",
            Self::N => "Διοικητικές και υποστηρικτικές δραστηριότητες",
            Self::O => "Δημόσια διοίκηση και άμυνα, υποχρεωτική κοινωνική ασφάλιση",
            Self::P => "Εκπαίδευση",
            Self::Q => "Δραστηριότητες σχετικές με την ανθρώπινη υγεία και την κοινωνική μέριμνα",
            Self::R => "Τέχνες, διασκέδαση και ψυχαγωγία",
            Self::S => "Άλλες δραστηριότητες παροχής υπηρεσιών",
            Self::T => "Δραστηριότητες νοικοκυριών ως εργοδοτών",
            Self::U => "Δραστηριότητες ετερόδικων οργανισμών και φορέων",
        }
    }

    pub fn title_en(&self) -> &'static str {
        match self {
            Self::A => "Agriculture, forestry and fishing",
            Self::B => "Mining and quarrying",
            Self::C => "Manufacturing",
            Self::D => "Electricity, gas, steam and air conditioning supply",
            Self::E => "Water supply, sewerage, waste management and remediation",
            Self::F => "Construction",
            Self::G => "Wholesale and retail trade, repair of motor vehicles",
            Self::H => "Transportation and storage",
            Self::I => "Accommodation and food service activities",
            Self::J => "Information and communication",
            Self::K => "Financial and insurance activities",
            Self::L => "Real estate activities",
            Self::M => "Professional, scientific and technical activities",
            Self::N => "Administrative and support service activities",
            Self::O => "Public administration and defence, compulsory social security",
            Self::P => "Education",
            Self::Q => "Human health and social work activities",
            Self::R => "Arts, entertainment and recreation",
            Self::S => "Other service activities",
            Self::T => "Activities of households as employers",
            Self::U => "Activities of extraterritorial organisations and bodies",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Section {
    type Err = KadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ALL_SECTIONS
            .iter()
            .find(|sec| s.len() == 1 && s.eq_ignore_ascii_case(&sec.letter().to_string()))
            .copied()
            .ok_or_else(|| KadError::Other(format!("Unknown section: {s} (expected A-U)")))
    }
}

pub fn classify_prefix(prefix: u8) -> Section {
    SECTION_RANGES
        .iter()
        .find(|(min, max, _)| (*min..=*max).contains(&prefix))
        .map(|(_, _, section)| *section)
        .unwrap_or(DEFAULT_SECTION)
}

/// Section for a canonical code, from its leading two digits.
pub fn classify(code: &str) -> Section {
    match code.as_bytes() {
        [a, b, ..] if a.is_ascii_digit() && b.is_ascii_digit() => {
            classify_prefix((a - b'0') * 10 + (b - b'0'))
        }
        _ => DEFAULT_SECTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_examples() {
        assert_eq!(classify("10.00.00"), Section::C);
        assert_eq!(classify("99.00"), Section::U);
        assert_eq!(classify("01.11.11"), Section::A);
        assert_eq!(classify("46.42.11.14"), Section::G);
        assert_eq!(classify("62.01"), Section::J);
    }

    #[test]
    fn test_classify_needs_two_leading_digits() {
        assert_eq!(classify("+1.00"), DEFAULT_SECTION);
        assert_eq!(classify("-1.00"), DEFAULT_SECTION);
        assert_eq!(classify("1"), DEFAULT_SECTION);
        assert_eq!(classify(""), DEFAULT_SECTION);
        assert_eq!(classify("0"), DEFAULT_SECTION);
        assert_eq!(classify("01"), Section::A);
    }

    #[test]
    fn test_uncovered_prefix_defaults_to_c() {
        assert_eq!(classify("04.11"), Section::C);
        for prefix in [0u8, 4, 34, 40, 44, 48, 54, 57, 67, 76, 83, 89] {
            assert_eq!(classify_prefix(prefix), DEFAULT_SECTION, "prefix {prefix:02}");
        }
    }

    #[test]
    fn test_classify_is_total_over_all_prefixes() {
        for prefix in 0u8..=99 {
            let code = format!("{prefix:02}.00");
            let section = classify(&code);
            assert!(ALL_SECTIONS.contains(&section), "prefix {prefix:02}");
        }
    }

    #[test]
    fn test_range_boundaries() {
        assert_eq!(classify_prefix(3), Section::A);
        assert_eq!(classify_prefix(5), Section::B);
        assert_eq!(classify_prefix(33), Section::C);
        assert_eq!(classify_prefix(35), Section::D);
        assert_eq!(classify_prefix(39), Section::E);
        assert_eq!(classify_prefix(68), Section::L);
        assert_eq!(classify_prefix(98), Section::T);
    }

    #[test]
    fn test_every_section_is_reachable() {
        for section in ALL_SECTIONS {
            assert!(
                (0u8..=99).any(|p| classify_prefix(p) == *section),
                "section {section} has no prefix"
            );
        }
    }

    #[test]
    fn test_garbage_code_defaults() {
        assert_eq!(classify(""), DEFAULT_SECTION);
        assert_eq!(classify("x1.00"), DEFAULT_SECTION);
    }

    #[test]
    fn test_section_from_str() {
        assert_eq!("u".parse::<Section>().unwrap(), Section::U);
        assert_eq!(" G ".parse::<Section>().unwrap(), Section::G);
        assert!("Z".parse::<Section>().is_err());
        assert!("AB".parse::<Section>().is_err());
    }
}
