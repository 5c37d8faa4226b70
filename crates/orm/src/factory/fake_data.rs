//! Realistic fake data generation for factories
//!
//! A factory column with `"fake": true` names a type tag; the generator turns
//! that tag into a typed [`DatabaseValue`]. Unknown tags produce `Null`.

use chrono::{Duration, NaiveTime, Timelike, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backends::DatabaseValue;

/// Source of generated column values
pub trait ValueGenerator: Send {
    /// Value for a type tag; tags are case-insensitive and unknown tags yield `Null`
    fn generate(&mut self, type_tag: &str) -> DatabaseValue;
}

const FIRST_NAMES: &[&str] = &[
    "Amara", "Bruno", "Celia", "Dmitri", "Elena", "Felix", "Greta", "Hugo", "Ines", "Jonas",
    "Kira", "Lorenzo", "Maya", "Nils", "Orla", "Pavel", "Rosa", "Stefan", "Tara", "Viktor",
];

const LAST_NAMES: &[&str] = &[
    "Almeida", "Becker", "Castillo", "Dubois", "Eriksen", "Fontaine", "Gallo", "Hartmann", "Ibarra",
    "Jansen", "Kowalski", "Lindqvist", "Moreau", "Novak", "Okafor", "Petrov", "Quintero", "Rossi",
];

const WORDS: &[&str] = &[
    "amber", "beacon", "canyon", "delta", "ember", "fable", "glacier", "harbor", "island", "juniper",
    "kernel", "lantern", "meadow", "nectar", "orbit", "prism", "quartz", "ripple", "summit", "tundra",
    "umbra", "vertex", "willow", "zephyr",
];

const STREETS: &[&str] = &[
    "Station Road", "Church Lane", "Mill Street", "Harbour View", "Orchard Close", "Bridge Street",
    "Kingsway", "Linden Avenue", "Quarry Hill", "Elm Terrace",
];

const CITIES: &[&str] = &[
    "Lakeside", "Northbrook", "Ashford", "Clearwater", "Millbrook", "Oakridge", "Westhaven", "Brookfield",
    "Stonebridge", "Fairport",
];

const STATES: &[&str] = &[
    "Alabama", "Colorado", "Delaware", "Idaho", "Kansas", "Maine", "Nevada", "Oregon", "Utah", "Vermont",
];

const COUNTRIES: &[&str] = &[
    "Argentina", "Belgium", "Chile", "Denmark", "Estonia", "Finland", "Ghana", "Hungary", "Iceland",
    "Japan", "Kenya", "Norway", "Portugal", "Uruguay",
];

const COMPANY_STEMS: &[&str] = &[
    "Northwind", "Bluefield", "Ironbark", "Silverline", "Redstone", "Brightwave", "Cobalt", "Greenleaf",
];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "Ltd", "Holdings", "and Sons", "Partners"];

const COLORS: &[&str] = &[
    "red", "orange", "yellow", "green", "teal", "blue", "indigo", "violet", "magenta", "olive", "maroon",
    "silver", "salmon", "turquoise",
];

const JOB_TITLES: &[&str] = &[
    "Account Manager", "Backend Engineer", "Data Analyst", "Operations Lead", "Product Designer",
    "Quality Specialist", "Regional Director", "Support Technician", "Marketing Coordinator",
];

const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "SEK", "NOK", "PLN"];

const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test", "inbox.dev"];

/// Fake value generator over an injectable random source
#[derive(Debug, Clone)]
pub struct FakeValueGenerator {
    rng: StdRng,
}

impl FakeValueGenerator {
    /// Deterministic generator for tests and reproducible seeding
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    fn pick(&mut self, list: &[&'static str]) -> &'static str {
        list[self.rng.gen_range(0..list.len())]
    }

    fn words(&mut self, count: usize) -> String {
        (0..count).map(|_| self.pick(WORDS)).collect::<Vec<_>>().join(" ")
    }

    fn sentence(&mut self) -> String {
        let count = self.rng.gen_range(5..=10);
        let words = self.words(count);
        let mut chars = words.chars();
        match chars.next() {
            Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
            None => words.clone(),
        }
    }

    fn paragraph(&mut self) -> String {
        let count = self.rng.gen_range(3..=6);
        (0..count).map(|_| self.sentence()).collect::<Vec<_>>().join(" ")
    }

    fn alphanumeric(&mut self, len: usize) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    fn digits(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    fn hex_groups(&mut self, groups: usize, width: usize, separator: &str) -> String {
        (0..groups)
            .map(|_| {
                let max = 16u32.pow(width as u32);
                format!("{:0width$x}", self.rng.gen_range(0..max), width = width)
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn rounded(&mut self, min: f64, max: f64, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        (self.rng.gen_range(min..=max) * factor).round() / factor
    }

    fn first_name(&mut self) -> &'static str {
        self.pick(FIRST_NAMES)
    }

    fn last_name(&mut self) -> &'static str {
        self.pick(LAST_NAMES)
    }

    fn username(&mut self) -> String {
        format!(
            "{}.{}{}",
            self.first_name().to_lowercase(),
            self.last_name().to_lowercase(),
            self.rng.gen_range(1..100)
        )
    }

    fn email(&mut self) -> String {
        let user = self.username();
        format!("{}@{}", user, self.pick(DOMAINS))
    }

    fn company(&mut self) -> String {
        format!("{} {}", self.pick(COMPANY_STEMS), self.pick(COMPANY_SUFFIXES))
    }

    fn seconds_offset(&mut self, days: i64) -> Duration {
        Duration::seconds(self.rng.gen_range(1..=days * 86_400))
    }

    /// Visa-style 16 digit number with a valid Luhn check digit
    fn credit_card(&mut self) -> String {
        let mut number = format!("4{}", self.digits(14));
        number.push(luhn_check_digit(&number));
        number
    }

    /// German IBAN with valid mod-97 check digits
    fn iban(&mut self) -> String {
        let bban = self.digits(18);
        // DE -> 13 14
        let remainder = mod97(&format!("{}131400", bban));
        format!("DE{:02}{}", 98 - remainder, bban)
    }

    fn bic(&mut self) -> String {
        let bank: String = (0..4).map(|_| char::from(b'A' + self.rng.gen_range(0..26u8))).collect();
        let country = self.pick(&["DE", "FR", "NL", "GB", "ES", "IT"]);
        let location = self.alphanumeric(2).to_uppercase();
        format!("{}{}{}", bank, country, location)
    }
}

impl Default for FakeValueGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl ValueGenerator for FakeValueGenerator {
    fn generate(&mut self, type_tag: &str) -> DatabaseValue {
        match type_tag.trim().to_lowercase().as_str() {
            "number" => DatabaseValue::Int32(self.rng.gen_range(0..=i32::MAX)),
            "int" | "integer" => DatabaseValue::Int32(self.rng.gen()),
            "smallint" => DatabaseValue::Int32(self.rng.gen_range(-32768..=32767)),
            "mediumint" => DatabaseValue::Int32(self.rng.gen_range(-8_388_608..=8_388_607)),
            "bigint" => DatabaseValue::Int64(self.rng.gen()),
            "tinyint" => DatabaseValue::Int32(self.rng.gen_range(1..=127)),
            "float" => DatabaseValue::Float64(self.rounded(-1000.0, 1000.0, 2)),
            "double" => DatabaseValue::Float64(self.rounded(-1_000_000.0, 1_000_000.0, 4)),
            "decimal" => DatabaseValue::Float64(self.rounded(-9_999_999_999.0, 9_999_999_999.0, 2)),
            "boolean" => DatabaseValue::Bool(self.rng.gen()),
            "uuid" => DatabaseValue::Uuid(uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid()),
            "string" => DatabaseValue::String(self.words(3)),
            "char" => DatabaseValue::String(self.alphanumeric(1)),
            "varchar" => DatabaseValue::String(self.words(5)),
            "longtext" => DatabaseValue::String(self.paragraph()),
            "alphanumeric" => DatabaseValue::String(self.alphanumeric(10)),
            "email" => DatabaseValue::String(self.email()),
            "url" => DatabaseValue::String(format!("https://{}.{}", self.pick(WORDS), self.pick(DOMAINS))),
            "username" => DatabaseValue::String(self.username()),
            "password" => DatabaseValue::String(self.alphanumeric(15)),
            "phone" => DatabaseValue::String(format!(
                "+1-{}-{}-{}",
                self.rng.gen_range(200..1000),
                self.digits(3),
                self.digits(4)
            )),
            "address" => DatabaseValue::String(format!("{} {}", self.rng.gen_range(1..10_000), self.pick(STREETS))),
            "city" => DatabaseValue::String(self.pick(CITIES).to_string()),
            "state" => DatabaseValue::String(self.pick(STATES).to_string()),
            "country" => DatabaseValue::String(self.pick(COUNTRIES).to_string()),
            "zip" => DatabaseValue::String(self.digits(5)),
            "ipv4" => DatabaseValue::String(format!(
                "{}.{}.{}.{}",
                self.rng.gen_range(1..=223),
                self.rng.gen::<u8>(),
                self.rng.gen::<u8>(),
                self.rng.gen_range(1..=254)
            )),
            "ipv6" => DatabaseValue::String(self.hex_groups(8, 4, ":")),
            "mac" | "mac_address" => DatabaseValue::String(self.hex_groups(6, 2, ":")),
            "company" => DatabaseValue::String(self.company()),
            "company_suffix" => DatabaseValue::String(self.pick(COMPANY_SUFFIXES).to_string()),
            "color" => DatabaseValue::String(self.pick(COLORS).to_string()),
            "hexcolor" => DatabaseValue::String(format!("#{:06x}", self.rng.gen_range(0..0x0100_0000))),
            "job_title" => DatabaseValue::String(self.pick(JOB_TITLES).to_string()),
            "name" => DatabaseValue::String(format!("{} {}", self.first_name(), self.last_name())),
            "first_name" => DatabaseValue::String(self.first_name().to_string()),
            "last_name" => DatabaseValue::String(self.last_name().to_string()),
            "date" | "past" | "past_date" => {
                let offset = self.seconds_offset(365);
                DatabaseValue::Date((Utc::now() - offset).date_naive())
            }
            "future" | "future_date" => {
                let offset = self.seconds_offset(365);
                DatabaseValue::Date((Utc::now() + offset).date_naive())
            }
            "time" => {
                let offset = self.seconds_offset(2);
                let time = (Utc::now() - offset).time();
                // whole seconds only
                let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), time.second()).unwrap_or(time);
                DatabaseValue::Time(time)
            }
            "datetime" => {
                let offset = self.seconds_offset(2);
                DatabaseValue::DateTime(Utc::now() - offset)
            }
            "credit_card" => DatabaseValue::String(self.credit_card()),
            "currency" => DatabaseValue::String(self.pick(CURRENCIES).to_string()),
            "iban" => DatabaseValue::String(self.iban()),
            "bic" => DatabaseValue::String(self.bic()),
            other => {
                tracing::debug!(target: "tabula::factory", "Unknown fake type '{}', using NULL", other);
                DatabaseValue::Null
            }
        }
    }
}

fn luhn_check_digit(partial: &str) -> char {
    let sum: u32 = partial
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    char::from(b'0' + ((10 - sum % 10) % 10) as u8)
}

fn mod97(digits: &str) -> u32 {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0, |acc, d| (acc * 10 + d) % 97)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn luhn_valid(number: &str) -> bool {
        let (body, check) = number.split_at(number.len() - 1);
        luhn_check_digit(body).to_string() == check
    }

    #[test]
    fn test_unknown_type_is_null() {
        let mut generator = FakeValueGenerator::seeded(1);
        assert_eq!(generator.generate("unknown_type"), DatabaseValue::Null);
        assert_eq!(generator.generate(""), DatabaseValue::Null);
    }

    #[test]
    fn test_deterministic_generation() {
        let mut a = FakeValueGenerator::seeded(12345);
        let mut b = FakeValueGenerator::seeded(12345);

        for tag in ["email", "uuid", "bigint", "longtext", "iban"] {
            assert_eq!(a.generate(tag), b.generate(tag));
        }
    }

    #[test]
    fn test_integer_bounds() {
        let mut generator = FakeValueGenerator::seeded(7);
        for _ in 0..500 {
            match generator.generate("smallint") {
                DatabaseValue::Int32(v) => assert!((-32768..=32767).contains(&v)),
                other => panic!("unexpected {:?}", other),
            }
            match generator.generate("mediumint") {
                DatabaseValue::Int32(v) => assert!((-8_388_608..=8_388_607).contains(&v)),
                other => panic!("unexpected {:?}", other),
            }
            match generator.generate("TINYINT") {
                DatabaseValue::Int32(v) => assert!((1..=127).contains(&v)),
                other => panic!("unexpected {:?}", other),
            }
            assert!(matches!(generator.generate("number"), DatabaseValue::Int32(v) if v >= 0));
            assert!(matches!(generator.generate("bigint"), DatabaseValue::Int64(_)));
        }
    }

    #[test]
    fn test_float_precision() {
        let mut generator = FakeValueGenerator::seeded(3);
        for _ in 0..100 {
            let DatabaseValue::Float64(v) = generator.generate("float") else {
                panic!("float expected");
            };
            assert!((-1000.0..=1000.0).contains(&v));
            assert!(((v * 100.0).round() - v * 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_text_shapes() {
        let mut generator = FakeValueGenerator::seeded(11);

        let string = generator.generate("string");
        assert_eq!(string.as_str().unwrap().split(' ').count(), 3);
        let varchar = generator.generate("varchar");
        assert_eq!(varchar.as_str().unwrap().split(' ').count(), 5);
        assert_eq!(generator.generate("char").as_str().unwrap().len(), 1);

        let alnum = generator.generate("alphanumeric");
        assert_eq!(alnum.as_str().unwrap().len(), 10);
        assert!(alnum.as_str().unwrap().chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(generator.generate("password").as_str().unwrap().len(), 15);
        assert!(generator.generate("email").as_str().unwrap().contains('@'));
    }

    #[test]
    fn test_network_formats() {
        let mut generator = FakeValueGenerator::seeded(5);

        let ipv4 = generator.generate("ipv4");
        assert!(ipv4.as_str().unwrap().parse::<std::net::Ipv4Addr>().is_ok());
        let ipv6 = generator.generate("ipv6");
        assert!(ipv6.as_str().unwrap().parse::<std::net::Ipv6Addr>().is_ok());

        let mac = generator.generate("mac_address");
        assert_eq!(mac.as_str().unwrap().split(':').count(), 6);
        let hex = generator.generate("hexcolor");
        assert!(hex.as_str().unwrap().starts_with('#'));
        assert_eq!(hex.as_str().unwrap().len(), 7);
    }

    #[test]
    fn test_temporal_values() {
        let mut generator = FakeValueGenerator::seeded(9);
        let today = Utc::now().date_naive();

        let DatabaseValue::Date(past) = generator.generate("past_date") else {
            panic!("date expected");
        };
        assert!(past <= today);
        let DatabaseValue::Date(future) = generator.generate("future") else {
            panic!("date expected");
        };
        assert!(future >= today);

        let DatabaseValue::Time(time) = generator.generate("time") else {
            panic!("time expected");
        };
        assert_eq!(time.to_string().len(), "12:00:00".len());
        assert!(matches!(generator.generate("datetime"), DatabaseValue::DateTime(_)));
    }

    #[test]
    fn test_finance_checksums() {
        let mut generator = FakeValueGenerator::seeded(21);
        for _ in 0..50 {
            let card = generator.generate("credit_card");
            let card = card.as_str().unwrap();
            assert_eq!(card.len(), 16);
            assert!(luhn_valid(card));

            let iban = generator.generate("iban");
            let iban = iban.as_str().unwrap();
            assert_eq!(iban.len(), 22);
            let rearranged = format!("{}1314{}", &iban[4..], &iban[2..4]);
            assert_eq!(mod97(&rearranged), 1);
        }
        assert_eq!(generator.generate("bic").as_str().unwrap().len(), 8);
    }
}
