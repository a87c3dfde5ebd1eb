use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use regex::Regex;

lazy_static! {
    static ref NUMERIC_CODE: Regex = Regex::new(r"^[0-9]{4,8}$").expect("regex is valid");
    static ref USERNAME: Regex = Regex::new(r"^[a-z0-9](?:[a-z0-9-]{1,30}[a-z0-9])$")
        .expect("regex is valid");
    static ref COLOR: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").expect("regex is valid");
    static ref EMAIL: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("regex is valid");
}

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Passcodes and access codes are short numeric strings
pub fn is_numeric_code(code: &str) -> bool {
    NUMERIC_CODE.is_match(code)
}

/// Usernames are lowercase slugs, since they end up in urls
pub fn is_valid_username(username: &str) -> bool {
    USERNAME.is_match(username)
}

/// Profile colors are hex colors like `#aabbcc`
pub fn is_valid_color(color: &str) -> bool {
    COLOR.is_match(color)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

#[cfg(test)]
mod test {
    use super::{is_numeric_code, is_valid_color, is_valid_email, is_valid_username, random_string};

    #[test]
    fn random_strings_have_requested_length() {
        assert_eq!(random_string(32).len(), 32);
        assert_ne!(random_string(32), random_string(32));
    }

    #[test]
    fn validates_codes_and_slugs() {
        assert!(is_numeric_code("4821"));
        assert!(!is_numeric_code("48a1"));
        assert!(!is_numeric_code("12"));

        assert!(is_valid_username("ms-rivera"));
        assert!(!is_valid_username("-rivera"));
        assert!(!is_valid_username("Rivera"));

        assert!(is_valid_color("#A0b1c2"));
        assert!(!is_valid_color("red"));

        assert!(is_valid_email("parent@example.com"));
        assert!(!is_valid_email("parent@example"));
    }
}
