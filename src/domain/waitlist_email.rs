use once_cell::sync::Lazy;
use regex::Regex;

// What JavaScript's `\s` matches. The regex crate's `\s` is Unicode White_Space, which
// also covers U+0085 and leaves out U+FEFF.
const WHITESPACE: &str = r"\t\n\x0B\x0C\r \x{00A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";

// local-part "@" domain "." tld, no whitespace and a single "@"
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    let part = format!("[^{}@]+", WHITESPACE);

    Regex::new(&format!(r"^{part}@{part}\.{part}$", part = part)).expect("Email regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistEmail(String);

impl WaitlistEmail {
    /// Only checks the shape of the address. No DNS or mailbox verification is done.
    pub fn parse(email: String) -> Result<WaitlistEmail, String> {
        if !EMAIL_SHAPE.is_match(&email) {
            return Err(format!("{} email is not valid", email));
        }

        Ok(Self(email))
    }
}

impl AsRef<str> for WaitlistEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WaitlistEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
