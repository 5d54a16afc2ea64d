use serde::Deserialize;
use std::fmt;

/// A person credited in a descriptor: `Name (url) <email>`, every part optional.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(from = "RawAuthor")]
pub struct Author {
    pub name: String,
    pub url: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAuthor {
    Text(String),
    Record {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

impl From<RawAuthor> for Author {
    fn from(raw: RawAuthor) -> Self {
        match raw {
            RawAuthor::Text(text) => Author::parse(&text),
            RawAuthor::Record { name, url, email } => Author {
                name: name.unwrap_or_default(),
                url,
                email,
            },
        }
    }
}

impl Author {
    /// Parse `Name (url) <email>`.
    pub fn parse(text: &str) -> Self {
        let name_end = text.find(['(', '<']).unwrap_or(text.len());
        let name = text[..name_end].trim().to_string();
        let mut rest = &text[name_end..];

        let mut url = None;
        if let Some(inner) = rest.strip_prefix('(') {
            if let Some(end) = inner.find(')') {
                url = non_empty(&inner[..end]);
                rest = &inner[end + 1..];
            }
        }

        let mut email = None;
        if let Some(inner) = rest.trim_start().strip_prefix('<') {
            if let Some(end) = inner.find('>') {
                email = non_empty(&inner[..end]);
            }
        }

        Author { name, url, email }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.name.is_empty() {
            parts.push(self.name.clone());
        }
        if let Some(url) = &self.url {
            parts.push(format!("({})", url));
        }
        if let Some(email) = &self.email {
            parts.push(format!("<{}>", email));
        }
        write!(f, "{}", parts.join(" "))
    }
}
