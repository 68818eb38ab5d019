//! Input String Sanitization
//!
//! Character policies are regex bracket-class bodies (`\w\.\-_`, `;&#`).
//! The blacklist is matched as `[class]+`, the whitelist as `[^class]+`, so
//! every match is a run of offending characters that can be reported back.

use super::error::ValidationError;
use crate::encoding::TextEncoding;
use regex::Regex;

/// A set of characters, written as the body of a regex bracket class
#[derive(Debug, Clone)]
pub struct CharacterSet {
    class: String,
    members: Option<Regex>,
    outsiders: Option<Regex>,
}

impl CharacterSet {
    /// Compile a character set from a bracket-class body
    ///
    /// An empty class yields an empty set that sanitization skips.
    pub fn new(class: impl Into<String>) -> Result<Self, ValidationError> {
        let class = class.into();
        if class.is_empty() {
            return Ok(Self::empty());
        }
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| {
                ValidationError::BadParametrization(format!(
                    "invalid character class \"{}\": {}",
                    class, e
                ))
            })
        };
        let members = compile(format!("[{}]+", class))?;
        let outsiders = compile(format!("[^{}]+", class))?;
        Ok(Self {
            class,
            members: Some(members),
            outsiders: Some(outsiders),
        })
    }

    /// Build a set from literal characters, escaping each one
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Result<Self, ValidationError> {
        let class: String = chars
            .into_iter()
            .map(|c| regex::escape(c.encode_utf8(&mut [0u8; 4])))
            .collect();
        Self::new(class)
    }

    pub fn empty() -> Self {
        Self {
            class: String::new(),
            members: None,
            outsiders: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.class.is_empty()
    }

    /// The bracket-class body this set was built from
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Runs of `text` that belong to this set
    fn find_members(&self, text: &str) -> Vec<String> {
        find_all(self.members.as_ref(), text)
    }

    /// Runs of `text` that fall outside this set
    fn find_outsiders(&self, text: &str) -> Vec<String> {
        find_all(self.outsiders.as_ref(), text)
    }
}

impl Default for CharacterSet {
    fn default() -> Self {
        Self::empty()
    }
}

fn find_all(regex: Option<&Regex>, text: &str) -> Vec<String> {
    regex
        .map(|r| r.find_iter(text).map(|m| m.as_str().to_string()).collect())
        .unwrap_or_default()
}

/// Whitelist, blacklist and encoding applied to one input string
#[derive(Debug, Clone, Default)]
pub struct SanitizationPolicy {
    pub whitelist: CharacterSet,
    pub blacklist: CharacterSet,
    pub encoding: TextEncoding,
}

impl SanitizationPolicy {
    pub fn new(whitelist: CharacterSet, blacklist: CharacterSet, encoding: TextEncoding) -> Self {
        Self {
            whitelist,
            blacklist,
            encoding,
        }
    }

    /// Check `input` against this policy
    ///
    /// Order: encodability, then blacklist, then whitelist. The blacklist runs
    /// first so that a string with forbidden characters is always reported as
    /// such, even when those characters are also outside the whitelist.
    pub fn check(&self, input: &str) -> Result<(), ValidationError> {
        let unencodable = self.encoding.unencodable_chars(input);
        if !unencodable.is_empty() {
            return Err(ValidationError::Encoding {
                input: input.to_string(),
                encoding: self.encoding.name().to_string(),
                chars: unencodable,
            });
        }

        if !self.blacklist.is_empty() {
            let matched = self.blacklist.find_members(input);
            if !matched.is_empty() {
                return Err(ValidationError::ForbiddenCharacter {
                    input: input.to_string(),
                    matched,
                    pattern: format!("[{}]+", self.blacklist.class()),
                });
            }
        }

        if !self.whitelist.is_empty() {
            let matched = self.whitelist.find_outsiders(input);
            if !matched.is_empty() {
                return Err(ValidationError::DisallowedCharacter {
                    input: input.to_string(),
                    matched,
                    pattern: format!("[^{}]+", self.whitelist.class()),
                });
            }
        }

        Ok(())
    }
}

/// Validate `input` against an encoding, a whitelist and a blacklist
///
/// ```
/// use execguard::sanitize::{sanitize_input, CharacterSet};
///
/// let whitelist = CharacterSet::new(r"\w\.\-_").unwrap();
/// let blacklist = CharacterSet::new(r";&#").unwrap();
/// assert!(sanitize_input("valid_string-123.txt", "utf-8", &whitelist, &blacklist).is_ok());
/// assert!(sanitize_input("rm;reboot", "utf-8", &whitelist, &blacklist).is_err());
/// ```
pub fn sanitize_input(
    input: &str,
    encoding: &str,
    whitelist: &CharacterSet,
    blacklist: &CharacterSet,
) -> Result<(), ValidationError> {
    let encoding = TextEncoding::for_label(encoding).ok_or_else(|| ValidationError::UnknownEncoding {
        encoding: encoding.to_string(),
    })?;
    SanitizationPolicy::new(whitelist.clone(), blacklist.clone(), encoding).check(input)
}

/// Strip the last extension from a file base name
///
/// A leading `./` is removed first; any remaining path separator is rejected.
///
/// ```
/// use execguard::sanitize::strip_file_extension;
///
/// assert_eq!(strip_file_extension("./valid_string-123.txt").unwrap(), "valid_string-123");
/// assert!(strip_file_extension("valid_string/123.txt").is_err());
/// ```
pub fn strip_file_extension(file_basename: &str) -> Result<String, ValidationError> {
    let current_dir_prefix = format!(".{}", std::path::MAIN_SEPARATOR);
    let name = file_basename
        .strip_prefix("./")
        .or_else(|| file_basename.strip_prefix(current_dir_prefix.as_str()))
        .unwrap_or(file_basename);

    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(ValidationError::wrong_type(
            file_basename,
            format!(
                "The given file base name seems to contain path fragments (directory separator \"{}\").",
                std::path::MAIN_SEPARATOR
            ),
        ));
    }

    let stem = std::path::Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    Ok(stem.to_string())
}
