//! Pipe Encoding Resolution
//!
//! Determines the text encoding used to decode a child's stdout/stderr.
//! Precedence, first answer wins:
//!
//! 1. an encoding explicitly bound to the output stream (`stream_hint`)
//! 2. UTF-8 mode (`EXECGUARD_UTF8=1`)
//! 3. the locale's preferred encoding
//! 4. the locale's secondary encoding field
//! 5. the filesystem encoding
//! 6. the caller's last resort
//!
//! A lookup that fails is treated as "no answer" and resolution moves on.

use std::env::{self, VarError};
use std::io;
use tracing::{debug, warn};

/// Environment variable carrying an explicit stream encoding
pub const IO_ENCODING_ENV: &str = "EXECGUARD_IO_ENCODING";

/// Environment variable enabling UTF-8 mode when set to `1`
pub const UTF8_MODE_ENV: &str = "EXECGUARD_UTF8";

/// Console code pages known to mis-render standard output
pub const LEGACY_CONSOLE_ENCODINGS: &[&str] = &["cp850", "cp437", "ibm850", "ibm437"];

/// Locale variables in the order the C library consults them for LC_CTYPE
const CTYPE_VARIABLES: &[&str] = &["LC_ALL", "LC_CTYPE", "LANG"];

/// Every locale variable that may carry a codeset
const LOCALE_VARIABLES: &[&str] = &["LC_ALL", "LC_CTYPE", "LANG", "LC_MESSAGES"];

/// Source of the signals consulted during resolution
///
/// Each lookup returns `Ok(None)` for "no answer" and `Err` for a platform
/// failure; both make the resolver fall through to the next lookup.
pub trait EncodingEnvironment {
    fn utf8_mode(&self) -> io::Result<bool>;
    fn preferred_encoding(&self) -> io::Result<Option<String>>;
    fn locale_encoding(&self) -> io::Result<Option<String>>;
    fn filesystem_encoding(&self) -> io::Result<Option<String>>;
}

/// Lookups backed by the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEncodingEnvironment;

impl EncodingEnvironment for SystemEncodingEnvironment {
    fn utf8_mode(&self) -> io::Result<bool> {
        Ok(read_var(UTF8_MODE_ENV)?.is_some_and(|v| v.trim() == "1"))
    }

    fn preferred_encoding(&self) -> io::Result<Option<String>> {
        for name in CTYPE_VARIABLES {
            if let Some(value) = read_var(name)? {
                if !value.is_empty() {
                    // The first non-empty variable decides, codeset or not.
                    return Ok(locale_codeset(&value));
                }
            }
        }
        Ok(None)
    }

    fn locale_encoding(&self) -> io::Result<Option<String>> {
        for name in LOCALE_VARIABLES {
            if let Some(codeset) = read_var(name)?.as_deref().and_then(locale_codeset) {
                return Ok(Some(codeset));
            }
        }
        Ok(None)
    }

    fn filesystem_encoding(&self) -> io::Result<Option<String>> {
        // OsStr <-> str conversions in std are UTF-8 on every supported platform.
        Ok(Some("utf-8".to_string()))
    }
}

fn read_var(name: &str) -> io::Result<Option<String>> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is not valid unicode", name),
        )),
    }
}

/// Extract the codeset from a locale name such as `en_US.UTF-8@euro`
fn locale_codeset(locale: &str) -> Option<String> {
    let (_, rest) = locale.split_once('.')?;
    let codeset = rest.split('@').next().unwrap_or_default().trim();
    if codeset.is_empty() {
        None
    } else {
        Some(codeset.to_string())
    }
}

/// Resolves pipe encodings against an [`EncodingEnvironment`]
#[derive(Debug, Clone, Default)]
pub struct EncodingResolver<E = SystemEncodingEnvironment> {
    environment: E,
}

impl EncodingResolver<SystemEncodingEnvironment> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: EncodingEnvironment> EncodingResolver<E> {
    pub fn with_environment(environment: E) -> Self {
        Self { environment }
    }

    /// Resolve the encoding name for subprocess pipes
    pub fn resolve(&self, stream_hint: Option<&str>, last_resort: &str) -> String {
        let resolved = self.resolve_quietly(stream_hint, last_resort);
        if is_legacy_console_encoding(&resolved) {
            warn!(
                "Old Windows encoding \"{}\" is the system default for pipes and text streams. \
                 Consider enabling UTF-8 mode by setting {}=1.",
                resolved, UTF8_MODE_ENV
            );
        }
        resolved
    }

    fn resolve_quietly(&self, stream_hint: Option<&str>, last_resort: &str) -> String {
        if let Some(hint) = stream_hint.map(str::trim).filter(|h| !h.is_empty()) {
            debug!("Using stream encoding: {}", hint);
            return hint.to_string();
        }

        match self.environment.utf8_mode() {
            Ok(true) => {
                debug!("{} is 1 => defaulting to UTF-8", UTF8_MODE_ENV);
                return "UTF-8".to_string();
            }
            Ok(false) => {}
            Err(e) => debug!("UTF-8 mode lookup failed: {}", e),
        }

        let lookups: [(&str, fn(&E) -> io::Result<Option<String>>); 3] = [
            ("locale preferred encoding", E::preferred_encoding),
            ("locale encoding field", E::locale_encoding),
            ("filesystem encoding", E::filesystem_encoding),
        ];
        for (label, lookup) in lookups {
            match lookup(&self.environment) {
                Ok(Some(encoding)) if !encoding.trim().is_empty() => {
                    debug!("Using {}: {}", label, encoding);
                    return encoding;
                }
                Ok(_) => {}
                Err(e) => debug!("Lookup of {} failed: {}", label, e),
            }
        }

        debug!("Resorted to last resort encoding {}", last_resort);
        last_resort.to_string()
    }
}

fn is_legacy_console_encoding(name: &str) -> bool {
    let lowered = name.trim().to_ascii_lowercase();
    LEGACY_CONSOLE_ENCODINGS.contains(&lowered.as_str())
}

/// Resolve the pipe encoding from the process environment
///
/// `stream_hint` defaults to `EXECGUARD_IO_ENCODING` when the caller has no
/// explicit stream encoding of its own.
pub fn resolve_pipe_encoding(stream_hint: Option<&str>, last_resort: &str) -> String {
    let env_value = env::var(IO_ENCODING_ENV).ok();
    let env_hint = match stream_hint {
        Some(hint) => {
            if let Some(ignored) = overridden_env_hint(hint, env_value.as_deref()) {
                debug!("Ignoring {}={} in favour of the explicit stream encoding", IO_ENCODING_ENV, ignored);
            }
            None
        }
        None => env_value,
    };
    EncodingResolver::new().resolve(stream_hint.or(env_hint.as_deref()), last_resort)
}

/// The environment hint an explicit stream encoding actually overrides
///
/// `None` when the variable is unset or names the same encoding, which is
/// the case when the config layer already folded it into the stream hint.
fn overridden_env_hint<'a>(stream_hint: &str, env_value: Option<&'a str>) -> Option<&'a str> {
    env_value.filter(|value| !value.trim().eq_ignore_ascii_case(stream_hint.trim()))
}
