//! Untrusted Path Validation
//!
//! Validates a caller-supplied path in a fixed order and returns its
//! canonical absolute form:
//!
//! 1. normalize and check the constraint set (no filesystem access)
//! 2. lexical character policy (no filesystem access)
//! 3. existence
//! 4. canonicalization (the final component is kept when a symlink is required)
//! 5. bare drive letter rewrite
//! 6. symlink checks
//! 7. directory and file checks
//! 8. permission checks
//!
//! Only symlinks, directories and regular files are classified. FIFOs,
//! sockets and device nodes are neither files nor directories here.
//!
//! The returned path reflects the filesystem at validation time only; nothing
//! is held open, so a later swap of the target (TOCTOU) is not detected.

use super::error::ValidationError;
use super::input::{CharacterSet, SanitizationPolicy};
use crate::encoding::TextEncoding;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::{debug, warn};

const CATEGORY_CONFLICT: &str = "The item identified by a path can only be enforced to be one single category \
     at a time out of the following three categories: symlink or directory or file.";

/// Flags describing what a path must be and may be
///
/// `must_be_x` implies `may_be_x`. Every `may_be_x` left false is enforced as
/// "must NOT be x", so the all-default set disqualifies every path; at least
/// one of file, directory or symlink has to be allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathConstraints {
    pub must_be_file: bool,
    pub may_be_file: bool,
    pub must_be_directory: bool,
    pub may_be_directory: bool,
    pub must_be_symlink: bool,
    pub may_be_symlink: bool,
    pub must_be_readable: bool,
    pub may_be_readable: bool,
    pub must_be_writable: bool,
    pub may_be_writable: bool,
    pub must_be_executable: bool,
    pub may_be_executable: bool,
}

impl PathConstraints {
    pub fn builder() -> PathConstraintsBuilder {
        PathConstraintsBuilder::default()
    }

    /// Apply `must_be_x => may_be_x` and reject contradictory sets
    pub fn normalize(&self) -> Result<Self, ValidationError> {
        let categories = [self.must_be_file, self.must_be_directory, self.must_be_symlink];
        if categories.iter().filter(|&&set| set).count() > 1 {
            return Err(ValidationError::BadParametrization(CATEGORY_CONFLICT.to_string()));
        }

        let normalized = Self {
            may_be_file: self.may_be_file || self.must_be_file,
            may_be_directory: self.may_be_directory || self.must_be_directory,
            may_be_symlink: self.may_be_symlink || self.must_be_symlink,
            may_be_readable: self.may_be_readable || self.must_be_readable,
            may_be_writable: self.may_be_writable || self.must_be_writable,
            may_be_executable: self.may_be_executable || self.must_be_executable,
            ..*self
        };

        if !(normalized.may_be_file || normalized.may_be_directory || normalized.may_be_symlink) {
            return Err(ValidationError::BadParametrization(
                "Path must be allowed to be at least one category out of symlinks, directories or files."
                    .to_string(),
            ));
        }

        Ok(normalized)
    }
}

/// Chainable construction of [`PathConstraints`]
///
/// ```
/// use execguard::sanitize::PathConstraints;
///
/// let constraints = PathConstraints::builder()
///     .must_be_file()
///     .may_be_readable()
///     .build()
///     .unwrap();
/// assert!(constraints.may_be_file);
///
/// assert!(PathConstraints::builder().must_be_file().must_be_directory().build().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PathConstraintsBuilder {
    flags: PathConstraints,
}

macro_rules! constraint_setters {
    ($($name:ident),* $(,)?) => {
        impl PathConstraintsBuilder {
            $(
                pub fn $name(mut self) -> Self {
                    self.flags.$name = true;
                    self
                }
            )*
        }
    };
}

constraint_setters!(
    must_be_file,
    may_be_file,
    must_be_directory,
    may_be_directory,
    must_be_symlink,
    may_be_symlink,
    must_be_readable,
    may_be_readable,
    must_be_writable,
    may_be_writable,
    must_be_executable,
    may_be_executable,
);

impl PathConstraintsBuilder {
    /// Allow every permission (readable, writable, executable)
    pub fn any_permissions(self) -> Self {
        self.may_be_readable().may_be_writable().may_be_executable()
    }

    pub fn build(self) -> Result<PathConstraints, ValidationError> {
        self.flags.normalize()
    }
}

/// A path that passed every constraint, in canonical absolute form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedPath(String);

impl ValidatedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl std::fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ValidatedPath> for String {
    fn from(path: ValidatedPath) -> Self {
        path.0
    }
}

/// Characters allowed in a path: word characters, `.`, space, `-`, `_`,
/// separators, `~` and `:` (drive letters).
fn path_whitelist() -> Result<CharacterSet, ValidationError> {
    let mut class = String::from(r"\w\. \-_/\\~:");
    class.push_str(&regex::escape(&MAIN_SEPARATOR.to_string()));
    CharacterSet::new(class)
}

/// Command separators, quotes, comment and variable markers, line breaks.
fn path_blacklist() -> Result<CharacterSet, ValidationError> {
    let mut chars: Vec<char> = vec![';', '&', '\'', '"', '#', '!', '$', '%', '\r', '\n'];
    chars.extend(LINE_ENDING.chars());
    CharacterSet::from_chars(chars)
}

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Whether the host resolves bare drive letters against a per-drive cwd
const USES_DRIVE_LETTERS: bool = cfg!(windows);

/// `"C:"`, `"d:"` and the like
pub fn is_bare_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Append the root separator to a bare drive letter
///
/// Several command interpreters resolve `"C:"` to the last working directory
/// on that drive rather than its root.
fn root_bare_drive_letter(path: String) -> String {
    if !is_bare_drive_letter(&path) {
        return path;
    }
    let rooted = format!("{}{}", path, MAIN_SEPARATOR);
    warn!(
        "Path {} is a bare drive letter; using {} to address the drive root explicitly",
        path, rooted
    );
    rooted
}

/// Validate an untrusted path and return its canonical absolute form
///
/// Fails fast on the first violated rule; see the module docs for the order.
pub fn sanitize_path(
    path: &str,
    encoding: &str,
    constraints: &PathConstraints,
) -> Result<ValidatedPath, ValidationError> {
    let c = constraints.normalize()?;

    let encoding = TextEncoding::for_label(encoding).ok_or_else(|| ValidationError::UnknownEncoding {
        encoding: encoding.to_string(),
    })?;
    let policy = SanitizationPolicy::new(path_whitelist()?, path_blacklist()?, encoding);
    policy.check(path)?;

    let mut input = path.to_string();
    if USES_DRIVE_LETTERS && c.must_be_directory {
        input = root_bare_drive_letter(input);
    }

    // Follows links, so a dangling symlink counts as missing. A permission
    // error on an intermediate directory also lands here.
    if fs::metadata(&input).is_err() {
        return Err(ValidationError::not_found(
            path,
            "Path doesn't exist or is not readable or doesn't grant permissions for stat().",
        ));
    }

    let resolved = if c.must_be_symlink {
        resolve_parent(&input, path)?
    } else {
        dunce::canonicalize(&input).map_err(|e| {
            debug!("canonicalize({}) failed: {}", input, e);
            ValidationError::not_found(
                path,
                "Path doesn't exist or contains a symlink loop or other comparable problems.",
            )
        })?
    };

    let mut resolved = resolved.into_os_string().into_string().map_err(|raw| ValidationError::Encoding {
        input: raw.to_string_lossy().into_owned(),
        encoding: encoding.name().to_string(),
        chars: vec![char::REPLACEMENT_CHARACTER],
    })?;

    if USES_DRIVE_LETTERS && c.must_be_directory {
        resolved = root_bare_drive_letter(resolved);
    }

    let is_symlink = fs::symlink_metadata(if c.must_be_symlink { &resolved } else { &input })
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);

    if c.must_be_symlink && !is_symlink {
        return Err(ValidationError::wrong_type(path, "Path must be symlink."));
    }
    if !c.may_be_symlink && is_symlink {
        return Err(ValidationError::wrong_type(path, "Path may NOT be symlink."));
    }

    // Type of the link target, or of the path itself when it is not a link.
    let metadata = fs::metadata(&resolved).map_err(|_| {
        ValidationError::not_found(path, "Path vanished during validation.")
    })?;

    if c.must_be_directory && !metadata.is_dir() {
        return Err(ValidationError::wrong_type(path, "Path must be directory."));
    }
    if !c.must_be_symlink && !c.may_be_directory && metadata.is_dir() {
        return Err(ValidationError::wrong_type(path, "Path may NOT be directory."));
    }

    if c.must_be_file && !metadata.is_file() {
        return Err(ValidationError::wrong_type(path, "Path must be file."));
    }
    if !c.must_be_symlink && !c.may_be_file && metadata.is_file() {
        return Err(ValidationError::wrong_type(path, "Path may NOT be file."));
    }

    let resolved_path = Path::new(&resolved);
    let checks = [
        (Access::Read, c.must_be_readable, c.may_be_readable, "readable"),
        (Access::Write, c.must_be_writable, c.may_be_writable, "writable"),
        (Access::Execute, c.must_be_executable, c.may_be_executable, "executable"),
    ];
    for (access, must, may, label) in checks {
        let granted = has_access(resolved_path, access);
        if must && !granted {
            return Err(ValidationError::permission(path, format!("Path must be {}.", label)));
        }
        if !may && granted {
            return Err(ValidationError::permission(path, format!("Path may NOT be {}.", label)));
        }
    }

    debug!("Validated path {} -> {}", path, resolved);
    Ok(ValidatedPath(resolved))
}

/// Absolute form of `input` with every component but the last canonicalized
fn resolve_parent(input: &str, original: &str) -> Result<PathBuf, ValidationError> {
    let raw = Path::new(input);
    let absolute = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|_| ValidationError::not_found(original, "Current working directory is not accessible."))?
            .join(raw)
    };

    let name = absolute
        .file_name()
        .ok_or_else(|| ValidationError::wrong_type(original, "Path must be symlink."))?;
    let parent = absolute
        .parent()
        .ok_or_else(|| ValidationError::wrong_type(original, "Path must be symlink."))?;

    let parent = dunce::canonicalize(parent).map_err(|_| {
        ValidationError::not_found(
            original,
            "Parent directory of the symlink doesn't exist or contains a symlink loop.",
        )
    })?;
    Ok(parent.join(name))
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
    Execute,
}

/// access(2) for the real user
#[cfg(unix)]
fn has_access(path: &Path, access: Access) -> bool {
    use nix::unistd::AccessFlags;

    let flags = match access {
        Access::Read => AccessFlags::R_OK,
        Access::Write => AccessFlags::W_OK,
        Access::Execute => AccessFlags::X_OK,
    };
    nix::unistd::access(path, flags).is_ok()
}

/// Existence for read and execute, the read-only attribute for write
#[cfg(not(unix))]
fn has_access(path: &Path, access: Access) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => match access {
            Access::Read | Access::Execute => true,
            Access::Write => !metadata.permissions().readonly(),
        },
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::ValidationErrorKind;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        file: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::Builder::new().prefix("execguard").tempdir().unwrap();
            let file = dir.path().join("sample_file.txt");
            fs::write(&file, "content").unwrap();
            Self { dir, file }
        }

        fn dir_str(&self) -> &str {
            self.dir.path().to_str().unwrap()
        }

        fn file_str(&self) -> &str {
            self.file.to_str().unwrap()
        }
    }

    fn canonical(path: &Path) -> String {
        dunce::canonicalize(path).unwrap().to_str().unwrap().to_string()
    }

    #[cfg(unix)]
    fn running_as_root() -> bool {
        nix::unistd::geteuid().is_root()
    }

    #[cfg(unix)]
    fn chmod(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_normalize_sets_may_flags() {
        let c = PathConstraints {
            must_be_file: true,
            must_be_readable: true,
            must_be_executable: true,
            ..Default::default()
        }
        .normalize()
        .unwrap();
        assert!(c.may_be_file);
        assert!(c.may_be_readable);
        assert!(c.may_be_executable);
        assert!(!c.may_be_writable);
    }

    #[test]
    fn test_conflicting_categories() {
        let pairs = [
            PathConstraints::builder().must_be_file().must_be_directory(),
            PathConstraints::builder().must_be_file().must_be_symlink(),
            PathConstraints::builder().must_be_directory().must_be_symlink(),
        ];
        for builder in pairs {
            let err = builder.any_permissions().build().unwrap_err();
            assert_eq!(err.kind(), ValidationErrorKind::BadParametrization);
        }
    }

    #[test]
    fn test_no_category_allowed() {
        let err = PathConstraints::builder().any_permissions().build().unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::BadParametrization);
    }

    #[test]
    fn test_bad_parametrization_before_filesystem() {
        // Neither exists nor is lexically clean; the constraint check still wins.
        let constraints = PathConstraints {
            must_be_file: true,
            must_be_directory: true,
            must_be_symlink: true,
            ..Default::default()
        };
        let err = sanitize_path("/no/such;path", "utf-8", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::BadParametrization);
    }

    #[test]
    fn test_injection_rejected_lexically() {
        let constraints = PathConstraints::builder().may_be_file().any_permissions().build().unwrap();
        for payload in ["/tmp/x; rm -rf /", "/tmp/$(id)", "/tmp/a&b", "/tmp/'q'", "/tmp/line\nbreak", "/tmp/#c", "/tmp/100%"] {
            let err = sanitize_path(payload, "utf-8", &constraints).unwrap_err();
            assert_eq!(err.kind(), ValidationErrorKind::ForbiddenCharacter, "payload {:?}", payload);
        }
        let err = sanitize_path("/tmp/a|b", "utf-8", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::DisallowedCharacter);
    }

    #[test]
    fn test_valid_file() {
        let fx = Fixture::new();
        let constraints = PathConstraints::builder().must_be_file().any_permissions().build().unwrap();
        let result = sanitize_path(fx.file_str(), "UTF-8", &constraints).unwrap();
        assert_eq!(result.as_str(), canonical(&fx.file));
    }

    #[test]
    fn test_valid_file_is_idempotent() {
        let fx = Fixture::new();
        let constraints = PathConstraints::builder()
            .must_be_file()
            .may_be_readable()
            .may_be_writable()
            .may_be_executable()
            .build()
            .unwrap();
        let first = sanitize_path(fx.file_str(), "UTF-8", &constraints).unwrap();
        let second = sanitize_path(first.as_str(), "UTF-8", &constraints).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_relative_components_resolved() {
        let fx = Fixture::new();
        let dotted = format!("{}/./../{}/sample_file.txt", fx.dir_str(), fx.dir.path().file_name().unwrap().to_str().unwrap());
        let constraints = PathConstraints::builder().must_be_file().any_permissions().build().unwrap();
        let result = sanitize_path(&dotted, "UTF-8", &constraints).unwrap();
        assert_eq!(result.as_str(), canonical(&fx.file));
    }

    #[test]
    fn test_valid_directory() {
        let fx = Fixture::new();
        let constraints = PathConstraints::builder().must_be_directory().any_permissions().build().unwrap();
        let result = sanitize_path(fx.dir_str(), "UTF-8", &constraints).unwrap();
        assert_eq!(result.as_str(), canonical(fx.dir.path()));
    }

    #[test]
    fn test_directory_where_file_required() {
        let fx = Fixture::new();
        let constraints = PathConstraints::builder().must_be_file().any_permissions().build().unwrap();
        let err = sanitize_path(fx.dir_str(), "UTF-8", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::WrongType);
        assert!(err.to_string().contains("Path must be file."));
    }

    #[test]
    fn test_file_may_not_be_file() {
        let fx = Fixture::new();
        let constraints = PathConstraints::builder().may_be_directory().any_permissions().build().unwrap();
        let err = sanitize_path(fx.file_str(), "UTF-8", &constraints).unwrap_err();
        assert!(err.to_string().contains("Path may NOT be file."));
    }

    #[test]
    fn test_nonexistent_path() {
        let fx = Fixture::new();
        let missing = fx.dir.path().join("nonexistent_file.txt");
        let constraints = PathConstraints::builder().must_be_file().any_permissions().build().unwrap();
        let err = sanitize_path(missing.to_str().unwrap(), "UTF-8", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::NotFound);
        assert!(err.to_string().contains("nonexistent_file.txt"));
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let fx = Fixture::new();
        let constraints = PathConstraints::builder().must_be_file().any_permissions().build().unwrap();
        let err = sanitize_path(fx.file_str(), "no-such-codec", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::Encoding);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_kept_when_required() {
        let fx = Fixture::new();
        let link = fx.dir.path().join("symlink_test");
        std::os::unix::fs::symlink(&fx.file, &link).unwrap();

        let constraints = PathConstraints::builder().must_be_symlink().any_permissions().build().unwrap();
        let result = sanitize_path(link.to_str().unwrap(), "UTF-8", &constraints).unwrap();
        let expected = dunce::canonicalize(fx.dir.path()).unwrap().join("symlink_test");
        assert_eq!(result.as_path(), expected.as_path());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_rejected_unless_allowed() {
        let fx = Fixture::new();
        let link = fx.dir.path().join("symlink_test");
        std::os::unix::fs::symlink(&fx.file, &link).unwrap();

        let strict = PathConstraints::builder().may_be_file().any_permissions().build().unwrap();
        let err = sanitize_path(link.to_str().unwrap(), "UTF-8", &strict).unwrap_err();
        assert!(err.to_string().contains("Path may NOT be symlink."));

        let lenient = PathConstraints::builder().may_be_file().may_be_symlink().any_permissions().build().unwrap();
        let result = sanitize_path(link.to_str().unwrap(), "UTF-8", &lenient).unwrap();
        assert_eq!(result.as_str(), canonical(&fx.file));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolved_through_symlinked_directory() {
        // Only the caller's string is held to the character policy, not
        // whatever the link target happens to be named.
        let fx = Fixture::new();
        let target = fx.dir.path().join("build+cache");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("notes.txt"), "cached").unwrap();
        std::os::unix::fs::symlink(&target, fx.dir.path().join("cache")).unwrap();

        let input = format!("{}/cache/notes.txt", fx.dir_str());
        let constraints = PathConstraints::builder().must_be_file().any_permissions().build().unwrap();
        let result = sanitize_path(&input, "UTF-8", &constraints).unwrap();
        assert_eq!(result.as_str(), canonical(&target.join("notes.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn test_regular_file_is_not_symlink() {
        let fx = Fixture::new();
        let constraints = PathConstraints::builder().must_be_symlink().any_permissions().build().unwrap();
        let err = sanitize_path(fx.file_str(), "UTF-8", &constraints).unwrap_err();
        assert!(err.to_string().contains("Path must be symlink."));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_not_found() {
        let fx = Fixture::new();
        let link = fx.dir.path().join("dangling");
        std::os::unix::fs::symlink(fx.dir.path().join("gone"), &link).unwrap();
        let constraints = PathConstraints::builder().must_be_symlink().any_permissions().build().unwrap();
        let err = sanitize_path(link.to_str().unwrap(), "UTF-8", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_readable_only_file() {
        let fx = Fixture::new();
        chmod(&fx.file, 0o444);
        let constraints = PathConstraints::builder().must_be_readable().may_be_file().build().unwrap();
        let result = sanitize_path(fx.file_str(), "UTF-8", &constraints);
        if running_as_root() {
            // root is granted write access regardless of mode bits
            assert!(result.is_err());
        } else {
            assert!(result.is_ok());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_read_permission() {
        if running_as_root() {
            return;
        }
        let fx = Fixture::new();
        chmod(&fx.file, 0o222);
        let constraints = PathConstraints::builder().must_be_readable().may_be_file().any_permissions().build().unwrap();
        let err = sanitize_path(fx.file_str(), "UTF-8", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::PermissionMismatch);
        assert!(err.to_string().contains("Path must be readable."));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_only_file() {
        if running_as_root() {
            return;
        }
        let fx = Fixture::new();
        chmod(&fx.file, 0o111);
        let constraints = PathConstraints::builder().must_be_executable().may_be_file().build().unwrap();
        assert!(sanitize_path(fx.file_str(), "UTF-8", &constraints).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_undesired_executable_permission() {
        let fx = Fixture::new();
        chmod(&fx.file, 0o555);
        let constraints = PathConstraints::builder()
            .may_be_file()
            .may_be_readable()
            .may_be_writable()
            .build()
            .unwrap();
        let err = sanitize_path(fx.file_str(), "UTF-8", &constraints).unwrap_err();
        assert!(err.to_string().contains("Path may NOT be executable."));
    }

    #[cfg(unix)]
    #[test]
    fn test_undesired_read_permission() {
        if running_as_root() {
            return;
        }
        let fx = Fixture::new();
        chmod(&fx.file, 0o644);
        let constraints = PathConstraints::builder().may_be_file().may_be_writable().build().unwrap();
        let err = sanitize_path(fx.file_str(), "UTF-8", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::PermissionMismatch);
        assert!(err.to_string().contains("Path may NOT be readable."));
    }

    #[cfg(unix)]
    #[test]
    fn test_undesired_write_permission() {
        if running_as_root() {
            return;
        }
        let fx = Fixture::new();
        chmod(&fx.file, 0o644);
        let constraints = PathConstraints::builder().may_be_file().may_be_readable().build().unwrap();
        let err = sanitize_path(fx.file_str(), "UTF-8", &constraints).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::PermissionMismatch);
        assert!(err.to_string().contains("Path may NOT be writable."));
    }

    #[test]
    fn test_bare_drive_letter_detection() {
        assert!(is_bare_drive_letter("C:"));
        assert!(is_bare_drive_letter("z:"));
        assert!(!is_bare_drive_letter("C:\\"));
        assert!(!is_bare_drive_letter("1:"));
        assert!(!is_bare_drive_letter("C"));
        assert_eq!(root_bare_drive_letter("C:".to_string()), format!("C:{}", MAIN_SEPARATOR));
        assert_eq!(root_bare_drive_letter("C:\\dir".to_string()), "C:\\dir");
    }

    #[cfg(windows)]
    #[test]
    fn test_bare_drive_letter_resolves_to_root() {
        let constraints = PathConstraints::builder().must_be_directory().any_permissions().build().unwrap();
        let result = sanitize_path("C:", "UTF-8", &constraints).unwrap();
        assert_eq!(result.as_str(), "C:\\");
    }
}
