//! Standard version and constraint grammar (spec.md §4.I), grounded in
//! `original_source/libbutl/standard-version.cxx`: a packed numeric
//! encoding `AAAAABBBBBCCCCCDDDE` (major, minor, patch, pre-release offset,
//! earliest/snapshot bit) that makes two versions comparable with a single
//! integer comparison.

use crate::error::{Error, Result};

pub const LATEST_SN: u64 = u64::MAX;
const STUB: u64 = u64::MAX;

/// Parsing leniency flags (spec.md §4.I), mirroring the reference's
/// `standard_version::flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    pub const NONE: Flags = Flags(0);
    pub const ALLOW_EARLIEST: Flags = Flags(0b01);
    pub const ALLOW_STUB: Flags = Flags(0b10);

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StandardVersion {
    pub epoch: u16,
    pub version: u64,
    pub snapshot_sn: u64,
    pub snapshot_id: String,
    pub revision: u16,
}

impl StandardVersion {
    pub fn empty() -> Self {
        StandardVersion {
            epoch: 0,
            version: 0,
            snapshot_sn: 0,
            snapshot_id: String::new(),
            revision: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.version == 0
    }

    pub fn stub(&self) -> bool {
        self.version == STUB
    }

    pub fn major(&self) -> u64 {
        self.version / 100_000_000_000_000
    }

    pub fn minor(&self) -> u64 {
        self.version / 1_000_000_000 % 100_000
    }

    pub fn patch(&self) -> u64 {
        self.version / 10_000 % 100_000
    }

    fn ab(&self) -> u64 {
        self.version / 10 % 1000
    }

    fn e_bit(&self) -> u64 {
        self.version % 10
    }

    pub fn alpha(&self) -> bool {
        !self.stub() && self.ab() != 0 && self.ab() < 500
    }

    pub fn beta(&self) -> bool {
        !self.stub() && self.ab() >= 500
    }

    pub fn earliest(&self) -> bool {
        !self.stub() && self.e_bit() == 1 && self.snapshot_sn == 0
    }

    pub fn snapshot(&self) -> bool {
        self.snapshot_sn != 0
    }

    pub fn latest_snapshot(&self) -> bool {
        self.snapshot_sn == LATEST_SN
    }

    /// Parse from its textual representation (spec.md §4.I grammar).
    pub fn parse(s: &str, flags: Flags) -> Result<Self> {
        parse_version(s, flags).map_err(Error::invalid_argument)
    }

    fn string_pre_release(&self) -> String {
        if (self.alpha() && !self.earliest()) || self.beta() {
            let ab = self.ab();
            if ab < 500 {
                format!("a.{ab}")
            } else {
                format!("b.{}", ab - 500)
            }
        } else {
            String::new()
        }
    }

    fn string_version(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        if self.stub() {
            return "0".to_string();
        }
        let mut r = format!("{}.{}.{}", self.major(), self.minor(), self.patch());
        if self.alpha() || self.beta() {
            r.push('-');
            r.push_str(&self.string_pre_release());
            if self.snapshot() {
                r.push('.');
            }
        }
        r
    }

    fn string_snapshot(&self) -> String {
        if !self.snapshot() {
            return String::new();
        }
        let mut r = if self.latest_snapshot() {
            "z".to_string()
        } else {
            self.snapshot_sn.to_string()
        };
        if !self.snapshot_id.is_empty() {
            r.push('.');
            r.push_str(&self.snapshot_id);
        }
        r
    }

    pub fn string_project(&self, with_revision: bool) -> String {
        let mut r = self.string_version();
        if self.snapshot() {
            r.push_str(&self.string_snapshot());
        }
        if with_revision && self.revision != 0 {
            r.push('+');
            r.push_str(&self.revision.to_string());
        }
        r
    }

    pub fn to_string_full(&self) -> String {
        let mut r = String::new();
        if self.epoch != 1 && !self.stub() {
            r.push('+');
            r.push_str(&self.epoch.to_string());
            r.push('-');
        }
        r.push_str(&self.string_project(true));
        r
    }
}

impl std::fmt::Display for StandardVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string_full())
    }
}

impl PartialOrd for StandardVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StandardVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.epoch, self.version, self.snapshot_sn, self.revision).cmp(&(
            other.epoch,
            other.version,
            other.snapshot_sn,
            other.revision,
        ))
    }
}

fn parse_uint(s: &[u8], p: &mut usize, min: u64, max: u64) -> Option<u64> {
    if *p >= s.len() || s[*p] == b'-' || s[*p] == b'+' {
        return None;
    }
    let start = *p;
    while *p < s.len() && s[*p].is_ascii_digit() {
        *p += 1;
    }
    if *p == start {
        return None;
    }
    let v: u64 = std::str::from_utf8(&s[start..*p]).ok()?.parse().ok()?;
    if v < min || v > max {
        return None;
    }
    Some(v)
}

fn parse_version(s: &str, flags: Flags) -> std::result::Result<StandardVersion, String> {
    let bytes = s.as_bytes();
    let n = bytes.len();
    let mut p = 0usize;
    let mut r = StandardVersion::empty();
    // Epoch defaults to 1 when omitted for a non-stub version (spec.md §4.I
    // "epoch omitted when 1 for non-stub"); the stub branch below resets it
    // to 0, and an explicit `+N-` prefix overrides it either way.
    r.epoch = 1;

    let has_epoch = bytes.first() == Some(&b'+');
    if has_epoch {
        p += 1;
        let epoch = parse_uint(bytes, &mut p, 1, u16::MAX as u64).ok_or("invalid epoch")?;
        r.epoch = epoch as u16;
        if p >= n || bytes[p] != b'-' {
            return Err("'-' expected after epoch".to_string());
        }
        p += 1;
    }

    let ma = parse_uint(bytes, &mut p, 0, 99_999).ok_or("invalid major version")?;

    let stub = flags.contains(Flags::ALLOW_STUB) && !has_epoch && ma == 0 && (p == n || bytes[p] == b'+');

    let mut earliest = false;
    let mut ab: u64 = 0;

    if stub {
        r.epoch = 0;
        r.version = STUB;
    } else {
        if p >= n || bytes[p] != b'.' {
            return Err("'.' expected after major version".to_string());
        }
        p += 1;
        let mi = parse_uint(bytes, &mut p, 0, 99_999).ok_or("invalid minor version")?;
        if p >= n || bytes[p] != b'.' {
            return Err("'.' expected after minor version".to_string());
        }
        p += 1;
        let bf = parse_uint(bytes, &mut p, 0, 99_999).ok_or("invalid patch version")?;

        r.version = ma * 100_000_000_000_000 + mi * 1_000_000_000 + bf * 10_000;
        if r.version == 0 {
            return Err("0.0.0 version".to_string());
        }

        if p < n && bytes[p] == b'-' {
            p += 1;
            if p >= n {
                if flags.contains(Flags::ALLOW_EARLIEST) {
                    earliest = true;
                } else {
                    return Err("'a' or 'b' expected in pre-release".to_string());
                }
            } else {
                let k = bytes[p];
                if k != b'a' && k != b'b' {
                    return Err("'a' or 'b' expected in pre-release".to_string());
                }
                p += 1;
                if p >= n || bytes[p] != b'.' {
                    return Err("'.' expected after pre-release letter".to_string());
                }
                p += 1;
                let v = parse_uint(bytes, &mut p, 0, 499).ok_or("invalid pre-release")?;
                ab = if k == b'b' { v + 500 } else { v };

                if p < n && bytes[p] == b'.' {
                    p += 1;
                    if p < n && bytes[p] == b'z' {
                        r.snapshot_sn = LATEST_SN;
                        p += 1;
                    } else {
                        let sn = parse_uint(bytes, &mut p, 1, LATEST_SN - 1).ok_or("invalid snapshot number")?;
                        r.snapshot_sn = sn;
                        if p < n && bytes[p] == b'.' {
                            p += 1;
                            let start = p;
                            while p < n && (bytes[p].is_ascii_alphanumeric()) {
                                p += 1;
                            }
                            if start == p || p - start > 16 {
                                return Err("invalid snapshot id".to_string());
                            }
                            r.snapshot_id = s[start..p].to_string();
                        }
                    }
                } else if ab == 0 || ab == 500 {
                    return Err("invalid final pre-release".to_string());
                }
            }
        }
    }

    if p < n && bytes[p] == b'+' {
        p += 1;
        let rev = parse_uint(bytes, &mut p, 1, u16::MAX as u64).ok_or("invalid revision")?;
        r.revision = rev as u16;
    }

    if p != n {
        return Err("junk after version".to_string());
    }

    if ab != 0 || r.snapshot_sn != 0 || earliest {
        r.version -= 10_000 - ab * 10;
    }
    if r.snapshot_sn != 0 || earliest {
        r.version += 1;
    }

    Ok(r)
}

/// Bound endpoint of a [`Constraint`] range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: StandardVersion,
    pub open: bool,
}

/// A version constraint: a (possibly half-open) range (spec.md §4.I).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

impl Constraint {
    pub fn satisfies(&self, v: &StandardVersion) -> bool {
        if let Some(min) = &self.min {
            if min.open {
                if v <= &min.version {
                    return false;
                }
            } else if v < &min.version {
                return false;
            }
        }
        if let Some(max) = &self.max {
            if max.open {
                if v >= &max.version {
                    return false;
                }
            } else if v > &max.version {
                return false;
            }
        }
        true
    }
}

/// Compute the exclusive upper bound for a `~`/`^` shortcut constraint
/// (spec.md §10): `~X.Y.Z -> [X.Y.Z X.Y+1.0-)`, `^X.Y.Z -> [X.Y.Z X+1.0.0-)`
/// (or `[0.Y.Z 0.Y+1.0-)` when the major version is zero). Returns `None` on
/// overflow when `ignore_overflow` is set, matching the reference's
/// `shortcut_max_version`.
pub fn shortcut_max(c: char, version: &StandardVersion, ignore_overflow: bool) -> Result<Option<StandardVersion>> {
    debug_assert!(c == '~' || c == '^');

    let v: u64;
    if c == '~' || (c == '^' && version.major() == 0) {
        if version.minor() == 99_999 {
            return if ignore_overflow {
                Ok(None)
            } else {
                Err(Error::invalid_argument("invalid minor version"))
            };
        }
        v = version.major() * 100_000_000_000_000 + (version.minor() + 1) * 1_000_000_000;
    } else {
        if version.major() == 99_999 {
            return if ignore_overflow {
                Ok(None)
            } else {
                Err(Error::invalid_argument("invalid major version"))
            };
        }
        v = (version.major() + 1) * 100_000_000_000_000;
    }

    Ok(Some(StandardVersion {
        epoch: version.epoch,
        version: v - 10_000 + 1,
        snapshot_sn: 0,
        snapshot_id: String::new(),
        revision: 0,
    }))
}

/// Build the constraint a `~X.Y.Z` or `^X.Y.Z` shortcut denotes.
pub fn shortcut_constraint(c: char, version: StandardVersion, ignore_overflow: bool) -> Result<Constraint> {
    let max = shortcut_max(c, &version, ignore_overflow)?;
    Ok(Constraint {
        min: Some(Bound { version, open: false }),
        max: max.map(|v| Bound { version: v, open: true }),
    })
}

/// Parse an explicit-operator constraint: `==`, `<`, `<=`, `>`, `>=`,
/// `~X.Y.Z`, or `^X.Y.Z`. `dependent` is substituted for an omitted version
/// component in shortcut forms that need completion against the dependent
/// package's version (spec.md §10 "`$`-substitution").
pub fn parse_constraint(s: &str, dependent: Option<&StandardVersion>) -> Result<Constraint> {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix("~") {
        let v = resolve_version(rest, dependent)?;
        return shortcut_constraint('~', v, false);
    }
    if let Some(rest) = s.strip_prefix('^') {
        let v = resolve_version(rest, dependent)?;
        return shortcut_constraint('^', v, false);
    }
    if let Some(rest) = s.strip_prefix(">=") {
        let v = resolve_version(rest.trim(), dependent)?;
        return Ok(Constraint { min: Some(Bound { version: v, open: false }), max: None });
    }
    if let Some(rest) = s.strip_prefix('>') {
        let v = resolve_version(rest.trim(), dependent)?;
        return Ok(Constraint { min: Some(Bound { version: v, open: true }), max: None });
    }
    if let Some(rest) = s.strip_prefix("<=") {
        let v = resolve_version(rest.trim(), dependent)?;
        return Ok(Constraint { min: None, max: Some(Bound { version: v, open: false }) });
    }
    if let Some(rest) = s.strip_prefix('<') {
        let v = resolve_version(rest.trim(), dependent)?;
        return Ok(Constraint { min: None, max: Some(Bound { version: v, open: true }) });
    }
    let rest = s.strip_prefix("==").unwrap_or(s);
    let v = resolve_version(rest.trim(), dependent)?;
    Ok(Constraint {
        min: Some(Bound { version: v.clone(), open: false }),
        max: Some(Bound { version: v, open: false }),
    })
}

/// `$` stands for the dependent package's own version (spec.md §10).
fn resolve_version(s: &str, dependent: Option<&StandardVersion>) -> Result<StandardVersion> {
    if s == "$" {
        return dependent
            .cloned()
            .ok_or_else(|| Error::invalid_argument("'$' substitution requires a dependent version"));
    }
    StandardVersion::parse(s, Flags::ALLOW_EARLIEST)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> StandardVersion {
        StandardVersion::parse(s, Flags::NONE).unwrap()
    }

    #[test]
    fn parses_plain_release_and_round_trips() {
        let ver = v("1.2.3");
        assert_eq!((ver.major(), ver.minor(), ver.patch()), (1, 2, 3));
        assert_eq!(ver.string_project(false), "1.2.3");
    }

    #[test]
    fn parses_alpha_and_beta_prerelease() {
        let a = StandardVersion::parse("1.2.3-a.1", Flags::NONE).unwrap();
        assert!(a.alpha());
        assert_eq!(a.string_project(false), "1.2.3-a.1");

        let b = StandardVersion::parse("1.2.3-b.0", Flags::NONE).unwrap();
        assert!(b.beta());
    }

    #[test]
    fn release_sorts_above_prerelease() {
        let pre = v("1.2.3-a.1");
        let release = v("1.2.3");
        assert!(pre < release);
    }

    #[test]
    fn rejects_all_zero_version() {
        assert!(StandardVersion::parse("0.0.0", Flags::NONE).is_err());
    }

    #[test]
    fn stub_requires_flag_and_has_no_components() {
        assert!(StandardVersion::parse("0", Flags::NONE).is_err());
        let stub = StandardVersion::parse("0", Flags::ALLOW_STUB).unwrap();
        assert!(stub.stub());
    }

    #[test]
    fn caret_shortcut_pins_major_unless_zero() {
        let c = shortcut_constraint('^', v("1.2.3"), false).unwrap();
        assert!(c.satisfies(&v("1.9.9")));
        assert!(!c.satisfies(&v("2.0.0")));

        let c0 = shortcut_constraint('^', v("0.2.3"), false).unwrap();
        assert!(!c0.satisfies(&v("0.3.0")));
    }

    #[test]
    fn tilde_shortcut_pins_minor() {
        let c = shortcut_constraint('~', v("1.2.3"), false).unwrap();
        assert!(c.satisfies(&v("1.2.9")));
        assert!(!c.satisfies(&v("1.3.0")));
    }

    #[test]
    fn shortcut_overflow_can_be_ignored() {
        let huge = StandardVersion::parse("99999.0.0", Flags::NONE).unwrap();
        assert!(shortcut_max('^', &huge, false).is_err());
        assert!(shortcut_max('^', &huge, true).unwrap().is_none());
    }

    #[test]
    fn dependent_substitution_resolves_dollar() {
        let dep = v("1.2.3");
        let c = parse_constraint(">=$", Some(&dep)).unwrap();
        assert!(c.satisfies(&v("1.2.3")));
        assert!(!c.satisfies(&v("1.2.2")));
    }

    #[test]
    fn comparison_operators_build_half_open_ranges() {
        let c = parse_constraint("<2.0.0", None).unwrap();
        assert!(c.satisfies(&v("1.9.9")));
        assert!(!c.satisfies(&v("2.0.0")));
    }
}
