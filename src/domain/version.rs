//! 三段式版本号

use std::fmt;
use std::str::FromStr;

use crate::error::DeployError;

/// `major.minor.patch`，按字典序比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// 解析版本号，去掉 `-SNAPSHOT` 之类的预发布后缀，要求恰好三段整数
    pub fn parse(s: &str) -> Result<Self, DeployError> {
        let core = s.split_once('-').map(|(core, _)| core).unwrap_or(s);
        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(DeployError::MalformedVersion(s.to_string()));
        }

        // 只接受纯数字，`+1` 之类的写法无法原样格式化回去
        let component = |part: &str| {
            if !is_numeric(part) {
                return Err(DeployError::MalformedVersion(s.to_string()));
            }
            part.parse::<u32>()
                .map_err(|_| DeployError::MalformedVersion(s.to_string()))
        };

        Ok(Self::new(
            component(parts[0])?,
            component(parts[1])?,
            component(parts[2])?,
        ))
    }

    /// 解析镜像 tag：四段的构建号（`25.0.0.2`）丢弃最后一段后再解析
    pub fn from_image_tag(tag: &str) -> Result<Self, DeployError> {
        if is_build_number(tag) {
            if let Some((release, _build)) = tag.rsplit_once('.') {
                return Self::parse(release);
            }
        }
        Self::parse(tag)
    }

    /// `left < version <= right`
    pub fn is_in_range_strict_left(left: &Version, version: &Version, right: &Version) -> bool {
        left < version && version <= right
    }
}

impl FromStr for Version {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 严格匹配 `数字.数字.数字.数字`
pub fn is_build_number(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| is_numeric(p))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let version = Version::parse("1.12.3").unwrap();
        assert_eq!(version, Version::new(1, 12, 3));
        assert_eq!(version.to_string(), "1.12.3");
    }

    #[test]
    fn test_parse_strips_snapshot() {
        assert_eq!(
            Version::parse("2.4.0-SNAPSHOT").unwrap(),
            Version::parse("2.4.0").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["1.2", "1.2.3.4", "a.b.c", "", "1..3", "-1.2.3", "+1.2.3", "1.+2.3", " 1.2.3"] {
            assert!(
                matches!(Version::parse(input), Err(DeployError::MalformedVersion(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_ordering() {
        let versions: Vec<Version> = ["1.2.3", "1.2.4", "1.3.0", "2.0.0"]
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();
        for pair in versions.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(
            Version::new(1, 2, 3).cmp(&Version::new(1, 2, 3)),
            std::cmp::Ordering::Equal
        );
        assert!(Version::new(10, 0, 0) > Version::new(9, 99, 99));
    }

    #[test]
    fn test_from_image_tag() {
        assert_eq!(
            Version::from_image_tag("25.0.0.2").unwrap(),
            Version::new(25, 0, 0)
        );
        assert_eq!(
            Version::from_image_tag("1.4.2-SNAPSHOT").unwrap(),
            Version::new(1, 4, 2)
        );
        assert!(Version::from_image_tag("latest").is_err());
    }

    #[test]
    fn test_is_in_range_strict_left() {
        let left = Version::new(1, 0, 0);
        let right = Version::new(2, 0, 0);
        assert!(!Version::is_in_range_strict_left(&left, &left, &right));
        assert!(Version::is_in_range_strict_left(&left, &Version::new(1, 5, 0), &right));
        assert!(Version::is_in_range_strict_left(&left, &right, &right));
    }

    #[test]
    fn test_is_build_number() {
        assert!(is_build_number("25.0.0.2"));
        assert!(!is_build_number("1.2.3"));
        assert!(!is_build_number("25.0.0.x"));
        assert!(!is_build_number("25.0..2"));
    }
}
