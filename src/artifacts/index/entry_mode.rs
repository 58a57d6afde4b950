//! File modes as Git records them
//!
//! Only three modes exist in this core: regular files (`100644`), executable
//! files (`100755`) and directories (`40000`, displayed as `040000`). Raw
//! `st_mode` values are normalised to one of these on staging.

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
}

#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
pub enum EntryMode {
    File(FileMode),
    Directory,
}

impl Default for EntryMode {
    fn default() -> Self {
        EntryMode::File(FileMode::Regular)
    }
}

impl EntryMode {
    /// The ASCII form written inside tree payloads (no leading zero for
    /// directories, matching what Git writes).
    pub fn as_str(&self) -> &str {
        match self {
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::Directory => "40000",
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Regular) => 0o100644,
            EntryMode::File(FileMode::Executable) => 0o100755,
            EntryMode::Directory => 0o40000,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }
}

impl TryFrom<u32> for EntryMode {
    type Error = anyhow::Error;

    fn try_from(mode: u32) -> anyhow::Result<Self> {
        match mode {
            0o100644 => Ok(EntryMode::File(FileMode::Regular)),
            0o100755 => Ok(EntryMode::File(FileMode::Executable)),
            0o40000 => Ok(EntryMode::Directory),
            _ => Err(anyhow::anyhow!("Invalid entry mode {mode:o}")),
        }
    }
}

impl TryFrom<&str> for EntryMode {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "100644" => Ok(EntryMode::File(FileMode::Regular)),
            "100755" => Ok(EntryMode::File(FileMode::Executable)),
            "40000" => Ok(EntryMode::Directory),
            _ => Err(anyhow::anyhow!("Invalid entry mode {value:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EntryMode::File(FileMode::Regular), "100644", 0o100644)]
    #[case(EntryMode::File(FileMode::Executable), "100755", 0o100755)]
    #[case(EntryMode::Directory, "40000", 0o40000)]
    fn mode_conversions_are_consistent(
        #[case] mode: EntryMode,
        #[case] text: &str,
        #[case] bits: u32,
    ) {
        assert_eq!(mode.as_str(), text);
        assert_eq!(mode.as_u32(), bits);
        assert_eq!(EntryMode::try_from(text).unwrap(), mode);
        assert_eq!(EntryMode::try_from(bits).unwrap(), mode);
    }

    #[rstest]
    #[case("040000")]
    #[case("100664")]
    #[case("120000")]
    fn unsupported_modes_are_rejected(#[case] text: &str) {
        assert!(EntryMode::try_from(text).is_err());
    }
}
