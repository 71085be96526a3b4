//! Command line and environment configuration.

use clap::Parser;

/// Hold a virtual terminal in graphics mode for a graphical session.
///
/// The VT is taken out of text mode, its keyboard is muted, and VT switches
/// are answered until the process is interrupted. The console is restored on
/// exit.
#[derive(Debug, Clone, Parser)]
#[command(name = "vtsession", version, about)]
pub struct Config {
    /// VT to claim, even if something already runs in graphics mode on it (0 to look for one)
    #[arg(long)]
    pub vt: Option<u32>,

    /// VT handed over by the login session, used when --vt is not given
    #[arg(long = "session-vt", env = "XDG_VTNR")]
    pub session_vt: Option<String>,

    /// Once the VT is claimed, ask the kernel to switch to this VT
    #[arg(long = "switch-to")]
    pub switch_to: Option<u32>,

    /// Print debug messages (same as setting DEBUG)
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() -> anyhow::Result<()> {
        let config = Config::try_parse_from(["vtsession", "--session-vt", "2"])?;
        assert_eq!(config.vt, None);
        assert_eq!(config.session_vt.as_deref(), Some("2"));
        assert_eq!(config.switch_to, None);
        assert!(!config.verbose);
        Ok(())
    }

    #[test]
    fn test_parse_all() -> anyhow::Result<()> {
        let config = Config::try_parse_from([
            "vtsession",
            "--vt",
            "7",
            "--session-vt",
            "abc",
            "--switch-to",
            "2",
            "-v",
        ])?;
        assert_eq!(config.vt, Some(7));
        // left to the locator to reject
        assert_eq!(config.session_vt.as_deref(), Some("abc"));
        assert_eq!(config.switch_to, Some(2));
        assert!(config.verbose);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_bad_vt() {
        let word = Config::try_parse_from(["vtsession", "--vt", "seven"]);
        assert!(word.is_err());
        let negative = Config::try_parse_from(["vtsession", "--vt", "-1"]);
        assert!(negative.is_err());
    }

    #[test]
    fn test_command() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }
}
