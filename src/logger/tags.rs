use colored::Colorize;

/// Module tags used to categorize and filter log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Engine,
    Data,
    Positions,
    History,
    Reentry,
    Filters,
    Contracts,
    Premarket,
    Telegram,
    Webserver,
}

impl LogTag {
    /// Display name shown in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Engine => "ENGINE",
            LogTag::Data => "DATA",
            LogTag::Positions => "POSITIONS",
            LogTag::History => "HISTORY",
            LogTag::Reentry => "REENTRY",
            LogTag::Filters => "FILTERS",
            LogTag::Contracts => "CONTRACTS",
            LogTag::Premarket => "PREMARKET",
            LogTag::Telegram => "TELEGRAM",
            LogTag::Webserver => "WEBSERVER",
        }
    }

    /// Key used for `--debug-<key>` command-line flags
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Engine => "engine",
            LogTag::Data => "data",
            LogTag::Positions => "positions",
            LogTag::History => "history",
            LogTag::Reentry => "reentry",
            LogTag::Filters => "filters",
            LogTag::Contracts => "contracts",
            LogTag::Premarket => "premarket",
            LogTag::Telegram => "telegram",
            LogTag::Webserver => "webserver",
        }
    }

    /// Colored tag label for console output
    pub fn colored_label(&self) -> String {
        match self {
            LogTag::System => self.as_str().green().bold().to_string(),
            LogTag::Config => self.as_str().white().bold().to_string(),
            LogTag::Engine => self.as_str().cyan().bold().to_string(),
            LogTag::Data => self.as_str().blue().bold().to_string(),
            LogTag::Positions => self.as_str().yellow().bold().to_string(),
            LogTag::History => self.as_str().bright_blue().bold().to_string(),
            LogTag::Reentry => self.as_str().magenta().bold().to_string(),
            LogTag::Filters => self.as_str().bright_magenta().bold().to_string(),
            LogTag::Contracts => self.as_str().bright_cyan().bold().to_string(),
            LogTag::Premarket => self.as_str().bright_green().bold().to_string(),
            LogTag::Telegram => self.as_str().bright_yellow().bold().to_string(),
            LogTag::Webserver => self.as_str().bright_white().bold().to_string(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
