use std::path::PathBuf;

/// padscan - poll the console keys and report debounced key events
#[derive(argh::FromArgs, Debug)]
pub struct Args {
    /// path to config file (default: /etc/padscan/config.toml)
    #[argh(option, default = "PathBuf::from(\"/etc/padscan/config.toml\")")]
    pub config: PathBuf,
    /// stop after this many frames (default: run until interrupted)
    #[argh(option)]
    pub frames: Option<u64>,
    /// log level (off, error, warn, info, debug, trace) (default: info)
    #[argh(option, default = "log::LevelFilter::Info")]
    pub log_level: log::LevelFilter,
    /// do not draw the key grid even if a display is configured
    #[argh(switch)]
    pub no_display: bool,
}
