//! Configuration.
//!
//! This module primarily contains the type [`Config`] that holds all the
//! configuration used by the web control plane. It can be loaded both from
//! a TOML formatted config file and command line options.

use std::{fmt, fs, io};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{LevelFilter, error};
use serde::Deserialize;
use crate::error::Failed;


//------------ Defaults for Some Values --------------------------------------

/// The default address to listen on.
const DEFAULT_LISTEN: &str = "127.0.0.1:8085";

/// The default directory with the web UI files.
const DEFAULT_UI_DIR: &str = "webui";

/// Are we including traces in error responses by default?
const DEFAULT_VERBOSE_ERRORS: bool = false;


//------------ Config --------------------------------------------------------

/// The complete configuration of the web control plane.
///
/// All values are public and can be accessed directly.
///
/// The associated function [`config_args`][Self::config_args] adds all
/// command line options to a clap command. The matches can then be turned
/// into a config via [`from_arg_matches`][Self::from_arg_matches] which
/// also loads and merges a config file if one was given.
///
/// The methods [`init_logging`][Self::init_logging] and
/// [`switch_logging`][Self::switch_logging] configure logging according to
/// the strategy provided by the configuration. Finally,
/// [`to_toml`][Self::to_toml] produces a TOML value representing the
/// current configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The socket address to listen on.
    pub listen: SocketAddr,

    /// The user name required for access.
    pub username: String,

    /// The password required for access.
    pub password: String,

    /// The directory with the bundled web UI.
    ///
    /// If the directory contains a UI archive, its content is staged into
    /// a temporary directory at startup and served from there instead.
    pub ui_dir: PathBuf,

    /// Should error responses include a trace of the failure?
    ///
    /// When enabled, the body of a 500 response produced by a failed
    /// action includes the full failure trace. This leaks internals to
    /// anyone holding valid credentials and is off by default.
    pub verbose_errors: bool,

    /// The maximum log level to log.
    pub log_level: LevelFilter,

    /// Where to log to.
    pub log_target: LogTarget,
}

impl Config {
    /// Adds the basic command line arguments to a clap command.
    pub fn config_args(app: Command) -> Command {
        app
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("PATH")
            .help("Read base configuration from this file")
        )
        .arg(Arg::new("listen")
            .long("listen")
            .value_name("ADDR")
            .help("Address to listen on for HTTP connections")
        )
        .arg(Arg::new("username")
            .long("username")
            .value_name("NAME")
            .help("User name required for access")
        )
        .arg(Arg::new("password")
            .long("password")
            .value_name("PASSWORD")
            .help("Password required for access")
        )
        .arg(Arg::new("ui-dir")
            .long("ui-dir")
            .value_name("DIR")
            .help("Directory with the bundled web UI")
        )
        .arg(Arg::new("verbose-errors")
            .long("verbose-errors")
            .action(ArgAction::SetTrue)
            .help("Include failure traces in error responses")
        )
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .help("Log more information, twice for even more")
        )
        .arg(Arg::new("quiet")
            .short('q')
            .long("quiet")
            .action(ArgAction::Count)
            .conflicts_with("verbose")
            .help("Log less information, twice for no information")
        )
        .arg(Arg::new("logfile")
            .long("logfile")
            .value_name("PATH")
            .help("Log to this file")
        )
    }

    /// Creates a configuration from command line matches.
    ///
    /// If a config file was given via the `-c` option, it is read first
    /// and the remaining options are applied on top of it. Relative paths
    /// in the config file are resolved relative to the directory the file
    /// lives in, relative paths on the command line relative to `cur_dir`.
    ///
    /// If something goes wrong, errors are logged and `Failed` returned.
    pub fn from_arg_matches(
        matches: &ArgMatches,
        cur_dir: &Path,
    ) -> Result<Self, Failed> {
        let mut res = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(&cur_dir.join(path))?,
            None => Self::default(),
        };
        res.apply_arg_matches(matches, cur_dir)?;
        Ok(res)
    }

    /// Applies the command line matches to an existing configuration.
    fn apply_arg_matches(
        &mut self,
        matches: &ArgMatches,
        cur_dir: &Path,
    ) -> Result<(), Failed> {
        if let Some(listen) = matches.get_one::<String>("listen") {
            self.listen = match SocketAddr::from_str(listen) {
                Ok(addr) => addr,
                Err(_) => {
                    error!("Invalid value for listen: {}", listen);
                    return Err(Failed)
                }
            };
        }
        if let Some(username) = matches.get_one::<String>("username") {
            self.username = username.clone();
        }
        if let Some(password) = matches.get_one::<String>("password") {
            self.password = password.clone();
        }
        if let Some(dir) = matches.get_one::<String>("ui-dir") {
            self.ui_dir = cur_dir.join(dir);
        }
        if matches.get_flag("verbose-errors") {
            self.verbose_errors = true;
        }
        match (matches.get_count("verbose"), matches.get_count("quiet")) {
            (0, 0) => { }
            (1, 0) => self.log_level = LevelFilter::Info,
            (2, 0) => self.log_level = LevelFilter::Debug,
            (_, 0) => self.log_level = LevelFilter::Trace,
            (0, 1) => self.log_level = LevelFilter::Error,
            (0, _) => self.log_level = LevelFilter::Off,
            _ => { }
        }
        if let Some(path) = matches.get_one::<String>("logfile") {
            self.log_target = LogTarget::File(cur_dir.join(path));
        }
        Ok(())
    }

    /// Loads the configuration from a TOML file.
    fn from_file(path: &Path) -> Result<Self, Failed> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                error!(
                    "Failed to read config file {}: {}", path.display(), err
                );
                return Err(Failed)
            }
        };
        let file: ConfigFile = match toml::from_str(&content) {
            Ok(file) => file,
            Err(err) => {
                error!(
                    "Failed to parse config file {}: {}", path.display(), err
                );
                return Err(Failed)
            }
        };
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        file.into_config(base)
    }

    /// Initialises logging.
    ///
    /// All diagnostic output of the crate is done via logging, never to
    /// stderr directly. Thus, logging needs to be initialised before
    /// doing anything else, even while reading the configuration. Since
    /// the configuration can determine the desired logging, this method
    /// installs a simple stderr logger at warn level. If the configuration
    /// then says to log differently, [`switch_logging`][Self::switch_logging]
    /// can be used to change the setup later.
    pub fn init_logging() -> Result<(), Failed> {
        log::set_max_level(LevelFilter::Warn);
        if let Err(err) = log_reroute::init() {
            eprintln!("Failed to initialize logger: {}.\nAborting.", err);
            return Err(Failed)
        };
        let dispatch = fern::Dispatch::new()
            .level(LevelFilter::Error)
            .chain(io::stderr())
            .into_log().1;
        log_reroute::reroute_boxed(dispatch);
        Ok(())
    }

    /// Switches logging to the configured target.
    pub fn switch_logging(&self) -> Result<(), Failed> {
        let dispatch = match self.log_target {
            LogTarget::Stderr => {
                fern::Dispatch::new()
                    .level(self.log_level)
                    .chain(io::stderr())
            }
            LogTarget::File(ref path) => {
                let file = match fern::log_file(path) {
                    Ok(file) => file,
                    Err(err) => {
                        error!(
                            "Failed to open log file '{}': {}",
                            path.display(), err
                        );
                        return Err(Failed)
                    }
                };
                fern::Dispatch::new()
                    .level(self.log_level)
                    .format(|out, message, record| {
                        out.finish(format_args!(
                            "{} [{}] {}",
                            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                            record.level(),
                            message
                        ))
                    })
                    .chain(file)
            }
        };
        log_reroute::reroute_boxed(dispatch.into_log().1);
        log::set_max_level(self.log_level);
        Ok(())
    }

    /// Returns a TOML representation of the configuration.
    pub fn to_toml(&self) -> toml::Value {
        let mut res = toml::value::Table::new();
        res.insert(
            "listen".into(), self.listen.to_string().into()
        );
        res.insert("username".into(), self.username.clone().into());
        res.insert("password".into(), self.password.clone().into());
        res.insert(
            "ui-dir".into(), self.ui_dir.display().to_string().into()
        );
        res.insert("verbose-errors".into(), self.verbose_errors.into());
        res.insert(
            "log-level".into(), self.log_level.to_string().into()
        );
        match self.log_target {
            LogTarget::Stderr => {
                res.insert("log".into(), "stderr".into());
            }
            LogTarget::File(ref file) => {
                res.insert("log".into(), "file".into());
                res.insert(
                    "log-file".into(), file.display().to_string().into()
                );
            }
        }
        res.into()
    }
}


//--- Default

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: SocketAddr::from_str(DEFAULT_LISTEN)
                .expect("parsing default listen address"),
            username: String::new(),
            password: String::new(),
            ui_dir: DEFAULT_UI_DIR.into(),
            verbose_errors: DEFAULT_VERBOSE_ERRORS,
            log_level: LevelFilter::Warn,
            log_target: LogTarget::Stderr,
        }
    }
}


//--- Display

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_toml())
    }
}


//------------ LogTarget -----------------------------------------------------

/// The target to log to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogTarget {
    /// Log to stderr.
    Stderr,

    /// Log to the given file.
    File(PathBuf),
}


//------------ ConfigFile ----------------------------------------------------

/// The content of a config file.
///
/// All values are optional, anything missing keeps its default.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
    listen: Option<String>,
    username: Option<String>,
    password: Option<String>,
    ui_dir: Option<PathBuf>,
    verbose_errors: Option<bool>,
    log_level: Option<String>,
    log: Option<String>,
    log_file: Option<PathBuf>,
}

impl ConfigFile {
    /// Converts the file content into a configuration.
    ///
    /// Relative paths are resolved relative to `base`, the directory the
    /// config file lives in.
    fn into_config(self, base: &Path) -> Result<Config, Failed> {
        let mut res = Config::default();
        if let Some(listen) = self.listen {
            res.listen = match SocketAddr::from_str(&listen) {
                Ok(addr) => addr,
                Err(_) => {
                    error!("Invalid config value for listen: {}", listen);
                    return Err(Failed)
                }
            };
        }
        if let Some(username) = self.username {
            res.username = username;
        }
        if let Some(password) = self.password {
            res.password = password;
        }
        if let Some(dir) = self.ui_dir {
            res.ui_dir = base.join(dir);
        }
        if let Some(verbose) = self.verbose_errors {
            res.verbose_errors = verbose;
        }
        if let Some(level) = self.log_level {
            res.log_level = match LevelFilter::from_str(&level) {
                Ok(level) => level,
                Err(_) => {
                    error!("Invalid config value for log-level: {}", level);
                    return Err(Failed)
                }
            };
        }
        match self.log.as_deref() {
            None | Some("stderr") => { }
            Some("file") => {
                let path = match self.log_file {
                    Some(path) => base.join(path),
                    None => {
                        error!("Config value log-file is required for \
                                logging to a file");
                        return Err(Failed)
                    }
                };
                res.log_target = LogTarget::File(path);
            }
            Some(value) => {
                error!("Invalid config value for log: {}", value);
                return Err(Failed)
            }
        }
        Ok(res)
    }
}


//============ Tests =========================================================
