use clap::{Arg, ArgAction, ArgGroup, Command, arg};
use std::ffi::OsString;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub script: Option<String>,
    pub script_file: Option<String>,
    pub env_file: Option<String>,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub q_enabled: bool,
    pub trace: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            script: None,
            script_file: None,
            env_file: None,
            log_level: "info".into(),
            log_dir: None,
            q_enabled: false,
            trace: false,
        }
    }
}

pub fn cli() -> Command {
    let defaults: Args = Default::default();

    Command::new("collider-script")
        .about(format!("{} v{}", env!("CARGO_PKG_DESCRIPTION"), env!("CARGO_PKG_VERSION")))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("script").long("script").short('s').value_name("ASM").help("Script to evaluate, in ASM text."))
        .arg(Arg::new("script-file").long("script-file").short('f').value_name("PATH").help("File holding the script in ASM text."))
        .group(ArgGroup::new("input").args(["script", "script-file"]).required(true))
        .arg(arg!(-e --env <ENV_FILE> "JSON file describing the script environment (camelCase fields, all optional)."))
        .arg(
            Arg::new("log_level")
                .short('d')
                .long("log-level")
                .value_name("LEVEL")
                .default_value(defaults.log_level)
                .help("Logging level for all subsystems {off, error, warn, info, debug, trace}\n-- You may also specify <subsystem>=<level>,<subsystem2>=<level>,... to set the log level for individual subsystems."),
        )
        .arg(arg!(--logdir <LOG_DIR> "Directory to log output."))
        .arg(
            Arg::new("q-enabled")
                .long("q-enabled")
                .action(ArgAction::SetTrue)
                .help("Evaluate with devnet script params, where the broadcast query opcode is active."),
        )
        .arg(Arg::new("trace").long("trace").action(ArgAction::SetTrue).help("Print the final stack and the recorded queries."))
}

impl Args {
    pub fn parse<I, T>(itr: I) -> Result<Args, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let m = cli().try_get_matches_from(itr)?;
        let defaults: Args = Default::default();

        Ok(Args {
            script: m.get_one::<String>("script").cloned(),
            script_file: m.get_one::<String>("script-file").cloned(),
            env_file: m.get_one::<String>("env").cloned(),
            log_level: m.get_one::<String>("log_level").cloned().unwrap_or(defaults.log_level),
            log_dir: m.get_one::<String>("logdir").cloned(),
            q_enabled: m.get_flag("q-enabled"),
            trace: m.get_flag("trace"),
        })
    }
}
