mod args;
mod error;

use crate::args::Args;
use crate::error::{Error, Result};
use collider_consensus_core::config::params::{DEVNET_SCRIPT_PARAMS, MAINNET_SCRIPT_PARAMS};
use collider_core::log::init_logger;
use collider_txscript::{
    BroadcastQuery, ScriptVerdict, TxScriptEngine, caches::Cache, engine_context::EngineContext, environment::ScriptEnvironment,
};
use log::{debug, error, info};
use std::{fs, process::ExitCode};

/// Outcome of one script evaluation, kept after the engine is dropped
struct Evaluation {
    verdict: ScriptVerdict,
    stack: Vec<String>,
    queries: Vec<BroadcastQuery>,
}

impl Evaluation {
    fn exit_code(&self) -> u8 {
        match self.verdict {
            ScriptVerdict::Valid => 0,
            ScriptVerdict::Invalid(_) => 1,
            ScriptVerdict::Faulted(_) => 2,
        }
    }

    fn print_trace(&self) {
        println!("stack ({} items, top last):", self.stack.len());
        for item in self.stack.iter() {
            println!("  {}", if item.is_empty() { "<empty>" } else { item });
        }
        for query in self.queries.iter() {
            match serde_json::to_string(query) {
                Ok(json) => println!("query: {json}"),
                Err(err) => error!("cannot serialize query {}: {err}", query.query),
            }
        }
    }
}

fn read(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|err| Error::Io(path.to_string(), err))
}

fn load_script(args: &Args) -> Result<String> {
    match (&args.script, &args.script_file) {
        (Some(script), _) => Ok(script.clone()),
        (None, Some(path)) => Ok(read(path)?.trim().to_string()),
        // The argument group makes one of them mandatory
        (None, None) => Ok(String::new()),
    }
}

fn load_environment(args: &Args) -> Result<ScriptEnvironment> {
    match &args.env_file {
        Some(path) => Ok(serde_json::from_str(&read(path)?)?),
        None => Ok(ScriptEnvironment::new()),
    }
}

fn evaluate(args: &Args) -> Result<Evaluation> {
    let script = load_script(args)?;
    let env = load_environment(args)?;
    let params = if args.q_enabled { DEVNET_SCRIPT_PARAMS } else { MAINNET_SCRIPT_PARAMS };
    debug!("Evaluating `{script}`");

    let sig_cache = Cache::new(params.sig_cache_size);
    let mut vm = TxScriptEngine::new(&env, EngineContext::new(&sig_cache).with_params(params));
    let verdict = vm.evaluate_asm(&script);
    info!("Script evaluated: {verdict}");
    Ok(Evaluation { verdict, stack: vm.stack().to_vec(), queries: vm.queries().to_vec() })
}

fn main() -> ExitCode {
    let args = match Args::parse(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };

    if let Err(err) = init_logger(args.log_dir.as_deref(), &args.log_level) {
        eprintln!("{err}");
        return ExitCode::from(2);
    }

    match evaluate(&args) {
        Ok(evaluation) => {
            println!("{}", evaluation.verdict);
            if args.trace {
                evaluation.print_trace();
            }
            ExitCode::from(evaluation.exit_code())
        }
        Err(err) => {
            error!("{err}");
            ExitCode::from(2)
        }
    }
}
