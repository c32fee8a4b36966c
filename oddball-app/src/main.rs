mod app;
mod audio;
mod gaze;
mod headless;
mod session;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{info, warn};
use oddball_experiment::{
    CsvSink, DummyTriggerPort, ExperimentConfig, Group, Participant, RunStatus, SerialTriggerPort,
    TriggerPort,
};
use rand::Rng;
use std::path::PathBuf;

use crate::app::App;
use crate::session::SessionSetup;

fn cli() -> Command {
    Command::new("oddball")
        .about("Gaze-contingent oddball experiment with pupillometry triggers")
        .arg(
            Arg::new("id")
                .long("id")
                .required(true)
                .value_name("ID")
                .value_parser(value_parser!(u32))
                .help("Participant id"),
        )
        .arg(
            Arg::new("group")
                .long("group")
                .required(true)
                .value_parser(["asd", "td"])
                .help("Participant group"),
        )
        .arg(
            Arg::new("task")
                .long("task")
                .default_value("auditory")
                .value_parser(["auditory", "visual"])
                .help("Built-in task preset, ignored when --config is given"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Experiment configuration as JSON"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("DIR")
                .default_value("data")
                .value_parser(value_parser!(PathBuf))
                .help("Directory for the result table and session sidecar"),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .action(ArgAction::SetTrue)
                .help("Run headless with a simulated participant"),
        )
        .arg(
            Arg::new("serial-port")
                .long("serial-port")
                .value_name("PORT")
                .help("Serial device of the trigger box; triggers are only logged without it"),
        )
        .arg(
            Arg::new("baud")
                .long("baud")
                .default_value("115200")
                .value_parser(value_parser!(u32))
                .help("Trigger box baud rate"),
        )
        .arg(
            Arg::new("font")
                .long("font")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("TrueType/OpenType font for instruction and warning text"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .help("Seed for trial order, ISIs and tone assignment"),
        )
}

fn group(matches: &ArgMatches) -> Result<Group> {
    match matches.get_one::<String>("group").map(String::as_str) {
        Some("asd") => Ok(Group::Asd),
        Some("td") => Ok(Group::Td),
        other => bail!("unknown group {:?}", other),
    }
}

fn load_config(matches: &ArgMatches) -> Result<ExperimentConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ExperimentConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => match matches.get_one::<String>("task").map(String::as_str) {
            Some("visual") => ExperimentConfig::visual(),
            _ => ExperimentConfig::auditory(),
        },
    };
    config.validate().context("validating config")?;
    Ok(config)
}

fn trigger_port(matches: &ArgMatches) -> Result<Box<dyn TriggerPort>> {
    match matches.get_one::<String>("serial-port") {
        Some(name) => {
            let baud = matches.get_one::<u32>("baud").copied().unwrap_or(115_200);
            let port = SerialTriggerPort::open(name, baud)
                .with_context(|| format!("opening trigger port {name}"))?;
            info!("sending triggers to {} at {} baud", name, baud);
            Ok(Box::new(port))
        }
        None => {
            warn!("no trigger port given, triggers are only logged");
            Ok(Box::new(DummyTriggerPort))
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    let id = matches
        .get_one::<u32>("id")
        .copied()
        .context("missing participant id")?;
    let participant = Participant {
        id,
        group: group(&matches)?,
    };
    let config = load_config(&matches)?;
    let port = trigger_port(&matches)?;

    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("data"));
    std::fs::create_dir_all(&output)
        .with_context(|| format!("creating output directory {}", output.display()))?;
    let started_at = chrono::Local::now();
    let (table_path, info_path) = oddball_experiment::output_paths(&output, id, &started_at);
    let sink = CsvSink::create(&table_path)
        .with_context(|| format!("creating {}", table_path.display()))?;
    info!("writing results to {}", table_path.display());

    let seed = matches
        .get_one::<u64>("seed")
        .copied()
        .unwrap_or_else(|| rand::rng().random());
    info!("seed {}", seed);

    let setup = SessionSetup {
        config,
        participant,
        sink: Box::new(sink),
        port,
        seed,
        started_at,
        info_path,
    };

    let status = if matches.get_flag("simulate") {
        headless::run(setup)?
    } else {
        let font = match matches.get_one::<PathBuf>("font") {
            Some(path) => Some(oddball_render::load_font(path)?),
            None => {
                warn!("no --font given, text slides will be blank");
                None
            }
        };
        App::new(setup, font).run()?
    };

    match status {
        RunStatus::Finished => {
            info!("experiment finished");
            Ok(())
        }
        RunStatus::Aborted => {
            warn!("experiment aborted by the operator");
            std::process::exit(2);
        }
        RunStatus::Running => {
            warn!("experiment stopped before the end");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_group_are_required() {
        assert!(cli().try_get_matches_from(["oddball"]).is_err());
        assert!(cli().try_get_matches_from(["oddball", "--id", "7"]).is_err());
        assert!(cli()
            .try_get_matches_from(["oddball", "--id", "7", "--group", "xyz"])
            .is_err());
        assert!(cli()
            .try_get_matches_from(["oddball", "--id", "-3", "--group", "td"])
            .is_err());
    }

    #[test]
    fn parses_a_full_command_line() {
        let m = cli()
            .try_get_matches_from([
                "oddball", "--id", "12", "--group", "asd", "--task", "visual", "--simulate",
                "--seed", "99",
            ])
            .unwrap();
        assert_eq!(m.get_one::<u32>("id"), Some(&12));
        assert_eq!(group(&m).unwrap(), Group::Asd);
        assert!(m.get_flag("simulate"));
        assert_eq!(m.get_one::<u64>("seed"), Some(&99));
        let config = load_config(&m).unwrap();
        assert_eq!(config, ExperimentConfig::visual());
    }

    #[test]
    fn defaults_to_the_auditory_task() {
        let m = cli()
            .try_get_matches_from(["oddball", "--id", "1", "--group", "td"])
            .unwrap();
        assert_eq!(load_config(&m).unwrap(), ExperimentConfig::auditory());
        assert_eq!(m.get_one::<PathBuf>("output"), Some(&PathBuf::from("data")));
        assert_eq!(m.get_one::<u32>("baud"), Some(&115_200));
    }
}
