//! `cgra`: command-line harness for the UltraSynth CGRA configuration driver.
//!
//! ```text
//! USAGE:
//!   cgra setup                        Send registers, contexts, constants, parameters
//!   cgra run [--type run|support|multirate]
//!                                     Start the schedule
//!   cgra pause                        Halt without resetting
//!   cgra stop                         Halt and reset parameters and addresses
//!   cgra params --values 1,2,3        Send dirty run-time parameters
//!   cgra demo                         Setup, run, stop
//! ```
//!
//! Without `--device` (or `CGRA_UIO_DEVICE`) every command runs against a
//! recording bus and prints the transactions it would have issued.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cgra_driver::prelude::*;
use cgra_driver::MmioBus;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cgra", about = "UltraSynth CGRA configuration CLI", version)]
struct Cli {
    /// Device window to map (UIO node or /dev/mem slice). Dry run if absent.
    #[arg(long, global = true, env = "CGRA_UIO_DEVICE")]
    device: Option<PathBuf>,

    #[command(flatten)]
    setup: SetupArgs,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args)]
struct SetupArgs {
    /// Maximum AXI burst length in words (1..=256).
    #[arg(long, default_value_t = 256)]
    max_burst: usize,
    /// CGRA cycle length in clock cycles.
    #[arg(long, default_value_t = 50_000)]
    cycle_clocks: u32,
    /// Log destination window as LOWER,UPPER,INC.
    #[arg(long, value_delimiter = ',')]
    log_window: Option<Vec<u32>>,
    /// OCM destination window as LOWER,UPPER,INC.
    #[arg(long, value_delimiter = ',')]
    ocm_window: Option<Vec<u32>>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Send single registers, contexts, constants and initial parameters.
    Setup,
    /// Start the schedule.
    Run {
        /// How the run cooperates with the host.
        #[arg(long = "type", value_enum, default_value_t = RunKind::Run)]
        run_type: RunKind,
        /// Host results expected per cycle (support runs only).
        #[arg(long, default_value_t = 0)]
        host_results: u32,
        /// CGRA runs per host run (multirate runs only).
        #[arg(long, default_value_t = 0)]
        multirate: u32,
    },
    /// Halt without touching counters, parameters or addresses.
    Pause,
    /// Halt, then reset parameters and log/OCM addresses.
    Stop,
    /// Send run-time parameters.
    Params {
        /// Parameter values in run-time parameter order.
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<u32>,
        /// Indices of the dirty parameters (all if omitted).
        #[arg(long, value_delimiter = ',')]
        dirty: Option<Vec<usize>>,
    },
    /// Setup, run and stop the reference 4-PE composition.
    Demo,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunKind {
    Run,
    Support,
    Multirate,
}

impl From<RunKind> for RunType {
    fn from(kind: RunKind) -> Self {
        match kind {
            RunKind::Run => Self::Run,
            RunKind::Support => Self::Support,
            RunKind::Multirate => Self::Multirate,
        }
    }
}

impl SetupArgs {
    fn config(&self) -> Result<SetupData> {
        let mut config = SetupData::default()
            .with_max_transaction_length(self.max_burst)
            .with_cycle_clock_count(self.cycle_clocks);
        if let Some(window) = &self.log_window {
            let [lower, upper, inc] = window_triple("--log-window", window)?;
            config = config.with_log_window(lower, upper, inc);
        }
        if let Some(window) = &self.ocm_window {
            let [lower, upper, inc] = window_triple("--ocm-window", window)?;
            config = config.with_ocm_window(lower, upper, inc);
        }
        Ok(config)
    }
}

fn window_triple(flag: &str, values: &[u32]) -> Result<[u32; 3]> {
    <[u32; 3]>::try_from(values)
        .map_err(|_| anyhow::anyhow!("{flag} takes LOWER,UPPER,INC, got {} values", values.len()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = cli.setup.config()?;
    if let Cmd::Run { run_type, host_results, multirate } = &cli.command {
        check_run_flags(*run_type, *host_results, *multirate)?;
        config.expected_host_results = *host_results;
        config.multirate_counter_reset_val = *multirate;
    }

    let composition = Composition::static_4pe();

    match &cli.device {
        Some(path) => {
            let bus = MmioBus::open(path)
                .with_context(|| format!("cannot map CGRA window {}", path.display()))?;
            execute(bus, &composition, &config, &cli.command)?;
            println!("Done ({}).", path.display());
        }
        None => {
            let mut bus = RecordingBus::new();
            execute(&mut bus, &composition, &config, &cli.command)?;
            print_transactions(&bus);
        }
    }

    Ok(())
}

fn check_run_flags(kind: RunKind, host_results: u32, multirate: u32) -> Result<()> {
    if host_results != 0 && kind != RunKind::Support {
        bail!("--host-results is only valid with --type support");
    }
    if multirate != 0 && kind != RunKind::Multirate {
        bail!("--multirate is only valid with --type multirate");
    }
    Ok(())
}

fn execute<B: BusWriter>(
    bus: B,
    composition: &Composition,
    config: &SetupData,
    command: &Cmd,
) -> Result<()> {
    let mut ctl = StateController::with_bus(bus, composition);

    match command {
        Cmd::Setup => ctl.orchestrator_mut().setup(config)?,
        Cmd::Run { run_type, .. } => ctl.change_state_run(config, (*run_type).into())?,
        Cmd::Pause => ctl.pause()?,
        Cmd::Stop => ctl.stop(config)?,
        Cmd::Params { values, dirty } => {
            let flags = dirty_flags(composition, values.len(), dirty.as_deref())?;
            let ranges = ctl.orchestrator_mut().set_run_time_parameters(
                &ParameterArrayRef::new(values, &flags),
                config.max_transaction_length,
            )?;
            info!("{ranges} parameter ranges sent");
        }
        Cmd::Demo => {
            ctl.orchestrator_mut().setup(config)?;
            ctl.change_state(config, Command::Run)?;
            ctl.change_state(config, Command::Stop)?;
        }
    }

    info!("CGRA state: {:?}", ctl.state());
    Ok(())
}

fn dirty_flags(composition: &Composition, count: usize, dirty: Option<&[usize]>) -> Result<Vec<bool>> {
    let words = composition.parameter_layout.words;
    let limit = composition.run_time_parameter_count();
    if count % words != 0 {
        bail!("{count} values do not form whole {words}-word parameters");
    }
    let parameters = count / words;
    if parameters > limit {
        bail!("{parameters} parameters given, the composition has {limit}");
    }

    let Some(indices) = dirty else {
        return Ok(vec![true; parameters]);
    };
    let mut flags = vec![false; parameters];
    for &index in indices {
        let Some(flag) = flags.get_mut(index) else {
            bail!("dirty index {index} out of range for {parameters} parameters");
        };
        *flag = true;
    }
    Ok(flags)
}

fn print_transactions(bus: &RecordingBus) {
    println!("{} transactions, {} words", bus.len(), bus.word_count());
    println!();

    for (i, t) in bus.transactions().iter().enumerate() {
        let preview: Vec<String> = t.data.iter().take(4).map(|w| format!("{w:#x}")).collect();
        let more = if t.len() > 4 { ", .." } else { "" };
        println!("{i:>4}  {t}  [{}{more}]", preview.join(", "));
    }
}
