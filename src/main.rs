use clap::Parser;
use fx2prog::{Context, Dispatcher, Error, Selector};
use log::{error, info};
use std::io;
use std::process;

const COMMANDS_HELP: &str = "\
Commands (executed in the order given):
  reset          reset 8051 by putting reset low
  run            start the 8051 by putting reset high
  prg:FILE       program 8051; FILE is an Intel hex file (.ihx); will
                 reset the 8051 before download; use \"run\" afterwards
  delay:NN       make a delay for NN msec
  set:ADR,VAL    set byte at address ADR to value VAL
  dram:ADR,LEN   dump RAM content: LEN bytes starting at ADR
  dbulk:EP,L[,N] bulk read N (default: 1) buffers of size L from endpoint
                 EP (1,2,4,6,8) and dump them; L<0 to allow short reads
  sbulk:EP,STR   send string STR as bulk message to endpoint EP (1,2,4,6,8)
  fbulk:EP,FILE[,CS] send FILE as bulk message to endpoint EP (1,2,4,6,8)
                 stdin if no file specified; chunk size CS with default 64
  bench_bulk:EP,L[,CS]  bench reading L bytes from endpoint EP (chunk size CS)
  altif:[IF]     set alt interface for next bulk IO; none for FX2 default
  ctrl:[TYPE[,REQUEST[,VALUE[,INDEX]]]] send a zero-length control message;
                 all fields default to 0";

#[derive(Parser, Debug)]
#[command(name = "fx2prog", version, about = "Cypress FX2(LP) programmer", after_help = COMMANDS_HELP)]
struct Cli {
    /// Device to use by bus and device number (see --list), e.g. 006.003
    #[arg(short = 'd', long = "device", value_name = "BUS.DEV", value_parser = Selector::parse_bus_device, conflicts_with = "id")]
    device: Option<Selector>,

    /// Vendor and product ID in hex, and the index of the matching device to use [default: 04b4.8613.0]
    #[arg(long = "id", value_name = "VV.PP[.N]", value_parser = Selector::parse_id)]
    id: Option<Selector>,

    /// List devices and busses and then exit
    #[arg(long)]
    list: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Commands to execute
    #[arg(value_name = "COMMAND")]
    commands: Vec<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version go to stdout and are not failures
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let code = match run(cli) {
        Ok(0) => 0,
        Ok(_) => 1,
        Err(err) => {
            error!("{}", err);
            1
        }
    };
    process::exit(code);
}

/// Opens the selected device and executes all commands. Returns the number of failed commands.
fn run(cli: Cli) -> Result<usize, Error> {
    let context = Context::new()?;

    if cli.list {
        for device in context.devices()? {
            println!("{}", device);
        }
        return Ok(0);
    }

    let explicit = cli.device.is_some() || cli.id.is_some();
    let selector = cli.device.or(cli.id).unwrap_or_default();
    let device_info = match context.pick_device(&selector) {
        Ok(device_info) => device_info,
        Err(Error::DeviceNotFound) if !explicit => {
            error!("No unconfigured Cypress FX2 attached.");
            return Ok(1);
        }
        Err(Error::DeviceNotFound) => {
            error!("No {} attached.", selector);
            return Ok(1);
        }
        Err(err) => return Err(err),
    };

    info!(
        "Using ID {:04x}:{:04x} on {:03}.{:03}.",
        device_info.vendor_id, device_info.product_id, device_info.bus_number, device_info.address
    );
    let device = device_info.open(&context.usb_context)?;

    let stdout = io::stdout();
    let mut dispatcher = Dispatcher::new(device, stdout.lock());
    Ok(dispatcher.run_all(&cli.commands))
}
