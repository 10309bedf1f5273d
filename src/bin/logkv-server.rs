#[macro_use]
extern crate log;

use env_logger::Env;
use logkv::{KvStore, KvsServer, Result, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "logkv-server")]
struct Opt {
    #[structopt(
        long,
        help = "Sets the listening address",
        value_name = "IP:PORT",
        default_value = "127.0.0.1:10000",
        parse(try_from_str)
    )]
    addr: SocketAddr,
    #[structopt(
        long = "log-file",
        help = "Sets the command log file",
        value_name = "PATH",
        default_value = "commands.log",
        parse(from_os_str)
    )]
    log_file: PathBuf,
    #[structopt(
        long = "read-timeout",
        help = "Drops connections that send nothing for SECS seconds (0 waits forever)",
        value_name = "SECS"
    )]
    read_timeout: Option<u64>,
}

impl From<Opt> for ServerConfig {
    fn from(opt: Opt) -> ServerConfig {
        ServerConfig {
            addr: opt.addr,
            log_path: opt.log_file,
            read_timeout: opt.read_timeout.filter(|&secs| secs > 0).map(Duration::from_secs),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();
    if let Err(e) = run(opt.into()) {
        error!("{}", e);
        exit(1);
    }
}

fn run(config: ServerConfig) -> Result<()> {
    info!("logkv-server {}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}", config.addr);
    info!("Command log: {}", config.log_path.display());

    let store = KvStore::open(&config.log_path)?;
    KvsServer::new(store, config).run()
}
