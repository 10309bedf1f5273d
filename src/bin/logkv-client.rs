use clap::AppSettings;
use logkv::{KvsClient, Operation, Result, ERROR_PREFIX};
use std::net::SocketAddr;
use std::process::exit;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "logkv-client",
    global_settings = &[AppSettings::DisableHelpSubcommand, AppSettings::VersionlessSubcommands]
)]
struct Opt {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    #[structopt(name = "get", about = "Get the string value of a given string key")]
    Get {
        #[structopt(name = "KEY", help = "A string key")]
        key: String,
        #[structopt(flatten)]
        server: Server,
    },
    #[structopt(name = "set", about = "Set the value of a string key to a string")]
    Set {
        #[structopt(name = "KEY", help = "A string key")]
        key: String,
        #[structopt(name = "VALUE", help = "The string value of the key")]
        value: String,
        #[structopt(flatten)]
        server: Server,
    },
    #[structopt(name = "delete", about = "Delete a given string key")]
    Delete {
        #[structopt(name = "KEY", help = "A string key")]
        key: String,
        #[structopt(flatten)]
        server: Server,
    },
    #[structopt(name = "show", about = "Print every key and value")]
    Show {
        #[structopt(flatten)]
        server: Server,
    },
    #[structopt(name = "send", about = "Send an arbitrary command to the server")]
    Send {
        #[structopt(name = "COMMAND", help = "The command to send to the server")]
        command: String,
        #[structopt(short, long, help = "The key to set or delete from server")]
        key: Option<String>,
        #[structopt(
            short,
            long,
            requires = "key",
            help = "The value to set on the server"
        )]
        value: Option<String>,
        #[structopt(flatten)]
        server: Server,
    },
}

#[derive(StructOpt, Debug)]
struct Server {
    #[structopt(
        long,
        help = "Sets the server address",
        value_name = "IP:PORT",
        default_value = "127.0.0.1:10000",
        parse(try_from_str)
    )]
    addr: SocketAddr,
}

fn main() {
    env_logger::init();
    let opt = Opt::from_args();
    match run(opt) {
        Ok(response) => {
            if response.starts_with(ERROR_PREFIX) {
                eprintln!("{}", response);
                exit(1);
            }
            println!("{}", response);
        }
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    }
}

fn run(opt: Opt) -> Result<String> {
    let (server, op) = match opt.command {
        Command::Get { key, server } => (server, Operation::new("get", Some(key), None)),
        Command::Set { key, value, server } => {
            (server, Operation::new("set", Some(key), Some(value)))
        }
        Command::Delete { key, server } => (server, Operation::new("delete", Some(key), None)),
        Command::Show { server } => (server, Operation::new("show", None, None)),
        Command::Send {
            command,
            key,
            value,
            server,
        } => (server, Operation::new(command, key, value)),
    };
    // Fail before connecting if the request would not survive the wire
    op.to_request()?;
    let mut client = KvsClient::connect(server.addr)?;
    client.request(&op)
}
