use dotenv::dotenv;

use clap::{Arg, Command};

use fast_social::{app::*, error::*};

fn cli() -> Command {
  Command::new("fast-social")
    .about("Social network REST API server")
    .arg(Arg::new("config")
      .short('c')
      .long("config")
      .value_name("FILE")
      .help("Sets a custom config file")
      .global(true))
    .subcommand(Command::new("serve")
      .about("Run the http servers (default)"))
    .subcommand(Command::new("init-db")
      .about("Create the database schema"))
}

fn main() -> Result<()> {
  dotenv().ok();
  env_logger::init();

  let cli = cli().get_matches();

  let config = AppConfig::new_clap(&cli)?;

  match cli.subcommand_name() {
    Some("init-db") => init_db::execute(config)?,
    // default to 'serve' command.
    _ => serve::execute(config)?,
  }
  log::info!("Main finished");
  Ok(())
}
