use log::*;

use std::thread;
use futures::executor;

use crossbeam_channel::{
  bounded, unbounded, Sender, Receiver,
};

use actix_cors::Cors;
use actix_rt::System;
use actix_web::{get, http, web, middleware, HttpResponse, App, HttpServer};

use crate::{
  error::*,
  app::*,
  db::{Backend, DbService, Store},
  services::config_services,
};

/// Messages between the main thread and the server threads.
#[derive(Debug)]
enum StopEvent {
  /// `/stop` was requested, main thread stops every server.
  Shutdown,
  /// Main thread asks one server to stop.
  StopServer,
  /// A server thread has finished.
  Stopped(u32),
}

fn send_event(tx: &Sender<StopEvent>, ev: StopEvent) {
  if let Err(err) = tx.send(ev) {
    warn!("Stop event not delivered: {:?}", err.into_inner());
  }
}

#[get("/stop")]
async fn stop_server(link: web::Data<ServerLink>) -> HttpResponse {
  info!("Got shutdown request.");
  link.request_shutdown();

  HttpResponse::Ok().body("Shutting down.")
}

/// A server thread's end of the stop channels.
#[derive(Clone)]
struct ServerLink {
  id: u32,
  main_tx: Sender<StopEvent>,
  rx: Receiver<StopEvent>,
}

impl ServerLink {
  fn wait_stop(&self) -> Result<StopEvent> {
    Ok(self.rx.recv()?)
  }

  fn stopped(&self) {
    debug!("Server({}) stopped, notify main thread.", self.id);
    send_event(&self.main_tx, StopEvent::Stopped(self.id));
  }

  fn request_shutdown(&self) {
    info!("Signal main thread to shutdown.");
    send_event(&self.main_tx, StopEvent::Shutdown);
  }
}

/// Main thread's view of the running servers.
struct Supervisor {
  tx: Sender<StopEvent>,
  rx: Receiver<StopEvent>,
  servers: Vec<Sender<StopEvent>>,
}

impl Supervisor {
  fn new() -> Self {
    let (tx, rx) = unbounded();
    Self {
      tx,
      rx,
      servers: Vec::new(),
    }
  }

  fn add_server(&mut self) -> ServerLink {
    let (server_tx, rx) = bounded(1);
    let id = self.servers.len() as u32;
    self.servers.push(server_tx);
    ServerLink {
      id,
      main_tx: self.tx.clone(),
      rx,
    }
  }

  /// Block until every server has stopped.
  fn run(&self) {
    let mut running = self.servers.len();
    let mut stopping = false;
    while running > 0 {
      match self.rx.recv() {
        Err(err) => {
          error!("Supervisor channel error: {:?}", err);
          return;
        },
        Ok(StopEvent::Shutdown) if !stopping => {
          info!("Got shutdown signal.  Stop servers.");
          stopping = true;
          for server in self.servers.iter() {
            send_event(server, StopEvent::StopServer);
          }
        },
        Ok(StopEvent::Shutdown) => (),
        Ok(StopEvent::Stopped(id)) => {
          running -= 1;
          debug!("Server({}) stopped.  Remaining {}", id, running);
        },
        Ok(ev) => {
          error!("Supervisor received invalid event: {:?}", ev);
        },
      }
    }
    info!("Stopped all servers.");
  }
}

pub fn execute(config: AppConfig) -> Result<()> {
  let mut supervisor = Supervisor::new();

  let servers = config.get_str_list("servers")?;
  if servers.is_empty() {
    return Err(anyhow::anyhow!("Missing list of servers").into());
  }
  for server in servers {
    let cfg = config.clone();
    let link = supervisor.add_server();
    debug!("Spawn server: {}", server);
    thread::spawn(move || {
      if let Err(err) = run_server(&cfg, &server, &link) {
        error!("Error from server({}): {:?}", server, err);
      }
      link.stopped();
    });
  }

  supervisor.run();

  info!("main thread: stopped.");
  Ok(())
}

async fn test_db(url: String) -> Result<()> {
  let db = DbService::new(&url);
  db.prepare().await
}

fn build_cors(origins: &[String]) -> Cors {
  let mut cors = Cors::default()
    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
    .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::ACCEPT])
    .supports_credentials()
    .max_age(3600);
  for origin in origins {
    cors = cors.allowed_origin(origin);
  }
  cors
}

fn run_server(config: &AppConfig, prefix: &str, link: &ServerLink) -> Result<()> {
  let sys = System::new();

  let debug = config.get_bool("debug")?.unwrap_or(false);
  debug!("Debug = {:?}", debug);

  if debug {
    // Test db prepared statements.
    if let Backend::Postgres(url) = Backend::from_url(&config.require_str("db.url")?) {
      sys.block_on(test_db(url))?;
    }
  }

  // configure services
  info!("Serve.Services: configure services. prefix={}", prefix);
  let services = config_services(config, prefix)?;

  // Check if stopper is enabled for this server
  let stopper = if config.get_bool(&format!("{}.stopper", prefix))?.unwrap_or_default() {
    Some(link.clone())
  } else {
    None
  };

  let access_log = config.get_bool(&format!("{}.access_log", prefix))?.unwrap_or(false);
  let origins = config.get_str_list(&format!("{}.cors_origins", prefix))?;
  if !origins.is_empty() {
    info!("CORS origins: {:?}", origins);
  }

  // Start http server
  let mut server = HttpServer::new(move || {
    let mut app = App::new()
      .wrap(middleware::Compress::default())
      .wrap(middleware::Condition::new(!origins.is_empty(), build_cors(&origins)))
      .wrap(middleware::Condition::new(access_log, middleware::Logger::default()))
      .configure(|web| services.web_config(web));

    if let Some(ref stopper) = stopper {
      // Server stopper
      app = app.app_data(web::Data::new(stopper.clone()))
        .service(stop_server);
    }

    app
  });

  // workers
  if let Some(workers) = config.get_int(&format!("{}.workers", prefix))? {
    info!("Workers: {}", workers);
    let workers = usize::try_from(workers).ok().filter(|w| *w > 0)
      .ok_or_else(|| anyhow::anyhow!("{}.workers must be > 0", prefix))?;
    server = server.workers(workers);
  }

  // listen backlog
  if let Some(backlog) = config.get_int(&format!("{}.backlog", prefix))? {
    info!("Listen backlog: {}", backlog);
    let backlog = u32::try_from(backlog)
      .map_err(|_| anyhow::anyhow!("{}.backlog must be >= 0", prefix))?;
    server = server.backlog(backlog);
  }

  // setup binds.
  let listen = config.require_str(&format!("{}.listen", prefix))?;
  info!("{} services listening on: {}", prefix, listen);
  server = server.bind(listen)?;

  // start server
  let server = server.run();

  // Graceful stop when the supervisor asks for it.
  let handle = server.handle();
  let stop_link = link.clone();
  thread::spawn(move || {
    match stop_link.wait_stop() {
      Ok(StopEvent::StopServer) => {
        debug!("Stop server: {}", stop_link.id);
        executor::block_on(handle.stop(true));
      },
      Ok(ev) => error!("Server({}) received invalid event: {:?}", stop_link.id, ev),
      Err(_) => (),
    }
  });

  sys.block_on(server)?;
  Ok(())
}
