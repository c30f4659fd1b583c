use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use async_std::channel;
use async_std::task;

use tsuuchi::broker::{Broker, BrokerEvent};
use tsuuchi::scheduler::{DisplayEvent, DisplayScheduler, SchedulerConfig};
use tsuuchi::types::{Event, NotificationRecord, Presenter};
use tsuuchi::{server, transport};

const HELP: &str = "\
tsuuchi - desktop notification broker

USAGE:
  tsuuchi [OPTIONS]

OPTIONS:
  --listen                 receive notifications over udp instead of d-bus
  --relay ADDR             forward notifications to ADDR as udp datagrams
  --port PORT              udp port for --listen (default 9717)
  --default-timeout-ms MS  display time when the sender requests none (default 5000)
  --grace-ms MS            countdown restart after a hover ends (default 3000)
  --history-cap N          history entries kept, 0 for unbounded (default 10)
  -h, --help               print this help
";

struct Args {
	listen: bool,
	relay: Option<SocketAddr>,
	port: u16,
	cfg: SchedulerConfig,
}

fn parse_args() -> anyhow::Result<Args> {
	let mut args = pico_args::Arguments::from_env();
	if args.contains(["-h", "--help"]) {
		print!("{}", HELP);
		std::process::exit(0);
	}
	let mut cfg = SchedulerConfig::default();
	if let Some(ms) = args.opt_value_from_str::<_, u64>("--default-timeout-ms")? {
		cfg.default_timeout = Duration::from_millis(ms);
	}
	if let Some(ms) = args.opt_value_from_str::<_, u64>("--grace-ms")? {
		cfg.grace_period = Duration::from_millis(ms);
	}
	if let Some(cap) = args.opt_value_from_str::<_, usize>("--history-cap")? {
		cfg.history_cap = if cap == 0 { None } else { Some(cap) };
	}
	let parsed = Args {
		listen: args.contains("--listen"),
		relay: args.opt_value_from_str::<_, SocketAddr>("--relay")?,
		port: args.opt_value_from_str::<_, u16>("--port")?.unwrap_or(transport::DEFAULT_PORT),
		cfg,
	};
	let rest = args.finish();
	if !rest.is_empty() {
		log::warn!("ignoring unexpected arguments: {:?}", rest);
	}
	Ok(parsed)
}

/// Stand-in renderer. The actual presentation layer lives in a separate
/// component and consumes the same trait.
struct LogPresenter;

impl Presenter for LogPresenter {
	fn show(&mut self, id: u32, record: &NotificationRecord) {
		log::info!("showing {}: {}", id, record.summary);
	}

	fn refresh(&mut self, id: u32, record: &NotificationRecord) {
		log::info!("updated {}: {}", id, record.summary);
	}

	fn clear(&mut self) {
		log::info!("display empty");
	}
}

#[async_std::main]
async fn main() -> anyhow::Result<()> {
	pretty_env_logger::init();
	let args = parse_args()?;
	if args.listen {
		run_listener(args).await
	} else {
		run_daemon(args).await
	}
}

/// Listener topology: no d-bus, records arrive as datagrams and close
/// decisions loop straight back into the scheduler.
async fn run_listener(args: Args) -> anyhow::Result<()> {
	let (display_tx, display_rx) = channel::unbounded();
	let (feedback_tx, feedback_rx) = channel::unbounded::<(u32, Event)>();

	transport::spawn_listener(args.port, display_tx.clone());

	let loopback = display_tx.clone();
	task::spawn(async move {
		while let Ok((id, event)) = feedback_rx.recv().await {
			match event {
				Event::Close(reason) => {
					let _ = loopback.send(DisplayEvent::Closed(id, reason)).await;
				}
				Event::Action(action) => log::info!("action {} invoked on {}", action, id),
			}
		}
	});

	let mut scheduler = DisplayScheduler::new(args.cfg, LogPresenter, display_tx, feedback_tx);
	while let Ok(event) = display_rx.recv().await {
		scheduler.handle(event);
	}
	Ok(())
}

/// Broker topology: serve org.freedesktop.Notifications, then either
/// schedule locally or relay everything over udp.
async fn run_daemon(args: Args) -> anyhow::Result<()> {
	let (broker_tx, broker_rx) = channel::unbounded();
	let (display_tx, display_rx) = channel::unbounded();
	let (feedback_tx, feedback_rx) = channel::unbounded::<(u32, Event)>();

	let conn = server::serve(Broker::new(broker_tx))
		.await
		.context("claiming the notification bus name")?;
	log::info!("serving {} at {}", server::BUS_NAME, server::OBJECT_PATH);

	let relay = match args.relay {
		Some(addr) => Some(transport::Broadcaster::new(addr)?),
		None => None,
	};

	let route_conn = conn.clone();
	let route_display = display_tx.clone();
	task::spawn(async move {
		while let Ok(event) = broker_rx.recv().await {
			if let Err(err) = route(&route_conn, &route_display, relay.as_ref(), event).await {
				log::warn!("failed to route broker event: {}", err);
			}
		}
	});

	let feedback_conn = conn.clone();
	task::spawn(async move {
		while let Ok((id, event)) = feedback_rx.recv().await {
			if let Err(err) = feed_back(&feedback_conn, id, event).await {
				log::warn!("failed to apply display feedback: {}", err);
			}
		}
	});

	let mut scheduler = DisplayScheduler::new(args.cfg, LogPresenter, display_tx, feedback_tx);
	while let Ok(event) = display_rx.recv().await {
		scheduler.handle(event);
	}
	Ok(())
}

async fn route(
	conn: &zbus::Connection,
	display: &channel::Sender<DisplayEvent>,
	relay: Option<&transport::Broadcaster>,
	event: BrokerEvent,
) -> anyhow::Result<()> {
	match event {
		BrokerEvent::Arrived(id, record) => match relay {
			Some(relay) => relay.send(id, &record),
			None => display.send(DisplayEvent::Arrived(id, record)).await?,
		},
		BrokerEvent::Updated(id, record) => match relay {
			Some(relay) => relay.send(id, &record),
			None => display.send(DisplayEvent::Updated(id, record)).await?,
		},
		BrokerEvent::Closed(id, reason) => {
			if relay.is_none() {
				display.send(DisplayEvent::Closed(id, reason)).await?;
			}
			let iface = conn
				.object_server()
				.interface::<_, server::NotificationServer>(server::OBJECT_PATH)
				.await?;
			let srv = iface.get().await;
			srv.notification_closed(iface.signal_context(), id, reason.code()).await?;
		}
		BrokerEvent::ActionInvoked(id, action) => {
			let iface = conn
				.object_server()
				.interface::<_, server::NotificationServer>(server::OBJECT_PATH)
				.await?;
			let srv = iface.get().await;
			srv.action_invoked(iface.signal_context(), id, &action).await?;
		}
	}
	Ok(())
}

async fn feed_back(conn: &zbus::Connection, id: u32, event: Event) -> anyhow::Result<()> {
	let iface = conn
		.object_server()
		.interface::<_, server::NotificationServer>(server::OBJECT_PATH)
		.await?;
	let mut srv = iface.get_mut().await;
	match event {
		Event::Close(reason) => {
			srv.broker_mut().close(id, reason);
		}
		Event::Action(action) => {
			srv.broker_mut().invoke_action(id, &action);
		}
	}
	Ok(())
}
