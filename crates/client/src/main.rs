mod roster;
mod session;
mod transport;

use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use clap::Parser;
use glam::DVec2;

use autumn::net::{Kinematics, DEFAULT_PORT};

use session::{Session, SessionEvent};
use transport::Transport;

#[derive(Parser, Debug)]
#[command(about = "Headless race client")]
struct Args {
    /// Server host name or address
    #[arg(long, default_value = "127.0.0.1")]
    server: String,

    /// Server UDP port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

const STEP: Duration = Duration::from_millis(50);
const FINISH_LINE_X: f64 = 1000.0;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let transport = Transport::open((args.server.as_str(), args.port))?;
    log::info!("connecting to {}", transport.server_addr());
    session::connect(&transport)?;
    let session = Session::start(transport);

    // stand-in for a simulation: drive the local player at constant speed
    let mut state = Kinematics {
        velocity: DVec2::new(40.0, 0.0),
        ..Kinematics::default()
    };

    let mut finish_reported = false;
    loop {
        state.position += state.velocity * STEP.as_secs_f64();
        session.set_local_state(state);
        session.advance_remotes(STEP.as_millis() as u64);

        if !finish_reported && state.position.x >= FINISH_LINE_X {
            session.report_finish();
            finish_reported = true;
            log::info!("crossed the finish line, awaiting standings");
        }

        for (i, remote) in session.remote_states().iter().enumerate() {
            log::debug!("opponent {i} at {:?}", remote.position);
        }
        log::debug!("{} requests in flight", session.pending_count());

        match session.events().recv_timeout(STEP) {
            Ok(SessionEvent::Finished(report)) => {
                log::info!(
                    "finished at ({}, {}) after {} ms",
                    report.x,
                    report.y,
                    report.time
                );
                break;
            }
            Ok(SessionEvent::SessionClosed) => {
                log::warn!("session closed by the server");
                break;
            }
            Ok(SessionEvent::Rollback) => {
                log::warn!("state rejected, holding last acknowledged state");
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if !session.is_running() {
            break;
        }
    }

    session.shutdown();
    Ok(())
}
